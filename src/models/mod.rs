use crate::util::random_hex_id;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub(crate) const NEW_NOTE_CONTENT: &str = "New Note\n";
pub(crate) const DEFAULT_GROUP_TITLE: &str = "New Group";

/// Note identifier. Generated ids look like `note-<16 hex>`; imported ids are kept verbatim.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub(crate) struct NoteId(String);

impl NoteId {
    pub fn generate() -> Self {
        Self(format!("note-{}", random_hex_id()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NoteId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Group identifier. A distinct type from [`NoteId`] so the two can never be confused.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub(crate) struct GroupId(String);

impl GroupId {
    pub fn generate() -> Self {
        Self(format!("group-{}", random_hex_id()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Note {
    /// Rich-text markup, opaque to the model.
    #[serde(default)]
    pub content: String,
}

impl Note {
    fn placeholder() -> Self {
        Self {
            content: NEW_NOTE_CONTENT.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Group {
    pub title: String,

    /// Member notes in display order.
    #[serde(default)]
    pub notes: Vec<NoteId>,

    #[serde(default)]
    pub collapsed: bool,
}

impl Group {
    fn new() -> Self {
        Self {
            title: DEFAULT_GROUP_TITLE.to_string(),
            notes: vec![],
            collapsed: false,
        }
    }
}

/// An item addressed by the reorder primitives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ItemRef {
    Note(NoteId),
    Group(GroupId),
}

/// The whole notes collection. Also the persisted / exported document shape:
/// `{ "groups": { id: Group }, "notes": { id: Note } }`.
///
/// Map order is meaningful: group order is top-level display order, note order is the
/// display order of ungrouped notes.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub(crate) struct Collection {
    pub groups: IndexMap<GroupId, Group>,
    pub notes: IndexMap<NoteId, Note>,
}

// Order-sensitive, unlike IndexMap's own PartialEq.
impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        self.groups.iter().eq(other.groups.iter()) && self.notes.iter().eq(other.notes.iter())
    }
}

impl Eq for Collection {}

impl Collection {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.notes.is_empty()
    }

    pub fn contains_note(&self, id: &NoteId) -> bool {
        self.notes.contains_key(id)
    }

    pub fn contains_group(&self, id: &GroupId) -> bool {
        self.groups.contains_key(id)
    }

    pub fn create_note(&mut self) -> NoteId {
        let id = loop {
            let id = NoteId::generate();
            if !self.notes.contains_key(&id) {
                break id;
            }
        };
        self.notes.insert(id.clone(), Note::placeholder());
        id
    }

    pub fn create_group(&mut self) -> GroupId {
        let id = loop {
            let id = GroupId::generate();
            if !self.groups.contains_key(&id) {
                break id;
            }
        };
        self.groups.insert(id.clone(), Group::new());
        id
    }

    /// Returns whether the note existed. Membership is scrubbed either way.
    pub fn delete_note(&mut self, id: &NoteId) -> bool {
        let existed = self.notes.shift_remove(id).is_some();
        for g in self.groups.values_mut() {
            g.notes.retain(|n| n != id);
        }
        existed
    }

    /// Members are detached, not deleted: they resurface as ungrouped notes.
    pub fn delete_group(&mut self, id: &GroupId) -> bool {
        self.groups.shift_remove(id).is_some()
    }

    /// No-op for an unknown id; a deleted note is never recreated.
    pub fn set_note_content(&mut self, id: &NoteId, content: impl Into<String>) -> bool {
        match self.notes.get_mut(id) {
            Some(n) => {
                n.content = content.into();
                true
            }
            None => false,
        }
    }

    pub fn rename_group(&mut self, id: &GroupId, title: &str) -> bool {
        let Some(g) = self.groups.get_mut(id) else {
            return false;
        };
        let title = title.trim();
        g.title = if title.is_empty() {
            DEFAULT_GROUP_TITLE.to_string()
        } else {
            title.to_string()
        };
        true
    }

    /// Returns the new collapsed state.
    pub fn toggle_group_collapsed(&mut self, id: &GroupId) -> Option<bool> {
        let g = self.groups.get_mut(id)?;
        g.collapsed = !g.collapsed;
        Some(g.collapsed)
    }

    pub fn group_of(&self, note: &NoteId) -> Option<&GroupId> {
        self.groups
            .iter()
            .find(|(_, g)| g.notes.contains(note))
            .map(|(id, _)| id)
    }

    /// Notes referenced by no group, in note-map order.
    pub fn ungrouped_notes(&self) -> Vec<&NoteId> {
        let grouped: HashSet<&NoteId> = self.groups.values().flat_map(|g| g.notes.iter()).collect();
        self.notes.keys().filter(|id| !grouped.contains(id)).collect()
    }

    /// Detach `note` from every group other than `target`, then append it to `target`
    /// (or leave it ungrouped for `None`). A note already in `target` keeps its position.
    ///
    /// Returns whether anything changed. Unknown note or unknown target: no-op.
    pub fn move_note_to_group(&mut self, note: &NoteId, target: Option<&GroupId>) -> bool {
        if !self.notes.contains_key(note) {
            return false;
        }
        if let Some(t) = target {
            if !self.groups.contains_key(t) {
                return false;
            }
        }

        let mut changed = false;
        for (gid, g) in self.groups.iter_mut() {
            if Some(gid) == target {
                continue;
            }
            let before = g.notes.len();
            g.notes.retain(|n| n != note);
            changed |= g.notes.len() != before;
        }

        if let Some(g) = target.and_then(|t| self.groups.get_mut(t)) {
            if !g.notes.contains(note) {
                g.notes.push(note.clone());
                changed = true;
            }
        }

        changed
    }

    /// Move `item` so it ends up at `new_index` (clamped) within its container.
    ///
    /// `container = None` addresses the ungrouped notes (for a note item) or the top-level
    /// group order (for a group item). `Some(group)` addresses that group's member list.
    pub fn reorder_within_container(
        &mut self,
        container: Option<&GroupId>,
        item: &ItemRef,
        new_index: usize,
    ) -> bool {
        match (container, item) {
            (None, ItemRef::Group(g)) => self.reorder_groups(g, new_index),
            (None, ItemRef::Note(n)) => self.reorder_ungrouped(n, new_index),
            (Some(gid), ItemRef::Note(n)) => match self.groups.get_mut(gid) {
                Some(g) => move_in_vec(&mut g.notes, n, new_index),
                None => false,
            },
            // Groups do not nest.
            (Some(_), ItemRef::Group(_)) => false,
        }
    }

    pub fn reorder_groups(&mut self, id: &GroupId, new_index: usize) -> bool {
        let Some(from) = self.groups.get_index_of(id) else {
            return false;
        };
        let to = new_index.min(self.groups.len() - 1);
        if from == to {
            return false;
        }
        self.groups.move_index(from, to);
        true
    }

    fn reorder_ungrouped(&mut self, note: &NoteId, new_index: usize) -> bool {
        if !self.notes.contains_key(note) || self.group_of(note).is_some() {
            return false;
        }

        let mut order: Vec<NoteId> = self.ungrouped_notes().into_iter().cloned().collect();
        if !move_in_vec(&mut order, note, new_index) {
            return false;
        }
        let Some(to) = order.iter().position(|n| n == note) else {
            return false;
        };
        let Some(from) = self.notes.get_index_of(note) else {
            return false;
        };

        // Grouped notes interleaved in the map do not affect display, so it is enough to
        // park the note right next to its new ungrouped neighbour.
        let dest = if let Some(next) = order.get(to + 1) {
            match self.notes.get_index_of(next) {
                Some(k) if from < k => k - 1,
                Some(k) => k,
                None => return false,
            }
        } else if to > 0 {
            match self.notes.get_index_of(&order[to - 1]) {
                Some(k) if from < k => k,
                Some(k) => k + 1,
                None => return false,
            }
        } else {
            return false;
        };

        if dest != from {
            self.notes.move_index(from, dest);
        }
        true
    }

    /// Repair a document that came from storage or import: drop member references that
    /// point at missing notes or that repeat a note already claimed by an earlier group,
    /// and restore empty group titles. Returns how many references were dropped.
    pub fn normalize(&mut self) -> usize {
        let Self { groups, notes } = self;
        let mut claimed: HashSet<NoteId> = HashSet::new();
        let mut dropped = 0;

        for g in groups.values_mut() {
            g.notes.retain(|n| {
                let keep = notes.contains_key(n) && claimed.insert(n.clone());
                if !keep {
                    dropped += 1;
                }
                keep
            });
            if g.title.trim().is_empty() {
                g.title = DEFAULT_GROUP_TITLE.to_string();
            }
        }

        dropped
    }
}

fn move_in_vec<T: PartialEq>(items: &mut Vec<T>, item: &T, new_index: usize) -> bool {
    let Some(from) = items.iter().position(|x| x == item) else {
        return false;
    };
    let to = new_index.min(items.len() - 1);
    if from == to {
        return false;
    }
    let x = items.remove(from);
    items.insert(to, x);
    true
}
