use crate::models::{Collection, GroupId, NoteId};
use crate::state::Session;
use scraper::{ElementRef, Html};

pub(crate) const UNTITLED_NOTE: &str = "Untitled Note";

// Text inside these never becomes a title.
const SKIPPED_ELEMENTS: [&str; 3] = ["script", "style", "template"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NoteEntry {
    pub id: NoteId,
    pub title: String,
    pub open: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct GroupEntry {
    pub id: GroupId,
    pub title: String,
    pub collapsed: bool,
    pub renaming: bool,
    pub member_count: usize,
    /// Empty when collapsed.
    pub notes: Vec<NoteEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ListEntry {
    Group(GroupEntry),
    Note(NoteEntry),
}

/// Stable identity of a top-level row, for keyed rendering.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum EntryKey {
    Group(GroupId),
    Note(NoteId),
}

impl ListEntry {
    pub fn key(&self) -> EntryKey {
        match self {
            Self::Group(g) => EntryKey::Group(g.id.clone()),
            Self::Note(n) => EntryKey::Note(n.id.clone()),
        }
    }
}

pub(crate) fn find_group<'a>(list: &'a [ListEntry], id: &GroupId) -> Option<&'a GroupEntry> {
    list.iter().find_map(|e| match e {
        ListEntry::Group(g) if g.id == *id => Some(g),
        _ => None,
    })
}

/// A visible note row: ungrouped, or a member of an expanded group.
pub(crate) fn find_note<'a>(list: &'a [ListEntry], id: &NoteId) -> Option<&'a NoteEntry> {
    list.iter().find_map(|e| match e {
        ListEntry::Note(n) if n.id == *id => Some(n),
        ListEntry::Group(g) => g.notes.iter().find(|n| n.id == *id),
        ListEntry::Note(_) => None,
    })
}

/// Display tree: groups in order (with their members unless collapsed), then ungrouped notes.
pub(crate) fn project(collection: &Collection, session: &Session) -> Vec<ListEntry> {
    let note_entry = |id: &NoteId| NoteEntry {
        id: id.clone(),
        title: collection
            .notes
            .get(id)
            .map(|n| note_title(&n.content))
            .unwrap_or_else(|| UNTITLED_NOTE.to_string()),
        open: session.is_open(id),
    };

    let mut out: Vec<ListEntry> = collection
        .groups
        .iter()
        .map(|(id, g)| {
            ListEntry::Group(GroupEntry {
                id: id.clone(),
                title: g.title.clone(),
                collapsed: g.collapsed,
                renaming: session.is_renaming(id),
                member_count: g.notes.len(),
                notes: if g.collapsed {
                    vec![]
                } else {
                    g.notes.iter().map(note_entry).collect()
                },
            })
        })
        .collect();

    out.extend(
        collection
            .ungrouped_notes()
            .into_iter()
            .map(|id| ListEntry::Note(note_entry(id))),
    );
    out
}

/// First non-empty trimmed text among the content's top-level nodes, scanned in document
/// order (an element contributes all of its descendant text).
pub(crate) fn note_title(content: &str) -> String {
    if content.trim().is_empty() {
        return UNTITLED_NOTE.to_string();
    }

    let fragment = Html::parse_fragment(content);
    for child in fragment.root_element().children() {
        let mut text = String::new();
        if let Some(t) = child.value().as_text() {
            text.push_str(t);
        } else if let Some(el) = ElementRef::wrap(child) {
            collect_text(el, &mut text);
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    UNTITLED_NOTE.to_string()
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    if SKIPPED_ELEMENTS.contains(&el.value().name()) {
        return;
    }
    for child in el.children() {
        if let Some(t) = child.value().as_text() {
            out.push_str(t);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            collect_text(child_el, out);
        }
    }
}
