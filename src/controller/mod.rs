use crate::models::{Collection, GroupId, ItemRef, NoteId};
use crate::state::Session;
use leptos::logging::log;

/// What is being dragged. Captured once at gesture start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DragSource {
    Note(NoteId),
    Group(GroupId),
}

/// What the pointer is over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum HoverSurface {
    Group(GroupId),
    Note(NoteId),
    /// The list background.
    Container,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Placement {
    Before,
    After,
}

impl Placement {
    /// Before when the pointer is above the hovered item's vertical midpoint.
    pub fn from_pointer(pointer_y: f64, item_top: f64, item_height: f64) -> Self {
        let mid = item_top + item_height / 2.0;
        if pointer_y < mid {
            Self::Before
        } else {
            Self::After
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DropTarget {
    /// Append to the group's members.
    IntoGroup(GroupId),
    /// Next to a note, in whatever container that note is in.
    BesideNote { note: NoteId, placement: Placement },
    /// Last ungrouped note.
    Ungrouped,
    /// Next to a group in the top-level order.
    BesideGroup { group: GroupId, placement: Placement },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum DragState {
    #[default]
    Idle,
    Dragging(DragSource),
}

/// Drag-and-drop state machine. Mutates the collection only on `drop`.
#[derive(Clone, Debug, Default)]
pub(crate) struct DragController {
    state: DragState,
    target: Option<DropTarget>,
}

impl DragController {
    #[cfg(test)]
    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn target(&self) -> Option<&DropTarget> {
        self.target.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn begin(&mut self, source: DragSource) {
        self.state = DragState::Dragging(source);
        self.target = None;
    }

    /// Whether `surface` decides drops for the current drag. Notes are decided by the
    /// innermost row they are over; groups only by group rows and the list itself. A surface
    /// that handles the drag must keep its event from reaching outer surfaces, even when it
    /// rejects the drop.
    pub fn handles(&self, surface: &HoverSurface) -> bool {
        match &self.state {
            DragState::Idle => false,
            DragState::Dragging(DragSource::Note(_)) => true,
            DragState::Dragging(DragSource::Group(_)) => !matches!(surface, HoverSurface::Note(_)),
        }
    }

    /// Recompute the drop target for a pointer-over event. `None` means this surface does
    /// not accept the current drag.
    pub fn hover(&mut self, surface: HoverSurface, placement: Placement) -> Option<&DropTarget> {
        let DragState::Dragging(source) = &self.state else {
            return None;
        };

        self.target = match (source, surface) {
            (DragSource::Note(_), HoverSurface::Group(g)) => Some(DropTarget::IntoGroup(g)),
            (DragSource::Note(dragged), HoverSurface::Note(n)) if *dragged != n => {
                Some(DropTarget::BesideNote { note: n, placement })
            }
            (DragSource::Note(_), HoverSurface::Note(_)) => None,
            (DragSource::Note(_), HoverSurface::Container) => Some(DropTarget::Ungrouped),
            (DragSource::Group(dragged), HoverSurface::Group(g)) if *dragged != g => {
                Some(DropTarget::BesideGroup {
                    group: g,
                    placement,
                })
            }
            // Groups only land next to other groups.
            (DragSource::Group(_), _) => None,
        };
        self.target.as_ref()
    }

    /// Drag ended without a drop.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
        self.target = None;
    }

    /// Resolve the last hovered target into collection mutations. Returns whether the
    /// collection changed; the controller is idle afterwards either way.
    pub fn drop(&mut self, collection: &mut Collection) -> bool {
        let state = std::mem::take(&mut self.state);
        let target = self.target.take();

        let (DragState::Dragging(source), Some(target)) = (state, target) else {
            return false;
        };

        let before = collection.clone();
        apply_drop(collection, &source, &target);
        let changed = *collection != before;
        log!("[drag] {source:?} -> {target:?} (changed: {changed})");
        changed
    }
}

fn apply_drop(collection: &mut Collection, source: &DragSource, target: &DropTarget) {
    match (source, target) {
        (DragSource::Note(note), DropTarget::IntoGroup(group)) => {
            if collection.contains_group(group) {
                collection.move_note_to_group(note, None);
                collection.move_note_to_group(note, Some(group));
            }
        }
        (DragSource::Note(note), DropTarget::Ungrouped) => {
            if collection.contains_note(note) {
                collection.move_note_to_group(note, None);
                collection.reorder_within_container(None, &ItemRef::Note(note.clone()), usize::MAX);
            }
        }
        (DragSource::Note(note), DropTarget::BesideNote { note: anchor, placement }) => {
            if note == anchor || !collection.contains_note(note) || !collection.contains_note(anchor)
            {
                return;
            }
            let container = collection.group_of(anchor).cloned();

            collection.move_note_to_group(note, None);
            collection.move_note_to_group(note, container.as_ref());

            let siblings: Vec<&NoteId> = match &container {
                Some(g) => collection.groups[g].notes.iter().collect(),
                None => collection.ungrouped_notes(),
            };
            let Some(anchor_idx) = siblings
                .into_iter()
                .filter(|id| *id != note)
                .position(|id| id == anchor)
            else {
                return;
            };
            let new_index = match placement {
                Placement::Before => anchor_idx,
                Placement::After => anchor_idx + 1,
            };
            collection.reorder_within_container(
                container.as_ref(),
                &ItemRef::Note(note.clone()),
                new_index,
            );
        }
        (DragSource::Group(group), DropTarget::BesideGroup { group: anchor, placement }) => {
            let Some(anchor_idx) = collection
                .groups
                .keys()
                .filter(|id| *id != group)
                .position(|id| id == anchor)
            else {
                return;
            };
            let new_index = match placement {
                Placement::Before => anchor_idx,
                Placement::After => anchor_idx + 1,
            };
            collection.reorder_groups(group, new_index);
        }
        _ => {}
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Up,
    Down,
}

/// Swap the focused item (open note first, else the group being renamed) with its neighbour
/// in the same container. No-op at either end. Returns whether anything moved.
pub(crate) fn step_reorder(
    collection: &mut Collection,
    session: &Session,
    direction: Direction,
) -> bool {
    let (container, item, index, len) = if let Some(note) = &session.current_note {
        if !collection.contains_note(note) {
            return false;
        }
        match collection.group_of(note).cloned() {
            Some(g) => {
                let members = &collection.groups[&g].notes;
                let Some(i) = members.iter().position(|n| n == note) else {
                    return false;
                };
                let len = members.len();
                (Some(g), ItemRef::Note(note.clone()), i, len)
            }
            None => {
                let ungrouped = collection.ungrouped_notes();
                let Some(i) = ungrouped.iter().position(|n| *n == note) else {
                    return false;
                };
                (None, ItemRef::Note(note.clone()), i, ungrouped.len())
            }
        }
    } else if let Some(group) = &session.editing_group {
        let Some(i) = collection.groups.get_index_of(group) else {
            return false;
        };
        (None, ItemRef::Group(group.clone()), i, collection.groups.len())
    } else {
        return false;
    };

    let new_index = match direction {
        Direction::Up if index > 0 => index - 1,
        Direction::Down if index + 1 < len => index + 1,
        _ => return false,
    };
    collection.reorder_within_container(container.as_ref(), &item, new_index)
}
