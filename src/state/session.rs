use crate::models::{Collection, GroupId, NoteId};

/// Selection / focus state: which note is open and which group title is being edited.
///
/// The two are independent; the UI uses the helpers below to disable conflicting actions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Session {
    pub current_note: Option<NoteId>,
    pub editing_group: Option<GroupId>,
}

impl Session {
    pub fn open_note(&mut self, id: NoteId) {
        self.current_note = Some(id);
    }

    pub fn is_open(&self, id: &NoteId) -> bool {
        self.current_note.as_ref() == Some(id)
    }

    pub fn is_renaming(&self, id: &GroupId) -> bool {
        self.editing_group.as_ref() == Some(id)
    }

    /// Clear focus if `id` was the open note. Returns whether it was.
    pub fn forget_note(&mut self, id: &NoteId) -> bool {
        if self.is_open(id) {
            self.current_note = None;
            true
        } else {
            false
        }
    }

    pub fn forget_group(&mut self, id: &GroupId) {
        if self.is_renaming(id) {
            self.editing_group = None;
        }
    }

    /// Only one rename at a time.
    pub fn begin_rename(&mut self, id: GroupId) -> bool {
        if self.editing_group.is_some() {
            return false;
        }
        self.editing_group = Some(id);
        true
    }

    pub fn finish_rename(&mut self) -> Option<GroupId> {
        self.editing_group.take()
    }

    /// Group that contains the open note, if any. Drives export scope.
    pub fn selected_group<'a>(&self, collection: &'a Collection) -> Option<&'a GroupId> {
        self.current_note
            .as_ref()
            .and_then(|n| collection.group_of(n))
    }

    pub fn can_drag(&self) -> bool {
        self.editing_group.is_none()
    }

    pub fn can_delete_group(&self, id: &GroupId) -> bool {
        !self.is_renaming(id)
    }

    /// Drop references to ids that no longer exist (after import, load or delete).
    pub fn reconcile(&mut self, collection: &Collection) {
        if let Some(n) = &self.current_note {
            if !collection.contains_note(n) {
                self.current_note = None;
            }
        }
        if let Some(g) = &self.editing_group {
            if !collection.contains_group(g) {
                self.editing_group = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forget_note_only_clears_open_note() {
        let mut c = Collection::default();
        let a = c.create_note();
        let b = c.create_note();
        let mut s = Session::default();
        s.open_note(a.clone());

        assert!(!s.forget_note(&b));
        assert!(s.is_open(&a));
        assert!(s.forget_note(&a));
        assert!(s.current_note.is_none());
    }

    #[test]
    fn test_single_rename_at_a_time() {
        let mut c = Collection::default();
        let g1 = c.create_group();
        let g2 = c.create_group();
        let mut s = Session::default();

        assert!(s.begin_rename(g1.clone()));
        assert!(!s.begin_rename(g2));
        assert!(!s.can_drag());
        assert!(!s.can_delete_group(&g1));
        assert_eq!(s.finish_rename(), Some(g1));
        assert!(s.can_drag());
    }

    #[test]
    fn test_selected_group_follows_open_note() {
        let mut c = Collection::default();
        let g = c.create_group();
        let a = c.create_note();
        let mut s = Session::default();
        assert!(s.selected_group(&c).is_none());

        s.open_note(a.clone());
        assert!(s.selected_group(&c).is_none());

        c.move_note_to_group(&a, Some(&g));
        assert_eq!(s.selected_group(&c), Some(&g));
    }

    #[test]
    fn test_reconcile_drops_stale_ids() {
        let mut c = Collection::default();
        let g = c.create_group();
        let a = c.create_note();
        let mut s = Session {
            current_note: Some(a.clone()),
            editing_group: Some(g.clone()),
        };

        c.delete_note(&a);
        c.delete_group(&g);
        s.reconcile(&c);
        assert_eq!(s, Session::default());
    }
}
