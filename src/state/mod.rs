use crate::config::AppConfig;
use crate::controller::{step_reorder, Direction, DragController, DragSource, HoverSurface, Placement};
use crate::models::{Collection, GroupId, NoteId};
use crate::storage::{Backend, StoreWriter, SIDEBAR_COLLAPSED_KEY};
use crate::transfer::{download_json, export_document, import_json};
use leptos::logging::{log, warn};
use leptos::prelude::*;
use wasm_bindgen::JsCast;

mod session;

pub(crate) use session::Session;

/// Reactive application state. Every collection mutation goes through [`AppState::edit`],
/// which queues a snapshot for the store.
#[derive(Clone, Copy)]
pub(crate) struct AppState {
    pub config: StoredValue<AppConfig>,
    pub collection: RwSignal<Collection>,
    pub session: RwSignal<Session>,
    pub drag: RwSignal<DragController>,

    /// Last user-facing message (save failures, import results).
    pub notice: RwSignal<Option<String>>,

    /// Global UI state.
    pub sidebar_collapsed: RwSignal<bool>,

    writer: StoredValue<StoreWriter<Backend>>,
    save_notice: StoredValue<Option<String>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let writer = StoreWriter::new(
            Backend::from_kind(config.storage_backend),
            config.storage_key.clone(),
        );
        let mut collection = writer.load();
        let sidebar_collapsed = writer.read_flag(SIDEBAR_COLLAPSED_KEY);

        // First run: start with one open note.
        let mut session = Session::default();
        let first_run = collection.is_empty();
        if first_run {
            session.open_note(collection.create_note());
        }

        log!(
            "[state] storage: {} ({})",
            config.storage_key,
            config.storage_backend
        );

        let s = Self {
            config: StoredValue::new(config),
            collection: RwSignal::new(collection),
            session: RwSignal::new(session),
            drag: RwSignal::new(DragController::default()),
            notice: RwSignal::new(None),
            sidebar_collapsed: RwSignal::new(sidebar_collapsed),
            writer: StoredValue::new(writer),
            save_notice: StoredValue::new(None),
        };
        if first_run {
            s.persist();
        }
        s
    }

    /// Apply `f` and persist when it reports a change.
    pub fn edit(&self, f: impl FnOnce(&mut Collection) -> bool) -> bool {
        let mut changed = false;
        self.collection.maybe_update(|c| {
            changed = f(c);
            changed
        });
        if changed {
            self.persist();
        }
        changed
    }

    fn persist(&self) {
        let needs_flush = self
            .collection
            .with_untracked(|c| self.writer.try_update_value(|w| w.submit(c)))
            .unwrap_or(false);
        if needs_flush {
            self.schedule_flush();
        }
    }

    fn schedule_flush(&self) {
        let Some(win) = web_sys::window() else {
            self.flush();
            return;
        };

        let s2 = *self;
        let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
            s2.flush();
        });
        if win
            .set_timeout_with_callback_and_timeout_and_arguments_0(cb.as_ref().unchecked_ref(), 0)
            .is_err()
        {
            self.flush();
        }
    }

    /// Write the newest queued snapshot now. Also called on `pagehide`.
    pub fn flush(&self) {
        if self.writer.try_update_value(|w| w.flush()).flatten().is_none() {
            return;
        }
        let error = self
            .writer
            .try_with_value(|w| w.last_error().map(|e| e.to_string()))
            .flatten();
        let save_notice = self.save_notice;
        match error {
            Some(e) => {
                let msg = format!("Your notes could not be saved: {e}");
                save_notice.set_value(Some(msg.clone()));
                self.notice.set(Some(msg));
            }
            None => {
                // A save error shown earlier is resolved once a later snapshot lands.
                if let Some(shown) = save_notice.try_update_value(|n| n.take()).flatten() {
                    self.notice.maybe_update(|n| {
                        let stale = n.as_ref() == Some(&shown);
                        if stale {
                            *n = None;
                        }
                        stale
                    });
                }
            }
        }
    }

    /// Creates a note and opens it. `None` only once the app has been torn down.
    pub fn create_note(&self) -> Option<NoteId> {
        let id = self.collection.try_update(|c| c.create_note())?;
        self.persist();
        self.session.update(|s| s.open_note(id.clone()));
        Some(id)
    }

    pub fn create_group(&self) -> Option<GroupId> {
        let id = self.collection.try_update(|c| c.create_group())?;
        self.persist();
        Some(id)
    }

    pub fn open_note(&self, id: &NoteId) {
        if self.collection.with_untracked(|c| c.contains_note(id)) {
            self.session.update(|s| s.open_note(id.clone()));
        }
    }

    pub fn delete_note(&self, id: &NoteId) {
        if self.edit(|c| c.delete_note(id)) {
            self.session.update(|s| {
                s.forget_note(id);
            });
        }
    }

    pub fn delete_group(&self, id: &GroupId) {
        if !self.session.with_untracked(|s| s.can_delete_group(id)) {
            return;
        }
        if self.edit(|c| c.delete_group(id)) {
            self.session.update(|s| s.forget_group(id));
        }
    }

    pub fn set_note_content(&self, id: &NoteId, content: String) {
        self.edit(|c| {
            c.notes.get(id).is_some_and(|n| n.content != content) && c.set_note_content(id, content)
        });
    }

    pub fn toggle_group(&self, id: &GroupId) {
        self.edit(|c| c.toggle_group_collapsed(id).is_some());
    }

    pub fn begin_rename(&self, id: &GroupId) -> bool {
        if self.drag.with_untracked(|d| d.is_dragging()) {
            return false;
        }
        let mut started = false;
        self.session.maybe_update(|s| {
            started = s.begin_rename(id.clone());
            started
        });
        started
    }

    /// Commit the title typed into the active rename field. No-op when nothing is being renamed.
    pub fn commit_rename(&self, title: &str) {
        let mut finished = None;
        self.session.maybe_update(|s| {
            finished = s.finish_rename();
            finished.is_some()
        });
        if let Some(id) = finished {
            self.edit(|c| {
                c.groups.get(&id).is_some_and(|g| g.title != title.trim())
                    && c.rename_group(&id, title)
            });
        }
    }

    pub fn cancel_rename(&self) {
        self.session.maybe_update(|s| s.finish_rename().is_some());
    }

    /// Returns `false` when a drag may not start (a group title is being edited).
    pub fn begin_drag(&self, source: DragSource) -> bool {
        if !self.session.with_untracked(|s| s.can_drag()) {
            return false;
        }
        self.drag.update(|d| d.begin(source));
        true
    }

    /// Pointer-over on `surface`. `None` when the surface leaves this drag to the surfaces
    /// around it (the event should keep bubbling); otherwise whether it accepts the drop.
    /// A surface that rejects the drop also clears any earlier target.
    pub fn hover_drag(&self, surface: HoverSurface, placement: Placement) -> Option<bool> {
        if !self.drag.with_untracked(|d| d.handles(&surface)) {
            return None;
        }
        let mut accepted = false;
        self.drag.maybe_update(|d| {
            let before = d.target().cloned();
            accepted = d.hover(surface, placement).is_some();
            d.target() != before.as_ref()
        });
        Some(accepted)
    }

    pub fn drop_drag(&self) {
        let mut drag = DragController::default();
        self.drag.update(|d| std::mem::swap(d, &mut drag));
        self.edit(|c| drag.drop(c));
    }

    pub fn cancel_drag(&self) {
        self.drag.maybe_update(|d| {
            let was_dragging = d.is_dragging();
            d.cancel();
            was_dragging
        });
    }

    pub fn step_focused(&self, direction: Direction) -> bool {
        let session = self.session.get_untracked();
        self.edit(|c| step_reorder(c, &session, direction))
    }

    pub fn toggle_sidebar(&self) {
        self.sidebar_collapsed.update(|v| *v = !*v);
        let collapsed = self.sidebar_collapsed.get_untracked();
        self.writer
            .update_value(|w| w.write_flag(SIDEBAR_COLLAPSED_KEY, collapsed));
    }

    /// Merge an import file's text into the collection and report the outcome in `notice`.
    pub fn import_text(&self, text: Result<String, String>) {
        let text = match text {
            Ok(t) => t,
            Err(e) => {
                warn!("[import] {e}");
                self.notice.set(Some(e));
                return;
            }
        };

        let mut outcome = None;
        self.edit(|c| {
            let result = import_json(c, &text);
            let changed = result
                .as_ref()
                .is_ok_and(|s| s.groups_added + s.notes_added + s.members_added + s.dropped > 0);
            outcome = Some(result);
            changed
        });

        match outcome {
            Some(Ok(summary)) => {
                let c = self.collection.get_untracked();
                self.session.update(|s| s.reconcile(&c));
                self.notice.set(Some(summary.to_string()));
            }
            Some(Err(e)) => self.notice.set(Some(e.to_string())),
            None => {}
        }
    }

    pub fn export(&self) {
        let file = self
            .collection
            .with_untracked(|c| self.session.with_untracked(|s| export_document(c, s)));

        let result = file
            .to_json()
            .map_err(|e| e.to_string())
            .and_then(|json| download_json(&file.file_name, &json));
        match result {
            Ok(()) => log!("[export] {}", file.file_name),
            Err(e) => {
                warn!("[export] {e}");
                self.notice.set(Some(format!("Export failed: {e}")));
            }
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct AppContext(pub AppState);
