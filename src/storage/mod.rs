use crate::config::StorageBackendKind;
use crate::models::Collection;
use leptos::logging::{error, log, warn};
use std::collections::HashMap;

pub(crate) const SIDEBAR_COLLAPSED_KEY: &str = "notes_app_sidebar_collapsed";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum StoreErrorKind {
    Unavailable,
    Read,
    Write,
    Parse,
    Serialize,
}

#[derive(Clone, Debug)]
pub(crate) struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StoreError {
    fn unavailable() -> Self {
        Self {
            kind: StoreErrorKind::Unavailable,
            message: "Local storage is not available".to_string(),
        }
    }

    fn read(e: impl std::fmt::Debug) -> Self {
        Self {
            kind: StoreErrorKind::Read,
            message: format!("Failed to read notes: {e:?}"),
        }
    }

    fn write(e: impl std::fmt::Debug) -> Self {
        Self {
            kind: StoreErrorKind::Write,
            message: format!("Failed to save notes: {e:?}"),
        }
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: StoreErrorKind::Parse,
            message: format!("Stored notes are unreadable: {e}"),
        }
    }

    fn serialize(e: impl std::fmt::Display) -> Self {
        Self {
            kind: StoreErrorKind::Serialize,
            message: format!("Failed to serialize notes: {e}"),
        }
    }
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

/// Key-value storage of serialized documents.
pub(crate) trait DocumentStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn put(&mut self, key: &str, document: &str) -> StoreResult<()>;
}

/// Browser `localStorage`. The handle is looked up per call, like every other storage
/// access in the app, so the backend itself carries no JS state.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct LocalStorageBackend;

impl LocalStorageBackend {
    fn storage() -> StoreResult<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or_else(StoreError::unavailable)
    }
}

impl DocumentStore for LocalStorageBackend {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Self::storage()?.get_item(key).map_err(StoreError::read)
    }

    fn put(&mut self, key: &str, document: &str) -> StoreResult<()> {
        // Quota errors surface here.
        Self::storage()?
            .set_item(key, document)
            .map_err(StoreError::write)
    }
}

/// Process-local storage. Used when configured, and by tests.
#[derive(Clone, Debug, Default)]
pub(crate) struct MemoryBackend {
    entries: HashMap<String, String>,
    fail_writes: bool,
}

impl MemoryBackend {
    #[cfg(test)]
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }
}

impl DocumentStore for MemoryBackend {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, document: &str) -> StoreResult<()> {
        if self.fail_writes {
            return Err(StoreError::write("memory backend rejects writes"));
        }
        self.entries.insert(key.to_string(), document.to_string());
        Ok(())
    }
}

/// Whichever backend the configuration selected.
#[derive(Clone, Debug)]
pub(crate) enum Backend {
    Local(LocalStorageBackend),
    Memory(MemoryBackend),
}

impl Backend {
    pub fn from_kind(kind: StorageBackendKind) -> Self {
        match kind {
            StorageBackendKind::Local => Self::Local(LocalStorageBackend),
            StorageBackendKind::Memory => Self::Memory(MemoryBackend::default()),
        }
    }
}

impl DocumentStore for Backend {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self {
            Self::Local(b) => b.get(key),
            Self::Memory(b) => b.get(key),
        }
    }

    fn put(&mut self, key: &str, document: &str) -> StoreResult<()> {
        match self {
            Self::Local(b) => b.put(key, document),
            Self::Memory(b) => b.put(key, document),
        }
    }
}

/// Read and repair the stored collection. `Ok(None)` when nothing was saved yet.
pub(crate) fn load_collection(
    store: &impl DocumentStore,
    key: &str,
) -> StoreResult<Option<Collection>> {
    let Some(json) = store.get(key)? else {
        return Ok(None);
    };
    let mut collection: Collection = serde_json::from_str(&json).map_err(StoreError::parse)?;
    let dropped = collection.normalize();
    if dropped > 0 {
        warn!("[store] dropped {dropped} invalid group member reference(s) on load");
    }
    Ok(Some(collection))
}

/// Load for startup: any failure falls back to an empty collection.
pub(crate) fn load_or_default(store: &impl DocumentStore, key: &str) -> Collection {
    match load_collection(store, key) {
        Ok(Some(c)) => {
            log!(
                "[store] loaded {} group(s), {} note(s)",
                c.groups.len(),
                c.notes.len()
            );
            c
        }
        Ok(None) => Collection::default(),
        Err(e) => {
            warn!("[store] load failed, starting empty: {e}");
            Collection::default()
        }
    }
}

/// Serializes full-document writes in submission order.
///
/// `submit` only records the newest snapshot; `flush` writes it. A snapshot submitted while
/// another is still pending replaces it, so an older snapshot can never land after a newer
/// one. Callers schedule one `flush` whenever `submit` returns `true`.
pub(crate) struct StoreWriter<B> {
    backend: B,
    key: String,
    next_seq: u64,
    pending: Option<(u64, String)>,
    last_error: Option<StoreError>,
}

impl<B: DocumentStore> StoreWriter<B> {
    pub fn new(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            next_seq: 1,
            pending: None,
            last_error: None,
        }
    }

    pub fn load(&self) -> Collection {
        load_or_default(&self.backend, &self.key)
    }

    /// Returns `true` when no flush was outstanding, i.e. the caller must schedule one.
    pub fn submit(&mut self, collection: &Collection) -> bool {
        let json = match serde_json::to_string(collection) {
            Ok(json) => json,
            Err(e) => {
                let e = StoreError::serialize(e);
                warn!("[store] {e}");
                self.last_error = Some(e);
                return false;
            }
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        let was_idle = self.pending.is_none();
        self.pending = Some((seq, json));
        was_idle
    }

    #[cfg(test)]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Write the newest pending snapshot. `None` when there was nothing to write.
    pub fn flush(&mut self) -> Option<StoreResult<u64>> {
        let (seq, json) = self.pending.take()?;
        match self.backend.put(&self.key, &json) {
            Ok(()) => {
                log!("[store] saved snapshot #{seq} ({} bytes)", json.len());
                self.last_error = None;
                Some(Ok(seq))
            }
            Err(e) => {
                error!("[store] snapshot #{seq} not saved: {e}");
                self.last_error = Some(e.clone());
                Some(Err(e))
            }
        }
    }

    /// Error from the most recent serialize or write attempt, cleared by a successful write.
    pub fn last_error(&self) -> Option<&StoreError> {
        self.last_error.as_ref()
    }

    /// Small UI preference stored next to the document. Unreadable values count as `false`.
    pub fn read_flag(&self, key: &str) -> bool {
        matches!(self.backend.get(key), Ok(Some(v)) if v == "1" || v == "true")
    }

    pub fn write_flag(&mut self, key: &str, value: bool) {
        if let Err(e) = self.backend.put(key, if value { "1" } else { "0" }) {
            warn!("[store] could not save {key}: {e}");
        }
    }

    #[cfg(test)]
    fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GroupId, NoteId};

    const KEY: &str = "test::notes";

    fn sample() -> Collection {
        let mut c = Collection::default();
        let g = c.create_group();
        let a = c.create_note();
        let b = c.create_note();
        c.create_note();
        c.rename_group(&g, "Work");
        c.set_note_content(&a, "<b>Plan</b> for <i>today</i>");
        c.move_note_to_group(&b, Some(&g));
        c.move_note_to_group(&a, Some(&g));
        c.toggle_group_collapsed(&g);
        c
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let c = sample();
        let mut w = StoreWriter::new(MemoryBackend::default(), KEY);
        assert!(w.submit(&c));
        assert!(matches!(w.flush(), Some(Ok(1))));
        assert_eq!(w.load(), c);
    }

    #[test]
    fn test_load_missing_is_empty() {
        let store = MemoryBackend::default();
        assert!(load_collection(&store, KEY).expect("should read").is_none());
        assert!(load_or_default(&store, KEY).is_empty());
    }

    #[test]
    fn test_load_garbage_falls_back_to_empty() {
        let mut store = MemoryBackend::default();
        store.put(KEY, "{not json").expect("memory put");
        let err = load_collection(&store, KEY).expect_err("should fail");
        assert_eq!(err.kind, StoreErrorKind::Parse);
        assert!(load_or_default(&store, KEY).is_empty());
    }

    #[test]
    fn test_load_repairs_dangling_members() {
        let mut store = MemoryBackend::default();
        store
            .put(
                KEY,
                r#"{"groups":{"g":{"title":"G","notes":["a","ghost"],"collapsed":false}},"notes":{"a":{"content":"A"}}}"#,
            )
            .expect("memory put");
        let c = load_or_default(&store, KEY);
        assert_eq!(c.groups[&GroupId::from("g")].notes, vec![NoteId::from("a")]);
    }

    #[test]
    fn test_newer_snapshot_supersedes_pending_one() {
        let mut c = sample();
        let mut w = StoreWriter::new(MemoryBackend::default(), KEY);

        assert!(w.submit(&c));
        let n = c.create_note();
        // A flush is already outstanding; no second one needed.
        assert!(!w.submit(&c));

        assert!(matches!(w.flush(), Some(Ok(2))));
        assert!(w.flush().is_none());
        assert!(w.load().contains_note(&n));
    }

    #[test]
    fn test_writes_apply_in_submission_order() {
        let mut c = Collection::default();
        let mut w = StoreWriter::new(MemoryBackend::default(), KEY);
        let mut last = None;
        for _ in 0..5 {
            c.create_note();
            w.submit(&c);
            last = w.flush();
        }
        assert!(matches!(last, Some(Ok(5))));
        let stored = w
            .backend()
            .get(KEY)
            .expect("memory get")
            .expect("document present");
        assert_eq!(serde_json::to_string(&c).expect("serialize"), stored);
    }

    #[test]
    fn test_failed_write_is_reported() {
        let c = sample();
        let mut w = StoreWriter::new(MemoryBackend::failing_writes(), KEY);
        assert!(w.submit(&c));
        let res = w.flush().expect("a write was attempted");
        assert_eq!(res.expect_err("should fail").kind, StoreErrorKind::Write);
        assert!(w.last_error().is_some());
        assert!(!w.has_pending());
    }

    #[test]
    fn test_successful_write_clears_last_error() {
        let c = sample();
        let mut w = StoreWriter::new(MemoryBackend::failing_writes(), KEY);
        w.submit(&c);
        assert!(matches!(w.flush(), Some(Err(_))));
        assert!(w.last_error().is_some());

        w.backend.fail_writes = false;
        w.submit(&c);
        assert!(matches!(w.flush(), Some(Ok(2))));
        assert!(w.last_error().is_none());
        assert_eq!(w.load(), c);
    }

    #[test]
    fn test_flags_default_to_false() {
        let mut w = StoreWriter::new(MemoryBackend::default(), KEY);
        assert!(!w.read_flag(SIDEBAR_COLLAPSED_KEY));
        w.write_flag(SIDEBAR_COLLAPSED_KEY, true);
        assert!(w.read_flag(SIDEBAR_COLLAPSED_KEY));
        w.write_flag(SIDEBAR_COLLAPSED_KEY, false);
        assert!(!w.read_flag(SIDEBAR_COLLAPSED_KEY));
        // Flags never disturb the document slot.
        assert!(!w.has_pending());
        assert!(w.load().is_empty());
    }

    #[test]
    fn test_backend_from_kind() {
        assert!(matches!(
            Backend::from_kind(StorageBackendKind::Memory),
            Backend::Memory(_)
        ));
        assert!(matches!(
            Backend::from_kind(StorageBackendKind::Local),
            Backend::Local(_)
        ));
    }
}

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_local_storage_round_trip() {
        let key = "notes_app::wasm_test";
        let mut c = Collection::default();
        let g = c.create_group();
        let n = c.create_note();
        c.move_note_to_group(&n, Some(&g));

        let mut w = StoreWriter::new(LocalStorageBackend, key);
        w.submit(&c);
        assert!(matches!(w.flush(), Some(Ok(_))));
        assert_eq!(w.load(), c);
    }
}
