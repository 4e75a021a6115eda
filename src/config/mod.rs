use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};

pub(crate) const DEFAULT_STORAGE_KEY: &str = "notes_app::notes";

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Display, AsRefStr, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub(crate) enum StorageBackendKind {
    #[default]
    Local,
    Memory,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct AppConfig {
    pub storage_key: String,
    pub storage_backend: StorageBackendKind,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            storage_backend: StorageBackendKind::default(),
        }
    }
}

impl AppConfig {
    /// Read `window.ENV`.
    ///
    /// Both `STORAGE_KEY` and `storage_key` spellings are accepted (same for the backend),
    /// upper-case first.
    pub fn from_window() -> Self {
        let lookup = |name: &str| -> Option<String> {
            let env = web_sys::window()?.get("ENV")?;
            if env.is_undefined() || !env.is_object() {
                return None;
            }
            js_sys::Reflect::get(&env, &name.into()).ok()?.as_string()
        };

        Self::resolve(
            lookup("STORAGE_KEY").or_else(|| lookup("storage_key")),
            lookup("STORAGE_BACKEND").or_else(|| lookup("storage_backend")),
        )
    }

    /// Apply raw values over the defaults. Blank keys and unknown backends are ignored.
    pub fn resolve(storage_key: Option<String>, storage_backend: Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(key) = storage_key.filter(|k| !k.trim().is_empty()) {
            cfg.storage_key = key.trim().to_string();
        }

        if let Some(raw) = storage_backend {
            match StorageBackendKind::from_str(raw.trim()) {
                Ok(kind) => cfg.storage_backend = kind,
                Err(_) => leptos::logging::warn!(
                    "[config] unknown storage backend {raw:?}, using {}",
                    cfg.storage_backend
                ),
            }
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let cfg = AppConfig::resolve(None, None);
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(cfg.storage_backend, StorageBackendKind::Local);
    }

    #[test]
    fn test_resolve_overrides() {
        let cfg = AppConfig::resolve(Some(" my-notes ".to_string()), Some("Memory".to_string()));
        assert_eq!(cfg.storage_key, "my-notes");
        assert_eq!(cfg.storage_backend, StorageBackendKind::Memory);
    }

    #[test]
    fn test_resolve_ignores_blank_and_unknown() {
        let cfg = AppConfig::resolve(Some("   ".to_string()), Some("indexeddb".to_string()));
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_backend_kind_strings() {
        assert_eq!(StorageBackendKind::Memory.to_string(), "memory");
        assert_eq!(StorageBackendKind::Local.as_ref(), "local");
    }
}
