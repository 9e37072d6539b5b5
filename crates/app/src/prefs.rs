//! String-keyed preference storage that survives across sessions.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub mod keys {
    pub const WIDTH: &str = "width";
    pub const FPS: &str = "fps";
    pub const KIND: &str = "kind";
    pub const FILENAME: &str = "filename";
}

pub const DEFAULT_WIDTH: &str = "250";
pub const DEFAULT_FPS: &str = "30";
pub const DEFAULT_KIND: &str = "gif";
pub const DEFAULT_FILENAME: &str = crate::download::DEFAULT_FILENAME;

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Synchronous key-value string store.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), PrefsError>;
    fn entries(&self) -> BTreeMap<String, String>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(values: BTreeMap<String, String>) -> Self {
        Self {
            values: Mutex::new(values),
        }
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn entries(&self) -> BTreeMap<String, String> {
        self.values.lock().clone()
    }
}

/// Store persisted as a flat JSON object, rewritten on every `set`.
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFilePreferences {
    /// Open the store. A missing file starts empty; an unreadable one is
    /// logged and also starts empty. Scalar values written by other tools
    /// are kept as their JSON text; nested values are dropped.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read(&path) {
            Ok(raw) => match serde_json::from_slice::<BTreeMap<String, Value>>(&raw) {
                Ok(raw_values) => flatten_values(&path, raw_values),
                Err(e) => {
                    warn!(path = ?path, error = %e, "ignoring unreadable preferences file");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = ?path, error = %e, "could not read preferences file");
                BTreeMap::new()
            }
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn flatten_values(path: &Path, raw: BTreeMap<String, Value>) -> BTreeMap<String, String> {
    raw.into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some((key, s)),
            Value::Number(_) | Value::Bool(_) => Some((key, value.to_string())),
            other => {
                warn!(path = ?path, key = %key, value = %other, "skipping non-scalar preference");
                None
            }
        })
        .collect()
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PrefsError> {
        let mut values = self.values.lock();
        let mut next = values.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *values = next;
        Ok(())
    }

    fn entries(&self) -> BTreeMap<String, String> {
        self.values.lock().clone()
    }
}

/// Typed access over a [`PreferenceStore`].
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PreferenceStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPreferences::new()))
    }

    /// Parsed value, or `default` when missing or unparsable.
    pub fn get_or<T: FromStr>(&self, key: &str, default: T) -> T {
        self.store
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn get_raw(&self, key: &str, default: &str) -> String {
        self.store.get(key).unwrap_or_else(|| default.to_string())
    }

    pub fn set_value<T: Display + ?Sized>(&self, key: &str, value: &T) -> Result<(), PrefsError> {
        self.store.set(key, &value.to_string())
    }

    /// Current raw conversion inputs.
    pub fn raw_settings(&self) -> RawSettings {
        RawSettings {
            width: self.get_raw(keys::WIDTH, DEFAULT_WIDTH),
            fps: self.get_raw(keys::FPS, DEFAULT_FPS),
            kind: self.get_raw(keys::KIND, DEFAULT_KIND),
            filename: self.get_raw(keys::FILENAME, DEFAULT_FILENAME),
        }
    }
}

/// Unvalidated conversion inputs as the user typed them.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RawSettings {
    pub width: String,
    pub fps: String,
    pub kind: String,
    pub filename: String,
}
