//! Persisted camera view settings
//!
//! The camera reads this record when it is created and writes it back every
//! time the viewport is recomputed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage key of the view-settings record
pub const VIEW_SETTINGS_KEY: &str = "diorama.viewSettings";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value storage for small serialized records
pub trait SettingsStore {
    fn read(&self, key: &str) -> Result<Option<String>, SettingsError>;
    fn write(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// In-process store, for tests and hosts without persistent storage
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.entries.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// One `<key>.json` file per record inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SettingsStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, SettingsError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// What the camera looks at and from where
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSettings {
    pub focus: [f32; 3],
    /// Extent of the scene kept in view
    pub view_size: f32,
    pub look_direction: [f32; 3],
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            focus: [0.0, 0.0, 0.0],
            view_size: 10.0,
            look_direction: [0.0, 0.0, -1.0],
        }
    }
}

impl ViewSettings {
    /// The stored record, or `None` if nothing was saved yet
    pub fn load(store: &dyn SettingsStore) -> Result<Option<Self>, SettingsError> {
        match store.read(VIEW_SETTINGS_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Overwrites the stored record
    pub fn save(&self, store: &dyn SettingsStore) -> Result<(), SettingsError> {
        let json = serde_json::to_string(self)?;
        store.write(VIEW_SETTINGS_KEY, &json)?;
        log::debug!("saved view settings (view size {})", self.view_size);
        Ok(())
    }
}
