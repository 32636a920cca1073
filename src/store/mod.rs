mod catalog;
mod file;
mod memory;
mod window;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::input::history::{HistoryEntry, NewHistoryEntry};

pub use file::FileStore;
pub use memory::MemoryStore;
pub use window::DEFAULT_HISTORY_CAPACITY;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub token: String,
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Alias {
    pub fn new(token: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            template: template.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("alias not found: {token} (panel {panel})")]
    AliasNotFound { panel: String, token: String },
    #[error("panel not found: {0}")]
    PanelNotFound(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt store file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

// Panels in creation order, aliases sorted by token.
pub trait AliasStore {
    fn panels(&self) -> Result<Vec<String>, StoreError>;

    fn has_panel(&self, panel: &str) -> Result<bool, StoreError>;

    // false when the panel already existed
    fn ensure_panel(&self, panel: &str) -> Result<bool, StoreError>;

    fn import_panel(&self, panel: &str, aliases: &[Alias]) -> Result<bool, StoreError>;

    fn remove_panel(&self, panel: &str) -> Result<(), StoreError>;

    fn get_alias(&self, panel: &str, token: &str) -> Result<Option<Alias>, StoreError>;

    fn set_alias(&self, panel: &str, alias: Alias) -> Result<(), StoreError>;

    fn delete_alias(&self, panel: &str, token: &str) -> Result<Alias, StoreError>;

    fn list_aliases(&self, panel: &str) -> Result<Vec<Alias>, StoreError>;
}

// Append-only command log. Reads return the newest entries first.
pub trait HistoryStore {
    fn append(&self, entry: NewHistoryEntry) -> Result<HistoryEntry, StoreError>;

    fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        self.search(None, limit)
    }

    fn search(&self, panel: Option<&str>, limit: usize) -> Result<Vec<HistoryEntry>, StoreError>;

    fn get(&self, id: u64) -> Result<Option<HistoryEntry>, StoreError>;
}

pub trait Store: AliasStore + HistoryStore {}

impl<T: AliasStore + HistoryStore> Store for T {}
