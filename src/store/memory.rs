use std::sync::{Mutex, MutexGuard};

use super::catalog::Catalog;
use super::window::{HistoryWindow, DEFAULT_HISTORY_CAPACITY};
use super::{Alias, AliasStore, HistoryStore, StoreError};
use crate::input::history::{HistoryEntry, NewHistoryEntry};

struct MemoryHistory {
    window: HistoryWindow,
    next_id: u64,
}

// Same semantics as FileStore without the disk. History beyond the window
// capacity is gone for good.
pub struct MemoryStore {
    catalog: Mutex<Catalog>,
    history: Mutex<MemoryHistory>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            catalog: Mutex::new(Catalog::default()),
            history: Mutex::new(MemoryHistory {
                window: HistoryWindow::new(capacity),
                next_id: 1,
            }),
        }
    }

    fn catalog(&self) -> Result<MutexGuard<'_, Catalog>, StoreError> {
        self.catalog.lock().map_err(|_| StoreError::Poisoned)
    }

    fn history(&self) -> Result<MutexGuard<'_, MemoryHistory>, StoreError> {
        self.history.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl AliasStore for MemoryStore {
    fn panels(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.catalog()?.panel_ids())
    }

    fn has_panel(&self, panel: &str) -> Result<bool, StoreError> {
        Ok(self.catalog()?.has_panel(panel))
    }

    fn ensure_panel(&self, panel: &str) -> Result<bool, StoreError> {
        Ok(self.catalog()?.ensure_panel(panel))
    }

    fn import_panel(&self, panel: &str, aliases: &[Alias]) -> Result<bool, StoreError> {
        Ok(self.catalog()?.import_panel(panel, aliases))
    }

    fn remove_panel(&self, panel: &str) -> Result<(), StoreError> {
        self.catalog()?.remove_panel(panel)
    }

    fn get_alias(&self, panel: &str, token: &str) -> Result<Option<Alias>, StoreError> {
        Ok(self.catalog()?.get_alias(panel, token))
    }

    fn set_alias(&self, panel: &str, alias: Alias) -> Result<(), StoreError> {
        self.catalog()?.set_alias(panel, alias);
        Ok(())
    }

    fn delete_alias(&self, panel: &str, token: &str) -> Result<Alias, StoreError> {
        self.catalog()?.delete_alias(panel, token)
    }

    fn list_aliases(&self, panel: &str) -> Result<Vec<Alias>, StoreError> {
        self.catalog()?.list_aliases(panel)
    }
}

impl HistoryStore for MemoryStore {
    fn append(&self, entry: NewHistoryEntry) -> Result<HistoryEntry, StoreError> {
        let mut history = self.history()?;
        let entry = entry.with_id(history.next_id);
        history.next_id += 1;
        history.window.push(entry.clone());
        Ok(entry)
    }

    fn search(&self, panel: Option<&str>, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(self.history()?.window.newest(panel, limit))
    }

    fn get(&self, id: u64) -> Result<Option<HistoryEntry>, StoreError> {
        Ok(self.history()?.window.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(input: &str) -> NewHistoryEntry {
        NewHistoryEntry {
            timestamp: Utc::now(),
            panel: "os".to_string(),
            input: input.to_string(),
            resolved_command: input.to_string(),
            exit_code: 0,
            timed_out: false,
            duration_ms: 0,
            output_excerpt: String::new(),
        }
    }

    #[test]
    fn test_history_is_capped_and_ids_keep_growing() {
        let store = MemoryStore::with_history_capacity(2);
        for input in ["a", "b", "c"] {
            store.append(entry(input)).unwrap();
        }

        let inputs: Vec<String> = store.recent(10).unwrap().into_iter().map(|e| e.input).collect();
        assert_eq!(inputs, vec!["c", "b"]);
        assert_eq!(store.get(3).unwrap().map(|e| e.input), Some("c".to_string()));
        assert_eq!(store.get(1).unwrap(), None);
        assert_eq!(store.append(entry("d")).unwrap().id, 4);
    }
}
