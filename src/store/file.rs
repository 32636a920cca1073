use std::{
    collections::VecDeque,
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use tracing::{debug, info, warn};

use super::catalog::Catalog;
use super::window::{HistoryWindow, DEFAULT_HISTORY_CAPACITY};
use super::{Alias, AliasStore, HistoryStore, StoreError};
use crate::input::history::{HistoryEntry, NewHistoryEntry};

const ALIASES_FILE: &str = "aliases.json";
const HISTORY_FILE: &str = "history.jsonl";

struct HistoryLog {
    file: File,
    window: HistoryWindow,
    next_id: u64,
}

// aliases.json is replaced atomically on every mutation; history.jsonl gets
// one synced line per entry. Each half has its own lock.
pub struct FileStore {
    dir: PathBuf,
    catalog: Mutex<Catalog>,
    history: Mutex<HistoryLog>,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with_capacity(dir, DEFAULT_HISTORY_CAPACITY)
    }

    // Keeps at most `capacity` history entries in memory.
    pub fn open_with_capacity(dir: impl Into<PathBuf>, capacity: usize) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let catalog = load_catalog(&dir.join(ALIASES_FILE))?;
        let history = open_history(&dir.join(HISTORY_FILE), capacity)?;
        info!(
            dir = %dir.display(),
            panels = catalog.panel_ids().len(),
            history = history.window.len(),
            next_id = history.next_id,
            "opened store"
        );

        Ok(Self {
            dir,
            catalog: Mutex::new(catalog),
            history: Mutex::new(history),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn catalog(&self) -> Result<MutexGuard<'_, Catalog>, StoreError> {
        self.catalog.lock().map_err(|_| StoreError::Poisoned)
    }

    // The live catalog is only replaced once the changed copy is on disk.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Catalog) -> Result<(T, bool), StoreError>,
    ) -> Result<T, StoreError> {
        let mut live = self.catalog()?;
        let mut next = live.clone();
        let (value, changed) = change(&mut next)?;
        if changed {
            self.write_catalog(&next)?;
            *live = next;
        }
        Ok(value)
    }

    fn write_catalog(&self, catalog: &Catalog) -> Result<(), StoreError> {
        let path = self.dir.join(ALIASES_FILE);
        let tmp = self.dir.join(format!("{}.tmp", ALIASES_FILE));
        let bytes = serde_json::to_vec_pretty(catalog).map_err(|e| StoreError::Corrupt {
            path: path.clone(),
            source: e,
        })?;

        let mut file = File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
        file.write_all(&bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::io(&path, e))?;
        sync_dir(&self.dir)?;

        debug!(path = %path.display(), "catalog written");
        Ok(())
    }

    fn history(&self) -> Result<MutexGuard<'_, HistoryLog>, StoreError> {
        self.history.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl AliasStore for FileStore {
    fn panels(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.catalog()?.panel_ids())
    }

    fn has_panel(&self, panel: &str) -> Result<bool, StoreError> {
        Ok(self.catalog()?.has_panel(panel))
    }

    fn ensure_panel(&self, panel: &str) -> Result<bool, StoreError> {
        self.mutate(|c| {
            let created = c.ensure_panel(panel);
            Ok((created, created))
        })
    }

    fn import_panel(&self, panel: &str, aliases: &[Alias]) -> Result<bool, StoreError> {
        self.mutate(|c| {
            let created = c.import_panel(panel, aliases);
            Ok((created, created))
        })
    }

    fn remove_panel(&self, panel: &str) -> Result<(), StoreError> {
        self.mutate(|c| c.remove_panel(panel).map(|()| ((), true)))
    }

    fn get_alias(&self, panel: &str, token: &str) -> Result<Option<Alias>, StoreError> {
        Ok(self.catalog()?.get_alias(panel, token))
    }

    fn set_alias(&self, panel: &str, alias: Alias) -> Result<(), StoreError> {
        self.mutate(|c| {
            c.set_alias(panel, alias);
            Ok(((), true))
        })
    }

    fn delete_alias(&self, panel: &str, token: &str) -> Result<Alias, StoreError> {
        self.mutate(|c| c.delete_alias(panel, token).map(|alias| (alias, true)))
    }

    fn list_aliases(&self, panel: &str) -> Result<Vec<Alias>, StoreError> {
        self.catalog()?.list_aliases(panel)
    }
}

impl HistoryStore for FileStore {
    fn append(&self, entry: NewHistoryEntry) -> Result<HistoryEntry, StoreError> {
        let path = self.dir.join(HISTORY_FILE);
        let mut log = self.history()?;
        let entry = entry.with_id(log.next_id);

        let mut line = serde_json::to_string(&entry).map_err(|e| StoreError::Corrupt {
            path: path.clone(),
            source: e,
        })?;
        line.push('\n');

        let before = log.file.metadata().map(|m| m.len());
        let written = log
            .file
            .write_all(line.as_bytes())
            .and_then(|_| log.file.sync_data());
        if let Err(e) = written {
            // Cut a partial line so the next append starts on a fresh one.
            if let Ok(len) = before {
                if let Err(trunc) = log.file.set_len(len) {
                    warn!(error = %trunc, "could not roll back partial history line");
                }
            }
            return Err(StoreError::io(&path, e));
        }

        log.next_id += 1;
        log.window.push(entry.clone());
        Ok(entry)
    }

    fn search(&self, panel: Option<&str>, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        let log = self.history()?;
        let found = log.window.newest(panel, limit);
        if found.len() >= limit || log.window.is_complete() {
            return Ok(found);
        }
        debug!(?panel, limit, "history window exhausted, reading log");
        scan_history(&self.dir.join(HISTORY_FILE), limit, |e| {
            panel.map_or(true, |p| e.panel == p)
        })
    }

    fn get(&self, id: u64) -> Result<Option<HistoryEntry>, StoreError> {
        let log = self.history()?;
        if let Some(entry) = log.window.get(id) {
            return Ok(Some(entry));
        }
        if log.window.is_complete() {
            return Ok(None);
        }
        let mut found = scan_history(&self.dir.join(HISTORY_FILE), 1, |e| e.id == id)?;
        Ok(found.pop())
    }
}

fn load_catalog(path: &Path) -> Result<Catalog, StoreError> {
    if !path.exists() {
        return Ok(Catalog::default());
    }
    let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        source: e,
    })
}

fn open_history(path: &Path, capacity: usize) -> Result<HistoryLog, StoreError> {
    let mut window = HistoryWindow::new(capacity);
    let mut max_id = 0;
    let mut torn_at = None;

    if path.exists() {
        let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
        let mut reader = BufReader::new(file);
        let mut offset = 0u64;
        let mut number = 0usize;
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(|e| StoreError::io(path, e))?;
            if read == 0 {
                break;
            }
            if line.last() != Some(&b'\n') {
                torn_at = Some(offset);
                break;
            }
            offset += read as u64;
            number += 1;
            if let Some(entry) = parse_line(&line, number) {
                max_id = max_id.max(entry.id);
                window.push(entry);
            }
        }
    }

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;

    if let Some(len) = torn_at {
        warn!(path = %path.display(), offset = len, "dropping unterminated history line");
        file.set_len(len)
            .and_then(|_| file.sync_data())
            .map_err(|e| StoreError::io(path, e))?;
    }

    Ok(HistoryLog {
        file,
        window,
        next_id: max_id + 1,
    })
}

fn parse_line(line: &[u8], number: usize) -> Option<HistoryEntry> {
    let text = String::from_utf8_lossy(line);
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<HistoryEntry>(&text) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!(line = number, error = %e, "skipping malformed history line");
            None
        }
    }
}

// Newest `limit` entries on disk accepted by `keep`, newest first.
fn scan_history(
    path: &Path,
    limit: usize,
    keep: impl Fn(&HistoryEntry) -> bool,
) -> Result<Vec<HistoryEntry>, StoreError> {
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    let mut newest = VecDeque::with_capacity(limit.min(DEFAULT_HISTORY_CAPACITY));
    for (number, line) in BufReader::new(file).split(b'\n').enumerate() {
        let line = line.map_err(|e| StoreError::io(path, e))?;
        let Some(entry) = parse_line(&line, number + 1) else {
            continue;
        };
        if keep(&entry) {
            if newest.len() == limit {
                newest.pop_front();
            }
            if limit > 0 {
                newest.push_back(entry);
            }
        }
    }
    Ok(newest.into_iter().rev().collect())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), StoreError> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| StoreError::io(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), StoreError> {
    Ok(())
}
