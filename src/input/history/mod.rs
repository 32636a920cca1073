pub mod types;

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::process::ExecutionResult;
use crate::store::{HistoryStore, StoreError};

pub use self::types::{HistoryEntry, HistoryScope, NewHistoryEntry};

pub struct HistoryRecorder<S: ?Sized> {
    store: Arc<S>,
    excerpt_chars: usize,
}

impl<S: HistoryStore + ?Sized> HistoryRecorder<S> {
    pub fn new(store: Arc<S>, excerpt_chars: usize) -> Self {
        Self {
            store,
            excerpt_chars,
        }
    }

    pub fn record(
        &self,
        panel: &str,
        input: &str,
        resolved_command: &str,
        result: &ExecutionResult,
    ) -> Result<HistoryEntry, StoreError> {
        let entry = NewHistoryEntry {
            timestamp: Utc::now(),
            panel: panel.to_string(),
            input: input.to_string(),
            resolved_command: resolved_command.to_string(),
            exit_code: result.exit_code,
            timed_out: result.timed_out,
            duration_ms: u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
            output_excerpt: excerpt(&result.stdout, &result.stderr, self.excerpt_chars),
        };
        let entry = self.store.append(entry)?;
        debug!(id = entry.id, panel, exit_code = entry.exit_code, "history recorded");
        Ok(entry)
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        self.store.recent(limit)
    }

    pub fn search(&self, scope: &HistoryScope, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        let panel = match scope {
            HistoryScope::Panel(panel) => Some(panel.as_str()),
            HistoryScope::All => None,
        };
        self.store.search(panel, limit)
    }

    pub fn get(&self, id: u64) -> Result<Option<HistoryEntry>, StoreError> {
        self.store.get(id)
    }
}

fn excerpt(stdout: &str, stderr: &str, limit: usize) -> String {
    let mut text = String::with_capacity(stdout.len() + stderr.len() + 1);
    text.push_str(stdout);
    if !stderr.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(stderr);
    }
    truncate_chars(&text, limit).0.to_string()
}

// The flag reports whether anything was cut.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> (&str, bool) {
    match text.char_indices().nth(limit) {
        Some((index, _)) => (&text[..index], true),
        None => (text, false),
    }
}
