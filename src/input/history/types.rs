use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// One executed command, as persisted in `history.jsonl`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub panel: String,
    pub input: String,
    pub resolved_command: String,
    pub exit_code: i32,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub output_excerpt: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub panel: String,
    pub input: String,
    pub resolved_command: String,
    pub exit_code: i32,
    pub timed_out: bool,
    pub duration_ms: u64,
    pub output_excerpt: String,
}

impl NewHistoryEntry {
    pub fn with_id(self, id: u64) -> HistoryEntry {
        HistoryEntry {
            id,
            timestamp: self.timestamp,
            panel: self.panel,
            input: self.input,
            resolved_command: self.resolved_command,
            exit_code: self.exit_code,
            timed_out: self.timed_out,
            duration_ms: self.duration_ms,
            output_excerpt: self.output_excerpt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryScope {
    Panel(String),
    All,
}
