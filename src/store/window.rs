use std::collections::VecDeque;

use crate::input::history::HistoryEntry;

pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

// The newest history entries, oldest first. Once something was dropped the
// window no longer answers for the whole log.
#[derive(Debug)]
pub(crate) struct HistoryWindow {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    evicted: bool,
}

impl HistoryWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity,
            evicted: false,
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.evicted = true;
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_complete(&self) -> bool {
        !self.evicted
    }

    pub fn newest(&self, panel: Option<&str>, limit: usize) -> Vec<HistoryEntry> {
        self.entries
            .iter()
            .rev()
            .filter(|e| panel.map_or(true, |p| e.panel == p))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: u64) -> Option<HistoryEntry> {
        self.entries.iter().find(|e| e.id == id).cloned()
    }
}
