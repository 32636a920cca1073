mod completer;
pub mod history;

pub use completer::PanelCompleter;
pub use history::{HistoryEntry, HistoryRecorder, HistoryScope};
