// REPL session state. Threaded through every iteration by value; never
// persisted, so each start begins at the root panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Running(String),
    Exited,
}

impl SessionState {
    pub fn panel(&self) -> Option<&str> {
        match self {
            SessionState::Running(panel) => Some(panel),
            SessionState::Exited => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running(_))
    }
}
