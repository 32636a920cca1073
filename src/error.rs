use std::path::PathBuf;

use crate::core::config::ConfigError;
use crate::process::ExecutionError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Flag error: {0}")]
    Flag(String),
    #[error("Signal error: {0}")]
    Signal(String),
}

impl From<ctrlc::Error> for ShellError {
    fn from(err: ctrlc::Error) -> Self {
        ShellError::Signal(err.to_string())
    }
}

// None of these end the session.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("syntax error: {message} (expected: {expected})")]
    DirectiveSyntax {
        message: String,
        expected: String,
    },
    #[error("alias not found: {token} (panel {panel})")]
    AliasNotFound { panel: String, token: String },
    #[error("panel not found: {0}")]
    PanelNotFound(String),
    #[error("panel {panel} cannot be removed: {reason}")]
    PanelProtected { panel: String, reason: &'static str },
    #[error("history entry not found: {0}")]
    HistoryNotFound(u64),
    #[error("no previous {0}")]
    NoPrevious(&'static str),
    #[error("no alias has run in panel {0}")]
    NothingToRerun(String),
    #[error("cannot change directory to {}: {source}", path.display())]
    ChangeDir { path: PathBuf, source: std::io::Error },
    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionError),
    #[error("store error: {0}")]
    Store(StoreError),
}

impl EngineError {
    pub(crate) fn syntax(message: impl Into<String>, expected: impl Into<String>) -> Self {
        EngineError::DirectiveSyntax {
            message: message.into(),
            expected: expected.into(),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AliasNotFound { panel, token } => EngineError::AliasNotFound { panel, token },
            StoreError::PanelNotFound(panel) => EngineError::PanelNotFound(panel),
            other => EngineError::Store(other),
        }
    }
}
