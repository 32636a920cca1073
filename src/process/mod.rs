use std::path::PathBuf;
use std::time::Duration;

pub mod executor;
pub mod signal;

pub use executor::SystemShell;

// Exit code reported when a command is killed for exceeding its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOptions {
    pub cwd: PathBuf,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub timed_out: bool,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

// The interpreter itself could not be run. A command that merely fails or
// is missing still yields an `ExecutionResult`.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait on {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub trait ShellExecutor {
    fn execute(&self, command: &str, options: &ExecOptions) -> Result<ExecutionResult, ExecutionError>;
}
