use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use wait_timeout::ChildExt;

use super::{ExecOptions, ExecutionError, ExecutionResult, ShellExecutor, TIMEOUT_EXIT_CODE};
use crate::core::config::ShellConfig;

// How long to keep reading once the shell has exited. Background jobs may
// hold the pipes open long after that.
const OUTPUT_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct SystemShell {
    program: String,
    args: Vec<String>,
}

impl Default for SystemShell {
    fn default() -> Self {
        Self::from_config(&ShellConfig::default())
    }
}

impl SystemShell {
    pub fn from_config(config: &ShellConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    fn spawn(&self, command: &str, options: &ExecOptions) -> Result<Child, ExecutionError> {
        Command::new(&self.program)
            .args(&self.args)
            .arg(command)
            .current_dir(&options.cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecutionError::Spawn {
                program: self.program.clone(),
                source,
            })
    }

    fn wait_error(&self, source: std::io::Error) -> ExecutionError {
        ExecutionError::Wait {
            program: self.program.clone(),
            source,
        }
    }
}

impl ShellExecutor for SystemShell {
    fn execute(&self, command: &str, options: &ExecOptions) -> Result<ExecutionResult, ExecutionError> {
        let start = Instant::now();
        let mut child = self.spawn(command, options)?;
        debug!(pid = child.id(), command, "spawned");

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let (status, timed_out) = match options.timeout {
            Some(limit) => match child.wait_timeout(limit).map_err(|e| self.wait_error(e))? {
                Some(status) => (status, false),
                None => {
                    warn!(command, timeout_ms = limit.as_millis() as u64, "command timed out");
                    if let Err(e) = child.kill() {
                        warn!(error = %e, "failed to kill timed out command");
                    }
                    (child.wait().map_err(|e| self.wait_error(e))?, true)
                }
            },
            None => (child.wait().map_err(|e| self.wait_error(e))?, false),
        };

        let exit_code = if timed_out {
            TIMEOUT_EXIT_CODE
        } else {
            exit_code(status)
        };

        let deadline = Instant::now() + OUTPUT_GRACE;
        Ok(ExecutionResult {
            exit_code,
            stdout: collect(stdout, deadline),
            stderr: collect(stderr, deadline),
            duration: start.elapsed(),
            timed_out,
        })
    }
}

// Forwards the pipe chunk by chunk so output written before a background job
// took over the pipe is not lost.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<Vec<u8>>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(chunk[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
        });
        rx
    })
}

// Called once the shell is gone. Stops at end of stream or at `deadline`,
// whichever comes first.
fn collect(output: Option<Receiver<Vec<u8>>>, deadline: Instant) -> String {
    let Some(rx) = output else {
        return String::new();
    };
    let mut bytes = Vec::new();
    loop {
        let wait = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(wait) {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Timeout) => {
                debug!("output still open after the command exited");
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
