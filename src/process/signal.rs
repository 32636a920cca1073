use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::{SIGHUP, SIGTERM};
use signal_hook::flag;

use crate::error::ShellError;

// Set when the process was asked to terminate. The first signal only raises
// the flag so the loop can close the store; a second one exits immediately.
#[derive(Clone, Default)]
pub struct TerminationFlag(Arc<AtomicBool>);

impl TerminationFlag {
    pub fn install() -> Result<Self, ShellError> {
        let term = Self::default();
        for signal in [SIGTERM, SIGHUP] {
            flag::register_conditional_shutdown(signal, 1, Arc::clone(&term.0))
                .and_then(|_| flag::register(signal, Arc::clone(&term.0)))
                .map_err(|e| ShellError::Signal(e.to_string()))?;
        }
        Ok(term)
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

// Keeps Ctrl-C from killing the shell while a child runs; the child still
// receives it through the terminal.
pub fn ignore_interrupts() -> Result<(), ShellError> {
    ctrlc::set_handler(|| {})?;
    Ok(())
}
