use std::path::{Path, PathBuf};

use rustyline::{config::Configurer, error::ReadlineError, history::FileHistory, Editor};
use tracing::{debug, info, warn};

mod engine;
mod render;

pub use engine::{Engine, Execution, Feedback, Outcome, PanelSummary};
pub use render::Renderer;

use crate::{
    core::SessionState,
    error::ShellError,
    highlight::SyntaxHighlighter,
    input::PanelCompleter,
    process::{signal::TerminationFlag, ShellExecutor},
};

#[derive(Debug, Clone, Default)]
pub struct ShellOptions {
    // Line-editor history; `None` keeps it in memory.
    pub history_file: Option<PathBuf>,
    pub quiet: bool,
    pub output_limit: usize,
}

pub struct Shell<E> {
    editor: Editor<PanelCompleter, FileHistory>,
    engine: Engine<E>,
    renderer: Renderer,
    state: SessionState,
    term: TerminationFlag,
    options: ShellOptions,
}

impl<E: ShellExecutor> Shell<E> {
    pub fn new(engine: Engine<E>, term: TerminationFlag, options: ShellOptions) -> Result<Self, ShellError> {
        let highlighter = SyntaxHighlighter::new();
        let mut completer = PanelCompleter::new(engine.resolver().tokens().clone(), highlighter);
        completer.refresh_commands();

        let mut editor = Editor::<PanelCompleter, FileHistory>::new()?;
        editor.set_helper(Some(completer));
        editor.set_auto_add_history(true);

        if let Some(path) = &options.history_file {
            if let Err(e) = editor.load_history(path) {
                debug!(error = %e, path = %path.display(), "no line history loaded");
            }
        }

        let state = engine.initial_state();
        Ok(Shell {
            editor,
            renderer: Renderer::new(highlighter, options.output_limit),
            engine,
            state,
            term,
            options,
        })
    }

    pub fn run(&mut self) -> Result<(), ShellError> {
        if !self.options.quiet {
            println!(
                "panelsh {}: type `{}` for directives",
                env!("CARGO_PKG_VERSION"),
                self.engine.resolver().tokens().help
            );
        }

        while self.state.is_running() {
            if self.term.is_raised() {
                info!("termination requested");
                break;
            }
            self.sync_completer();

            match self.editor.readline(&self.prompt()) {
                Ok(line) => self.handle_line(&line),
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    self.state = SessionState::Exited;
                    println!("{}", self.renderer.render(&Outcome::Farewell));
                }
                Err(e) => {
                    if self.term.is_raised() {
                        break;
                    }
                    return Err(e.into());
                }
            }
        }

        self.save_history();
        Ok(())
    }

    fn handle_line(&mut self, line: &str) {
        let state = std::mem::replace(&mut self.state, SessionState::Exited);
        let (next, outcome) = self.engine.step(state, line);
        self.state = next;

        let text = self.renderer.render(&outcome);
        if text.is_empty() {
            return;
        }
        match outcome {
            Outcome::Failed(_) => eprintln!("{}", text),
            _ => println!("{}", text),
        }
    }

    fn prompt(&self) -> String {
        format!(
            "[{}] {} > ",
            self.state.panel().unwrap_or("-"),
            display_dir(&self.engine.options().cwd)
        )
    }

    fn sync_completer(&mut self) {
        let Some(panel) = self.state.panel() else {
            return;
        };
        let registry = self.engine.registry();
        let aliases: Vec<&str> = registry
            .resolve_panel(panel)
            .map(|p| p.aliases().map(|a| a.token.as_str()).collect())
            .unwrap_or_default();
        let panels = registry.list_panels().iter().map(|p| p.id.as_str());

        if let Some(helper) = self.editor.helper_mut() {
            helper.update_panel(aliases, panels);
        }
    }

    fn save_history(&mut self) {
        let Some(path) = &self.options.history_file else {
            return;
        };
        if let Err(e) = self.editor.save_history(path) {
            if !self.options.quiet {
                warn!(error = %e, path = %path.display(), "could not save line history");
            }
        }
    }
}

fn display_dir(cwd: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = cwd.strip_prefix(&home) {
            return if rest.as_os_str().is_empty() {
                "~".to_string()
            } else {
                format!("~/{}", rest.display())
            };
        }
    }
    cwd.display().to_string()
}
