use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::config::Config;
use crate::core::{CommandResolver, Directive, PanelOrigin, PanelRegistry, Resolution, SessionState};
use crate::error::EngineError;
use crate::input::history::{HistoryEntry, HistoryRecorder, HistoryScope};
use crate::process::{ExecOptions, ExecutionResult, ShellExecutor};
use crate::store::{Alias, Store, StoreError};

#[derive(Debug)]
pub struct Execution {
    pub input: String,
    pub command: String,
    pub alias: Option<String>,
    pub result: ExecutionResult,
    // The command ran even when recording it failed.
    pub recorded: Result<HistoryEntry, StoreError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSummary {
    pub id: String,
    pub origin: PanelOrigin,
    pub aliases: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Switched { panel: String, created: bool },
    AliasDefined { panel: String, alias: Alias, replaced: bool },
    AliasRemoved { panel: String, alias: Alias },
    Aliases { panel: String, aliases: Vec<Alias> },
    Panels { current: String, panels: Vec<PanelSummary> },
    PanelRemoved { panel: String },
    History { scope: HistoryScope, entries: Vec<HistoryEntry> },
    HistoryEntry(HistoryEntry),
    Directory { path: PathBuf },
    Help { entries: Vec<(String, &'static str)> },
}

#[derive(Debug)]
pub enum Outcome {
    Idle,
    Ran(Execution),
    Feedback(Feedback),
    Farewell,
    Failed(EngineError),
}

// `step` maps the current state and one line to the next state. The panel id
// travels in the state; the rest below is navigation memory for cd, back and
// rerun.
pub struct Engine<E> {
    registry: PanelRegistry<dyn Store>,
    recorder: HistoryRecorder<dyn Store>,
    resolver: CommandResolver,
    executor: E,
    options: ExecOptions,
    root_panel: String,
    recent_default: usize,
    previous_dir: Option<PathBuf>,
    panel_stack: Vec<String>,
    last_alias: HashMap<String, String>,
}

impl<E: ShellExecutor> Engine<E> {
    pub fn new(
        config: &Config,
        store: Arc<dyn Store>,
        executor: E,
        cwd: PathBuf,
    ) -> Result<Self, StoreError> {
        let registry = PanelRegistry::load(Arc::clone(&store), config)?;
        let recorder = HistoryRecorder::new(store, config.history.excerpt_chars);

        Ok(Self {
            registry,
            recorder,
            resolver: CommandResolver::new(config.directives.clone()),
            executor,
            options: ExecOptions {
                cwd,
                timeout: config.execution_timeout(),
            },
            root_panel: config.root_panel_id.clone(),
            recent_default: config.history.recent_default,
            previous_dir: None,
            panel_stack: Vec::new(),
            last_alias: HashMap::new(),
        })
    }

    pub fn initial_state(&self) -> SessionState {
        SessionState::Running(self.root_panel.clone())
    }

    pub fn registry(&self) -> &PanelRegistry<dyn Store> {
        &self.registry
    }

    pub fn resolver(&self) -> &CommandResolver {
        &self.resolver
    }

    pub fn options(&self) -> &ExecOptions {
        &self.options
    }

    pub fn step(&mut self, state: SessionState, line: &str) -> (SessionState, Outcome) {
        let panel = match state {
            SessionState::Running(panel) => panel,
            SessionState::Exited => return (SessionState::Exited, Outcome::Idle),
        };

        let resolution = match self.resolver.resolve(line, &panel, &self.registry) {
            Ok(resolution) => resolution,
            Err(e) => {
                debug!(error = %e, "rejected input");
                return (SessionState::Running(panel), Outcome::Failed(e));
            }
        };

        match resolution {
            Resolution::Noop => (SessionState::Running(panel), Outcome::Idle),
            Resolution::Directive(directive) => self.apply(panel, directive),
            Resolution::Alias { token, command } => {
                self.last_alias.insert(panel.clone(), line.trim().to_string());
                let outcome = self.run(&panel, line, command, Some(token));
                (SessionState::Running(panel), outcome)
            }
            Resolution::Passthrough(command) => {
                let outcome = self.run(&panel, line, command, None);
                (SessionState::Running(panel), outcome)
            }
        }
    }

    fn run(&mut self, panel: &str, line: &str, command: String, alias: Option<String>) -> Outcome {
        let result = match self.executor.execute(&command, &self.options) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, %command, "execution failed");
                return Outcome::Failed(e.into());
            }
        };

        let input = line.trim().to_string();
        let recorded = self.recorder.record(panel, &input, &command, &result);
        if let Err(e) = &recorded {
            warn!(error = %e, "failed to record history");
        }

        Outcome::Ran(Execution {
            input,
            command,
            alias,
            result,
            recorded,
        })
    }

    fn apply(&mut self, panel: String, directive: Directive) -> (SessionState, Outcome) {
        let result = match directive {
            Directive::Exit => return (SessionState::Exited, Outcome::Farewell),
            Directive::SwitchPanel(target) => match self.switch(&target) {
                Ok(created) => {
                    debug!(from = %panel, to = %target, "panel switched");
                    if target != panel {
                        self.panel_stack.push(panel);
                    }
                    let feedback = Feedback::Switched {
                        panel: target.clone(),
                        created,
                    };
                    return (SessionState::Running(target), Outcome::Feedback(feedback));
                }
                Err(e) => Err(e),
            },
            Directive::Back => match self.back(&panel) {
                Some(target) => {
                    debug!(from = %panel, to = %target, "back to previous panel");
                    let feedback = Feedback::Switched {
                        panel: target.clone(),
                        created: false,
                    };
                    return (SessionState::Running(target), Outcome::Feedback(feedback));
                }
                None => Err(EngineError::NoPrevious("panel")),
            },
            Directive::Rerun => {
                let outcome = self.rerun(&panel);
                return (SessionState::Running(panel), outcome);
            }
            Directive::ChangeDir(target) => self.change_dir(target.as_deref()),
            Directive::ListPanels => Ok(self.panels(&panel)),
            Directive::RemovePanel(target) => self.remove_panel(&panel, target),
            Directive::DefineAlias { token, template } => self.define_alias(&panel, token, template),
            Directive::RemoveAlias { token } => self
                .registry
                .remove_alias(&panel, &token)
                .map(|alias| Feedback::AliasRemoved {
                    panel: panel.clone(),
                    alias,
                })
                .map_err(EngineError::from),
            Directive::ListAliases => self
                .registry
                .list_aliases(&panel)
                .map(|aliases| Feedback::Aliases {
                    panel: panel.clone(),
                    aliases,
                })
                .map_err(EngineError::from),
            Directive::History { limit, scope } => self
                .recorder
                .search(&scope, limit.unwrap_or(self.recent_default))
                .map(|entries| Feedback::History { scope, entries })
                .map_err(EngineError::from),
            Directive::ShowHistory(id) => match self.recorder.get(id) {
                Ok(Some(entry)) => Ok(Feedback::HistoryEntry(entry)),
                Ok(None) => Err(EngineError::HistoryNotFound(id)),
                Err(e) => Err(e.into()),
            },
            Directive::Help => Ok(self.help()),
        };

        let outcome = match result {
            Ok(feedback) => Outcome::Feedback(feedback),
            Err(e) => Outcome::Failed(e),
        };
        (SessionState::Running(panel), outcome)
    }

    fn switch(&mut self, target: &str) -> Result<bool, EngineError> {
        Ok(self.registry.ensure_panel(target)?)
    }

    // Pops until a panel other than the current one comes up. Removed panels
    // were already dropped from the stack.
    fn back(&mut self, current: &str) -> Option<String> {
        while let Some(panel) = self.panel_stack.pop() {
            if panel != current {
                return Some(panel);
            }
        }
        None
    }

    fn rerun(&mut self, panel: &str) -> Outcome {
        let Some(line) = self.last_alias.get(panel).cloned() else {
            return Outcome::Failed(EngineError::NothingToRerun(panel.to_string()));
        };
        match self.resolver.resolve(&line, panel, &self.registry) {
            Ok(Resolution::Alias { token, command }) => {
                debug!(panel, %line, "rerun");
                self.run(panel, &line, command, Some(token))
            }
            Ok(_) => {
                let token = line.split_whitespace().next().unwrap_or_default().to_string();
                self.last_alias.remove(panel);
                Outcome::Failed(EngineError::AliasNotFound {
                    panel: panel.to_string(),
                    token,
                })
            }
            Err(e) => Outcome::Failed(e),
        }
    }

    fn change_dir(&mut self, target: Option<&str>) -> Result<Feedback, EngineError> {
        let path = match target {
            Some("-") => self.previous_dir.clone().ok_or(EngineError::NoPrevious("directory"))?,
            None | Some("~") => home_dir()?,
            Some(dir) => match dir.strip_prefix("~/") {
                Some(rest) => home_dir()?.join(rest),
                None => self.options.cwd.join(dir),
            },
        };

        let resolved = path
            .canonicalize()
            .map_err(|source| EngineError::ChangeDir {
                path: path.clone(),
                source,
            })?;
        if !resolved.is_dir() {
            return Err(EngineError::ChangeDir {
                path,
                source: io::Error::other("not a directory"),
            });
        }

        debug!(from = %self.options.cwd.display(), to = %resolved.display(), "directory changed");
        self.previous_dir = Some(std::mem::replace(&mut self.options.cwd, resolved.clone()));
        Ok(Feedback::Directory { path: resolved })
    }

    fn panels(&self, current: &str) -> Feedback {
        Feedback::Panels {
            current: current.to_string(),
            panels: self
                .registry
                .list_panels()
                .iter()
                .map(|p| PanelSummary {
                    id: p.id.clone(),
                    origin: p.origin,
                    aliases: p.alias_count(),
                })
                .collect(),
        }
    }

    fn remove_panel(&mut self, current: &str, target: String) -> Result<Feedback, EngineError> {
        let reason = if target == self.root_panel {
            Some("it is the root panel")
        } else if target == current {
            Some("it is the current panel")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(EngineError::PanelProtected {
                panel: target,
                reason,
            });
        }

        self.registry.remove_panel(&target)?;
        self.panel_stack.retain(|p| *p != target);
        self.panel_stack.dedup();
        self.last_alias.remove(&target);
        Ok(Feedback::PanelRemoved { panel: target })
    }

    fn define_alias(&mut self, panel: &str, token: String, template: String) -> Result<Feedback, EngineError> {
        let replaced = self.registry.lookup(panel, &token).is_some();
        let alias = Alias::new(token, template);
        self.registry.set_alias(panel, alias.clone())?;
        Ok(Feedback::AliasDefined {
            panel: panel.to_string(),
            alias,
            replaced,
        })
    }

    fn help(&self) -> Feedback {
        let tokens = self.resolver.tokens();
        Feedback::Help {
            entries: vec![
                (self.resolver.panel_usage(), "switch to, list or remove panels"),
                (self.resolver.alias_usage(), "manage aliases of the current panel"),
                (self.resolver.history_usage(), "show executed commands or one of them"),
                (self.resolver.cd_usage(), "change the working directory"),
                (tokens.back.clone(), "return to the previous panel"),
                (tokens.rerun.clone(), "run the last alias of this panel again"),
                (tokens.help.clone(), "show this help"),
                (tokens.exit.clone(), "leave the shell"),
            ],
        }
    }
}

fn home_dir() -> Result<PathBuf, EngineError> {
    dirs::home_dir().ok_or_else(|| EngineError::ChangeDir {
        path: PathBuf::from("~"),
        source: io::Error::new(io::ErrorKind::NotFound, "home directory is unknown"),
    })
}
