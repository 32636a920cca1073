// An alias of the current panel wins over an executable of the same name.
// Templates are prefixes: the rest of the line is appended after one space.

use tracing::debug;

use crate::core::config::{is_identifier, DirectiveTokens};
use crate::core::panels::PanelRegistry;
use crate::error::EngineError;
use crate::input::history::HistoryScope;
use crate::store::AliasStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Exit,
    SwitchPanel(String),
    Back,
    ListPanels,
    RemovePanel(String),
    DefineAlias { token: String, template: String },
    RemoveAlias { token: String },
    ListAliases,
    History { limit: Option<usize>, scope: HistoryScope },
    ShowHistory(u64),
    ChangeDir(Option<String>),
    Rerun,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    // Blank input. Nothing runs and nothing is recorded.
    Noop,
    Directive(Directive),
    Alias { token: String, command: String },
    Passthrough(String),
}

impl Resolution {
    pub fn command(&self) -> Option<&str> {
        match self {
            Resolution::Alias { command, .. } | Resolution::Passthrough(command) => Some(command),
            Resolution::Noop | Resolution::Directive(_) => None,
        }
    }
}

pub struct CommandResolver {
    tokens: DirectiveTokens,
}

impl CommandResolver {
    pub fn new(tokens: DirectiveTokens) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &DirectiveTokens {
        &self.tokens
    }

    pub fn resolve<S: AliasStore + ?Sized>(
        &self,
        line: &str,
        panel: &str,
        registry: &PanelRegistry<S>,
    ) -> Result<Resolution, EngineError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Resolution::Noop);
        }

        if let Some(directive) = self.parse_directive(line, panel)? {
            debug!(?directive, "directive");
            return Ok(Resolution::Directive(directive));
        }

        let (first, rest) = split_first_word(line);
        if let Some(alias) = registry.lookup(panel, first) {
            let command = if rest.is_empty() {
                alias.template.clone()
            } else {
                format!("{} {}", alias.template, rest)
            };
            debug!(panel, token = first, %command, "alias expanded");
            return Ok(Resolution::Alias {
                token: first.to_string(),
                command,
            });
        }

        Ok(Resolution::Passthrough(line.to_string()))
    }

    fn parse_directive(&self, line: &str, panel: &str) -> Result<Option<Directive>, EngineError> {
        // Only the bare sentinel exits; `exit 3` goes to the shell.
        if line == self.tokens.exit {
            return Ok(Some(Directive::Exit));
        }

        let (first, rest) = split_first_word(line);
        let t = &self.tokens;
        let directive = if first == t.panel {
            self.parse_panel(&self.split_args(rest, self.panel_usage())?)?
        } else if first == t.alias {
            self.parse_alias(rest)?
        } else if first == t.history {
            self.parse_history(&self.split_args(rest, self.history_usage())?, panel)?
        } else if first == t.cd {
            let usage = self.cd_usage();
            match self.split_args(rest, usage.clone())?.as_mut_slice() {
                [] => Directive::ChangeDir(None),
                [dir] => Directive::ChangeDir(Some(std::mem::take(dir))),
                _ => return Err(EngineError::syntax("cd takes at most one directory", usage)),
            }
        } else if first == t.back {
            bare(rest, Directive::Back, &t.back)?
        } else if first == t.rerun {
            bare(rest, Directive::Rerun, &t.rerun)?
        } else if first == t.help {
            bare(rest, Directive::Help, &t.help)?
        } else {
            return Ok(None);
        };
        Ok(Some(directive))
    }

    fn parse_panel(&self, args: &[String]) -> Result<Directive, EngineError> {
        let usage = self.panel_usage();
        match args {
            [] => Ok(Directive::ListPanels),
            [sub] if sub == "list" => Ok(Directive::ListPanels),
            [sub, id] if sub == "rm" => Ok(Directive::RemovePanel(checked_word(id, "panel id", &usage)?)),
            [sub, ..] if sub == "rm" => Err(EngineError::syntax("rm takes exactly one panel id", usage)),
            [id] => Ok(Directive::SwitchPanel(checked_word(id, "panel id", &usage)?)),
            _ => Err(EngineError::syntax("too many arguments", usage)),
        }
    }

    fn parse_alias(&self, rest: &str) -> Result<Directive, EngineError> {
        let usage = self.alias_usage();
        let args = self.split_args(rest, usage.clone())?;

        match args.as_slice() {
            [] => Ok(Directive::ListAliases),
            [sub] if sub == "list" => Ok(Directive::ListAliases),
            [sub, token] if sub == "rm" => Ok(Directive::RemoveAlias {
                token: checked_word(token, "alias token", &usage)?,
            }),
            [sub, token, template @ ..] if sub == "add" && !template.is_empty() => {
                let token = checked_word(token, "alias token", &usage)?;
                if self.tokens.is_reserved(&token) {
                    return Err(EngineError::syntax(
                        format!("`{}` is a reserved directive", token),
                        usage,
                    ));
                }
                // A template wrapped in one pair of quotes loses that pair.
                // Anything else is kept exactly as typed.
                let typed = skip_words(rest, 2).trim();
                let template = match template {
                    [single] if is_quoted(typed) => single.trim().to_string(),
                    _ => typed.to_string(),
                };
                if template.is_empty() {
                    return Err(EngineError::syntax("empty command template", usage));
                }
                Ok(Directive::DefineAlias { token, template })
            }
            [sub, ..] if sub == "add" => Err(EngineError::syntax("missing token or command", usage)),
            [sub, ..] if sub == "rm" => Err(EngineError::syntax("rm takes exactly one token", usage)),
            [sub, ..] => Err(EngineError::syntax(format!("unknown subcommand `{}`", sub), usage)),
        }
    }

    fn parse_history(&self, args: &[String], panel: &str) -> Result<Directive, EngineError> {
        let usage = self.history_usage();
        if let Some(sub) = args.first().filter(|a| *a == "show") {
            return match &args[1..] {
                [id] => match id.parse::<u64>() {
                    Ok(id) if id > 0 => Ok(Directive::ShowHistory(id)),
                    _ => Err(EngineError::syntax(format!("`{}` is not a history id", id), usage)),
                },
                _ => Err(EngineError::syntax(format!("{} takes exactly one id", sub), usage)),
            };
        }

        let mut limit = None;
        let mut scope = HistoryScope::All;
        let mut args = args.iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--all" => scope = HistoryScope::All,
                "--here" => scope = HistoryScope::Panel(panel.to_string()),
                "--panel" => {
                    let id = args
                        .next()
                        .ok_or_else(|| EngineError::syntax("--panel needs a panel id", usage.clone()))?;
                    scope = HistoryScope::Panel(checked_word(id, "panel id", &usage)?);
                }
                value if limit.is_none() => match value.parse::<usize>() {
                    Ok(n) if n > 0 => limit = Some(n),
                    _ => {
                        return Err(EngineError::syntax(
                            format!("`{}` is not a positive count", value),
                            usage,
                        ))
                    }
                },
                other => {
                    return Err(EngineError::syntax(format!("unexpected `{}`", other), usage));
                }
            }
        }
        Ok(Directive::History { limit, scope })
    }

    fn split_args(&self, rest: &str, usage: String) -> Result<Vec<String>, EngineError> {
        shell_words::split(rest).map_err(|e| EngineError::syntax(e.to_string(), usage))
    }

    pub fn panel_usage(&self) -> String {
        format!("{} [<id> | list | rm <id>]", self.tokens.panel)
    }

    pub fn alias_usage(&self) -> String {
        format!(
            "{} [list | add <token> <command...> | rm <token>]",
            self.tokens.alias
        )
    }

    pub fn history_usage(&self) -> String {
        format!(
            "{} [<count>] [--all | --here | --panel <id>] | {} show <id>",
            self.tokens.history, self.tokens.history
        )
    }

    pub fn cd_usage(&self) -> String {
        format!("{} [<dir> | - | ~]", self.tokens.cd)
    }
}

fn bare(rest: &str, directive: Directive, token: &str) -> Result<Directive, EngineError> {
    if rest.is_empty() {
        Ok(directive)
    } else {
        Err(EngineError::syntax(format!("{} takes no arguments", token), token))
    }
}

fn is_quoted(text: &str) -> bool {
    text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"')) || (text.starts_with('\'') && text.ends_with('\'')))
}

fn split_first_word(line: &str) -> (&str, &str) {
    match line.find(char::is_whitespace) {
        Some(index) => (&line[..index], line[index..].trim_start()),
        None => (line, ""),
    }
}

fn skip_words(text: &str, count: usize) -> &str {
    let mut rest = text.trim_start();
    for _ in 0..count {
        rest = split_first_word(rest).1;
    }
    rest
}

fn checked_word(value: &str, what: &str, usage: &str) -> Result<String, EngineError> {
    if is_identifier(value) {
        Ok(value.to_string())
    } else {
        Err(EngineError::syntax(
            format!("{} `{}` must be a single word", what, value),
            usage,
        ))
    }
}
