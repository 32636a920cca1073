use std::{
    borrow::Cow,
    collections::BTreeSet,
    env, fs,
    path::{Path, PathBuf},
};

use rustyline::{
    completion::{Completer, Pair},
    highlight::{CmdKind, Highlighter},
    hint::Hinter,
    validate::Validator,
    Context, Helper,
};

use crate::core::config::DirectiveTokens;
use crate::highlight::{SyntaxHighlighter, WordKind};

#[derive(Clone)]
pub struct PanelCompleter {
    tokens: DirectiveTokens,
    aliases: BTreeSet<String>,
    panels: Vec<String>,
    commands: BTreeSet<String>,
    highlighter: SyntaxHighlighter,
}

impl PanelCompleter {
    pub fn new(tokens: DirectiveTokens, highlighter: SyntaxHighlighter) -> Self {
        Self {
            tokens,
            aliases: BTreeSet::new(),
            panels: Vec::new(),
            commands: BTreeSet::new(),
            highlighter,
        }
    }

    pub fn refresh_commands(&mut self) {
        self.commands.clear();
        if let Some(path_var) = env::var_os("PATH") {
            for dir in env::split_paths(&path_var) {
                let Ok(entries) = fs::read_dir(dir) else {
                    continue;
                };
                for entry in entries.filter_map(Result::ok) {
                    let is_file = entry
                        .file_type()
                        .map(|t| t.is_file() || t.is_symlink())
                        .unwrap_or(false);
                    if let (true, Some(name)) = (is_file, entry.file_name().to_str()) {
                        self.commands.insert(name.to_string());
                    }
                }
            }
        }
    }

    pub fn update_panel<'a>(
        &mut self,
        aliases: impl IntoIterator<Item = &'a str>,
        panels: impl IntoIterator<Item = &'a str>,
    ) {
        self.aliases = aliases.into_iter().map(String::from).collect();
        self.panels = panels.into_iter().map(String::from).collect();
    }

    // The exit token only counts when it is the whole line, like the resolver.
    fn classify(&self, line: &str) -> WordKind {
        let line = line.trim();
        let word = line.split_whitespace().next().unwrap_or_default();
        if word == self.tokens.exit {
            if line == self.tokens.exit {
                WordKind::Directive
            } else if self.aliases.contains(word) {
                WordKind::Alias
            } else {
                WordKind::Command
            }
        } else if self.tokens.is_reserved(word) {
            WordKind::Directive
        } else if self.aliases.contains(word) {
            WordKind::Alias
        } else {
            WordKind::Command
        }
    }

    fn complete_first_word(&self, prefix: &str) -> Vec<Pair> {
        let mut matches = Vec::new();
        for token in self.tokens.all() {
            if token.starts_with(prefix) {
                matches.push(pair(token.to_string(), format!("{} ", token)));
            }
        }
        for alias in self.aliases.iter().filter(|a| a.starts_with(prefix)) {
            matches.push(pair(format!("{} (alias)", alias), format!("{} ", alias)));
        }
        if !prefix.is_empty() {
            for cmd in self.commands.iter().filter(|c| c.starts_with(prefix)) {
                if !self.aliases.contains(cmd) {
                    matches.push(pair(cmd.clone(), format!("{} ", cmd)));
                }
            }
        }
        matches
    }

    fn complete_argument(&self, words: &[&str], prefix: &str) -> Vec<Pair> {
        let candidates: Vec<&str> = match words {
            [first] if *first == self.tokens.panel => {
                let mut all: Vec<&str> = vec!["list", "rm"];
                all.extend(self.panels.iter().map(String::as_str));
                all
            }
            [first, "rm"] if *first == self.tokens.panel => self.panels.iter().map(String::as_str).collect(),
            [first] if *first == self.tokens.alias => vec!["add", "list", "rm"],
            [first, "rm"] if *first == self.tokens.alias => self.aliases.iter().map(String::as_str).collect(),
            [first] if *first == self.tokens.history => vec!["--all", "--here", "--panel", "show"],
            [first, "--panel"] if *first == self.tokens.history => self.panels.iter().map(String::as_str).collect(),
            [first, ..] if *first == self.tokens.history => vec!["--all", "--here", "--panel"],
            _ => return complete_path(prefix),
        };

        candidates
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .map(|c| pair(c.to_string(), format!("{} ", c)))
            .collect()
    }
}

impl Helper for PanelCompleter {}

impl Highlighter for PanelCompleter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.trim().is_empty() {
            Cow::Borrowed(line)
        } else {
            Cow::Owned(self.highlighter.highlight_command(line, self.classify(line)))
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(self.highlighter.highlight_hint(hint))
    }
}

impl Hinter for PanelCompleter {
    type Hint = String;
}

impl Validator for PanelCompleter {}

impl Completer for PanelCompleter {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let before = &line[..pos];
        let start = before
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map_or(0, |(i, c)| i + c.len_utf8());
        let prefix = &before[start..];
        let words: Vec<&str> = before[..start].split_whitespace().collect();

        let matches = if words.is_empty() {
            self.complete_first_word(prefix)
        } else {
            self.complete_argument(&words, prefix)
        };
        Ok((start, matches))
    }
}

fn pair(display: String, replacement: String) -> Pair {
    Pair {
        display,
        replacement,
    }
}

fn complete_path(incomplete: &str) -> Vec<Pair> {
    let (dir, file_prefix) = match incomplete.rfind('/') {
        Some(i) => (&incomplete[..=i], &incomplete[i + 1..]),
        None => ("", incomplete),
    };
    let search: PathBuf = if dir.is_empty() {
        PathBuf::from(".")
    } else {
        expand_home(dir)
    };

    let Ok(entries) = fs::read_dir(&search) else {
        return Vec::new();
    };

    let mut matches: Vec<Pair> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            if !name.starts_with(file_prefix) || (name.starts_with('.') && !file_prefix.starts_with('.')) {
                return None;
            }
            let full = format!("{}{}", dir, name);
            Some(if entry.path().is_dir() {
                pair(format!("{}/", full), format!("{}/", full))
            } else {
                pair(full.clone(), format!("{} ", full))
            })
        })
        .collect();
    matches.sort_by(|a, b| a.display.cmp(&b.display));
    matches
}

fn expand_home(dir: &str) -> PathBuf {
    match (dir.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => Path::new(dir).to_path_buf(),
    }
}
