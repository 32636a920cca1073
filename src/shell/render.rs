use std::fmt::Write;

use chrono::Local;

use super::engine::{Execution, Feedback, Outcome, PanelSummary};
use crate::core::PanelOrigin;
use crate::highlight::SyntaxHighlighter;
use crate::input::history::{truncate_chars, HistoryEntry, HistoryScope};
use crate::store::Alias;

pub struct Renderer {
    highlighter: SyntaxHighlighter,
    output_limit: usize,
}

impl Renderer {
    pub fn new(highlighter: SyntaxHighlighter, output_limit: usize) -> Self {
        Self {
            highlighter,
            output_limit,
        }
    }

    pub fn render(&self, outcome: &Outcome) -> String {
        match outcome {
            Outcome::Idle => String::new(),
            Outcome::Ran(execution) => self.execution(execution),
            Outcome::Feedback(feedback) => self.feedback(feedback),
            Outcome::Farewell => self.highlighter.highlight_hint("bye"),
            Outcome::Failed(e) => self.highlighter.highlight_error(&format!("panelsh: {}", e)),
        }
    }

    fn execution(&self, execution: &Execution) -> String {
        let mut out = String::new();
        let result = &execution.result;

        self.push_stream(&mut out, &result.stdout, false);
        self.push_stream(&mut out, &result.stderr, true);

        let millis = result.duration.as_millis();
        let status = if result.timed_out {
            self.highlighter
                .highlight_error(&format!("✗ timed out after {}ms", millis))
        } else if result.exit_code == 0 {
            self.highlighter.highlight_success("✓ exit 0")
        } else {
            self.highlighter
                .highlight_error(&format!("✗ exit {}", result.exit_code))
        };

        let mut detail = format!("{}ms", millis);
        if let Some(token) = &execution.alias {
            let _ = write!(detail, " · {} → {}", token, execution.command);
        }
        let _ = write!(out, "[{} · {}]", status, self.highlighter.highlight_hint(&detail));

        if let Err(e) = &execution.recorded {
            out.push('\n');
            out.push_str(
                &self
                    .highlighter
                    .highlight_error(&format!("panelsh: not recorded in history: {}", e)),
            );
        }
        out
    }

    fn push_stream(&self, out: &mut String, text: &str, is_err: bool) {
        if text.is_empty() {
            return;
        }
        let (shown, truncated) = truncate_chars(text, self.output_limit);
        if is_err {
            out.push_str(&self.highlighter.highlight_error(shown));
        } else {
            out.push_str(shown);
        }
        if !shown.ends_with('\n') {
            out.push('\n');
        }
        if truncated {
            out.push_str(&self.highlighter.highlight_hint("… output truncated"));
            out.push('\n');
        }
    }

    fn feedback(&self, feedback: &Feedback) -> String {
        let h = &self.highlighter;
        match feedback {
            Feedback::Switched { panel, created } => {
                let verb = if *created { "created panel" } else { "switched to" };
                format!("{} {}", verb, h.highlight_panel(panel))
            }
            Feedback::AliasDefined {
                panel,
                alias,
                replaced,
            } => {
                let verb = if *replaced { "updated" } else { "added" };
                format!(
                    "{} alias in {}: {} → {}",
                    verb,
                    h.highlight_panel(panel),
                    alias.token,
                    alias.template
                )
            }
            Feedback::AliasRemoved { panel, alias } => {
                format!("removed {} from {}", alias.token, h.highlight_panel(panel))
            }
            Feedback::Aliases { panel, aliases } => self.aliases(panel, aliases),
            Feedback::Panels { current, panels } => self.panels(current, panels),
            Feedback::PanelRemoved { panel } => format!("removed panel {}", h.highlight_panel(panel)),
            Feedback::History { scope, entries } => self.history(scope, entries),
            Feedback::HistoryEntry(entry) => self.entry_detail(entry),
            Feedback::Directory { path } => format!("now in {}", path.display()),
            Feedback::Help { entries } => {
                let width = entries.iter().map(|(u, _)| u.chars().count()).max().unwrap_or(0);
                entries
                    .iter()
                    .map(|(usage, what)| {
                        let pad = width - usage.chars().count();
                        format!("  {}{}  {}", usage, " ".repeat(pad), h.highlight_hint(what))
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    }

    fn aliases(&self, panel: &str, aliases: &[Alias]) -> String {
        let h = &self.highlighter;
        if aliases.is_empty() {
            return h.highlight_hint(&format!("no aliases in {}", panel));
        }
        let width = aliases.iter().map(|a| a.token.chars().count()).max().unwrap_or(0);
        let mut lines = vec![format!("aliases in {}:", h.highlight_panel(panel))];
        for alias in aliases {
            let pad = width - alias.token.chars().count();
            let mut line = format!("  {}{}  {}", alias.token, " ".repeat(pad), alias.template);
            if let Some(description) = &alias.description {
                line.push_str("  ");
                line.push_str(&h.highlight_hint(&format!("# {}", description)));
            }
            lines.push(line);
        }
        lines.join("\n")
    }

    fn panels(&self, current: &str, panels: &[PanelSummary]) -> String {
        let h = &self.highlighter;
        panels
            .iter()
            .map(|p| {
                let marker = if p.id == current { "*" } else { " " };
                let origin = match p.origin {
                    PanelOrigin::Default => "default",
                    PanelOrigin::User => "user",
                };
                let count = if p.aliases == 1 {
                    "1 alias".to_string()
                } else {
                    format!("{} aliases", p.aliases)
                };
                format!(
                    "{} {} {}",
                    marker,
                    h.highlight_panel(&p.id),
                    h.highlight_hint(&format!("({}, {})", origin, count))
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn history(&self, scope: &HistoryScope, entries: &[HistoryEntry]) -> String {
        if entries.is_empty() {
            let hint = match scope {
                HistoryScope::Panel(panel) => format!("no history for {}", panel),
                HistoryScope::All => "no history yet".to_string(),
            };
            return self.highlighter.highlight_hint(&hint);
        }
        entries
            .iter()
            .map(|entry| self.format_entry(entry))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn entry_detail(&self, entry: &HistoryEntry) -> String {
        let h = &self.highlighter;
        let time = entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
        let exit = if entry.timed_out {
            h.highlight_error(&format!("{} (timed out)", entry.exit_code))
        } else if entry.exit_code == 0 {
            h.highlight_success("0")
        } else {
            h.highlight_error(&entry.exit_code.to_string())
        };

        let mut out = format!("#{} in {} at {}\n", entry.id, h.highlight_panel(&entry.panel), time);
        let _ = writeln!(out, "  input:    {}", entry.input);
        let _ = writeln!(out, "  command:  {}", entry.resolved_command);
        let _ = writeln!(out, "  exit:     {}", exit);
        let _ = write!(out, "  duration: {}ms", entry.duration_ms);
        if entry.output_excerpt.is_empty() {
            out.push('\n');
            out.push_str(&h.highlight_hint("  (no output)"));
        } else {
            out.push_str("\n  output:\n");
            out.push_str(entry.output_excerpt.trim_end_matches('\n'));
        }
        out
    }

    fn format_entry(&self, entry: &HistoryEntry) -> String {
        let time = entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
        let mark = if entry.exit_code == 0 && !entry.timed_out { "✓" } else { "✗" };
        let mut line = format!(
            "{:>5} {} [{}] {} ({}) {}",
            entry.id, time, entry.panel, mark, entry.exit_code, entry.input
        );
        if entry.resolved_command != entry.input {
            let _ = write!(line, " → {}", entry.resolved_command);
        }
        line.push(' ');
        line.push_str(&self.highlighter.highlight_hint(&format!("[{}ms]", entry.duration_ms)));
        line
    }
}
