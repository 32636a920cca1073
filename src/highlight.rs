use inksac::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordKind {
    Directive,
    Alias,
    Command,
}

#[derive(Debug, Clone, Copy)]
pub struct SyntaxHighlighter {
    color_support: ColorSupport,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxHighlighter {
    pub fn new() -> Self {
        let support = check_color_support().unwrap_or(ColorSupport::NoColor);
        Self {
            color_support: support,
        }
    }

    pub fn plain() -> Self {
        Self {
            color_support: ColorSupport::NoColor,
        }
    }

    fn enabled(&self) -> bool {
        !matches!(self.color_support, ColorSupport::NoColor)
    }

    pub fn highlight_command(&self, input: &str, kind: WordKind) -> String {
        if !self.enabled() {
            return input.to_string();
        }

        let mut parts: Vec<String> = input.split(' ').map(String::from).collect();
        let Some(first) = parts.iter().position(|p| !p.is_empty()) else {
            return input.to_string();
        };

        let command_style = match kind {
            WordKind::Directive => Style::builder().foreground(Color::Yellow).bold().build(),
            WordKind::Alias => Style::builder().foreground(Color::Green).bold().build(),
            WordKind::Command => Style::builder().foreground(Color::Cyan).build(),
        };
        parts[first] = parts[first].clone().style(command_style).to_string();

        for part in parts.iter_mut().skip(first + 1) {
            if part.starts_with('-') {
                let flag_style = Style::builder().foreground(Color::Yellow).build();
                *part = part.clone().style(flag_style).to_string();
            }
        }

        parts.join(" ")
    }

    pub fn highlight_error(&self, error: &str) -> String {
        if !self.enabled() {
            return error.to_string();
        }

        let error_style = Style::builder().foreground(Color::Red).bold().build();
        error.style(error_style).to_string()
    }

    pub fn highlight_success(&self, message: &str) -> String {
        if !self.enabled() {
            return message.to_string();
        }

        let success_style = Style::builder().foreground(Color::Green).build();
        message.style(success_style).to_string()
    }

    pub fn highlight_panel(&self, panel: &str) -> String {
        if !self.enabled() {
            return panel.to_string();
        }

        let panel_style = Style::builder().foreground(Color::Cyan).bold().build();
        panel.style(panel_style).to_string()
    }

    pub fn highlight_hint(&self, hint: &str) -> String {
        if !self.enabled() {
            return hint.to_string();
        }

        let hint_style = Style::builder()
            .foreground(Color::RGB(128, 128, 128))
            .build();

        hint.style(hint_style).to_string()
    }
}
