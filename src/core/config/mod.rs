use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

mod loader;
mod paths;

pub use loader::{ConfigLoader, ConfigSource, CONFIG_ENV};
pub use paths::ConfigPaths;

use crate::store::Alias;

pub const DEFAULT_CONFIG: &str = include_str!("default_config.yaml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    pub root_panel_id: String,
    pub execution_timeout_ms: Option<u64>,
    pub shell: ShellConfig,
    pub directives: DirectiveTokens,
    pub history: HistoryConfig,
    pub display: DisplayConfig,
    pub default_panels: Vec<PanelSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_panel_id: "os".to_string(),
            execution_timeout_ms: None,
            shell: ShellConfig::default(),
            directives: DirectiveTokens::default(),
            history: HistoryConfig::default(),
            display: DisplayConfig::default(),
            default_panels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ShellConfig {
    #[cfg(not(windows))]
    fn default() -> Self {
        Self {
            program: "/bin/sh".to_string(),
            args: vec!["-c".to_string()],
        }
    }

    #[cfg(windows)]
    fn default() -> Self {
        Self {
            program: "cmd".to_string(),
            args: vec!["/C".to_string()],
        }
    }
}

// Words that start a directive instead of a shell command. Case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectiveTokens {
    pub exit: String,
    pub panel: String,
    pub alias: String,
    pub history: String,
    pub help: String,
    pub cd: String,
    pub back: String,
    pub rerun: String,
}

impl Default for DirectiveTokens {
    fn default() -> Self {
        Self {
            exit: "exit".to_string(),
            panel: "panel".to_string(),
            alias: "alias".to_string(),
            history: "history".to_string(),
            help: "help".to_string(),
            cd: "cd".to_string(),
            back: "back".to_string(),
            rerun: "rerun".to_string(),
        }
    }
}

impl DirectiveTokens {
    pub fn all(&self) -> [&str; 8] {
        [
            self.exit.as_str(),
            self.panel.as_str(),
            self.alias.as_str(),
            self.history.as_str(),
            self.help.as_str(),
            self.cd.as_str(),
            self.back.as_str(),
            self.rerun.as_str(),
        ]
    }

    pub fn is_reserved(&self, word: &str) -> bool {
        self.all().contains(&word)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct HistoryConfig {
    // Characters of combined output kept per entry.
    pub excerpt_chars: usize,
    pub recent_default: usize,
    // Newest entries held in memory; older ones are read back from disk.
    pub memory_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            excerpt_chars: 2000,
            recent_default: 20,
            memory_entries: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct DisplayConfig {
    // Characters of stdout and of stderr rendered after a command.
    pub output_limit_chars: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            output_limit_chars: 8000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PanelSpec {
    pub id: String,
    #[serde(default)]
    pub aliases: Vec<AliasSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AliasSpec {
    pub token: String,
    pub template: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<&AliasSpec> for Alias {
    fn from(spec: &AliasSpec) -> Self {
        Alias {
            token: spec.token.clone(),
            template: spec.template.clone(),
            description: spec.description.clone(),
        }
    }
}

impl Config {
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml(DEFAULT_CONFIG, "<builtin>")
    }

    pub fn from_yaml(source: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(source).map_err(|e| ConfigError::Parse {
            origin: origin.to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn execution_timeout(&self) -> Option<Duration> {
        self.execution_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_identifier("rootPanelId", &self.root_panel_id)?;

        if self.execution_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "executionTimeoutMs must be positive or null".to_string(),
            ));
        }
        if self.history.memory_entries == 0 {
            return Err(ConfigError::Invalid(
                "history.memoryEntries must be positive".to_string(),
            ));
        }
        if self.shell.program.trim().is_empty() {
            return Err(ConfigError::Invalid("shell.program is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for token in self.directives.all() {
            check_identifier("directive", token)?;
            if !seen.insert(token) {
                return Err(ConfigError::Invalid(format!(
                    "directive token `{}` is used twice",
                    token
                )));
            }
        }

        let mut panels = HashSet::new();
        for panel in &self.default_panels {
            check_identifier("panel id", &panel.id)?;
            if !panels.insert(panel.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate panel `{}`", panel.id)));
            }
            let mut tokens = HashSet::new();
            for alias in &panel.aliases {
                check_identifier("alias token", &alias.token)?;
                if !tokens.insert(alias.token.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "duplicate alias `{}` in panel `{}`",
                        alias.token, panel.id
                    )));
                }
            }
        }
        Ok(())
    }
}

// Panel ids, alias tokens and directive words are single non-empty words.
pub fn is_identifier(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(char::is_whitespace)
}

fn check_identifier(what: &str, value: &str) -> Result<(), ConfigError> {
    if is_identifier(value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{} `{}` must be a single non-empty word",
            what, value
        )))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,
    #[error("Config file not found: {}", .0.display())]
    ConfigFileNotFound(PathBuf),
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid YAML in {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
