use std::{
    env, fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use super::{Config, ConfigError, ConfigPaths};

pub const CONFIG_ENV: &str = "PANELSH_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Builtin,
}

pub struct ConfigLoader<'a> {
    paths: &'a ConfigPaths,
    explicit: bool,
}

impl<'a> ConfigLoader<'a> {
    // `explicit` marks `paths.config_path` as user supplied: it must exist.
    pub fn new(paths: &'a ConfigPaths, explicit: bool) -> Self {
        Self { paths, explicit }
    }

    // Lookup order: explicit path, `$PANELSH_CONFIG`, the default config
    // path, then the built-in configuration.
    pub fn load(&self) -> Result<(Config, ConfigSource), ConfigError> {
        if self.explicit {
            return self.load_required(&self.paths.config_path);
        }

        if let Some(path) = env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return self.load_required(Path::new(&path));
        }

        if self.paths.config_path.exists() {
            return self.load_required(&self.paths.config_path);
        }

        debug!(
            path = %self.paths.config_path.display(),
            "no config file, using built-in configuration"
        );
        Ok((Config::builtin()?, ConfigSource::Builtin))
    }

    fn load_required(&self, path: &Path) -> Result<(Config, ConfigSource), ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigFileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config = if content.trim().is_empty() {
            Config::default()
        } else {
            Config::from_yaml(&content, &path.display().to_string())?
        };
        info!(path = %path.display(), panels = config.default_panels.len(), "loaded config");
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }
}
