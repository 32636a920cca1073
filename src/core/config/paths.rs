use super::ConfigError;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "panelsh";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_path: PathBuf,
    pub data_dir: PathBuf,
}

impl ConfigPaths {
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::ConfigDirNotFound)?;
        let data_dir = dirs::data_dir().ok_or(ConfigError::ConfigDirNotFound)?;
        Ok(Self::with_roots(&config_dir, &data_dir))
    }

    pub fn with_roots(config_root: &Path, data_root: &Path) -> Self {
        ConfigPaths {
            config_path: config_root.join(APP_DIR).join(CONFIG_FILE),
            data_dir: data_root.join(APP_DIR),
        }
    }

    pub fn with_overrides(mut self, config: Option<&str>, data_dir: Option<&str>) -> Self {
        if let Some(path) = config {
            self.config_path = PathBuf::from(path);
        }
        if let Some(dir) = data_dir {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }
}
