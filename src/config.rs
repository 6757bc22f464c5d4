//! Layered configuration: defaults, overridden by a TOML file, overridden
//! by `PIONEER_`-prefixed environment variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::{PioneerError, PioneerResult};

fn default_index_file() -> String {
    ".pioneer.json".to_string()
}

fn default_threads() -> usize {
    0
}

fn default_ignore_dirs() -> Vec<String> {
    vec![
        "node_modules".into(),
        "target".into(),
        "build".into(),
        "dist".into(),
        "__pycache__".into(),
        "venv".into(),
        ".venv".into(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Worker thread count; `0` means auto-detect via `num_cpus::get()`.
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            ignore_dirs: default_ignore_dirs(),
        }
    }
}

impl IndexingConfig {
    /// Resolves `0` to hardware concurrency.
    pub fn resolved_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }
}

fn default_logging_directive() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directive")]
    pub default: String,
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_logging_directive(),
            modules: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default = "default_index_file")]
    pub index_file: String,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Settings {
    pub const CONFIG_FILE_NAME: &'static str = "pioneer.toml";
    pub const ENV_PREFIX: &'static str = "PIONEER_";

    /// Layered load: defaults → `pioneer.toml` in the current directory (if
    /// present) → `PIONEER_`-prefixed environment variables.
    pub fn load() -> PioneerResult<Self> {
        Self::load_from(Path::new(Self::CONFIG_FILE_NAME))
    }

    pub fn load_from(config_path: &Path) -> PioneerResult<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(Self::ENV_PREFIX).map(|key| key.as_str().to_lowercase().replace("__", ".").into()));

        figment.extract().map_err(|e| PioneerError::ConfigError {
            reason: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> PioneerResult<()> {
        let text = toml::to_string_pretty(self).map_err(|e| PioneerError::ConfigError {
            reason: e.to_string(),
        })?;
        std::fs::write(path, text).map_err(|e| PioneerError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn index_path(&self, root: &Path) -> PathBuf {
        root.join(&self.index_file)
    }
}
