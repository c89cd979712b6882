//! User configuration for loading ghdir's config.toml.

use std::path::PathBuf;

use serde::Deserialize;

use crate::remote::DEFAULT_HOST;
use crate::target::DEFAULT_BRANCH;

/// Settings read from `<user-config-dir>/ghdir/config.toml`.
///
/// Every field has a working default; the file is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GhdirConfig {
    /// Branch assumed when the source URL encodes none.
    pub default_branch: String,
    /// Host archive and clone URLs are built against. Overridable for
    /// GitHub Enterprise installations.
    pub archive_host: String,
}

impl Default for GhdirConfig {
    fn default() -> Self {
        Self {
            default_branch: DEFAULT_BRANCH.to_string(),
            archive_host: DEFAULT_HOST.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: Option<PathBuf>,
}

impl ConfigStore {
    /// Store backed by the default location under the user config directory.
    pub fn from_default_dir() -> Self {
        Self {
            config_path: dirs::config_dir().map(|dir| dir.join("ghdir").join("config.toml")),
        }
    }

    /// Store backed by an explicit path.
    pub fn from_path(config_path: PathBuf) -> Self {
        Self {
            config_path: Some(config_path),
        }
    }

    /// Load the configuration. A missing file yields the defaults; malformed
    /// content is reported as a warning and also yields the defaults —
    /// configuration problems never fail a run.
    pub fn load(&self) -> GhdirConfig {
        let Some(path) = &self.config_path else {
            return GhdirConfig::default();
        };
        let Ok(content) = std::fs::read_to_string(path) else {
            return GhdirConfig::default();
        };
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "ignoring malformed config file");
                GhdirConfig::default()
            }
        }
    }
}
