//! Change-detection cache.
//!
//! Maps `owner/repository/branch/subfolder` keys to the last-seen archive
//! revision token, persisted as pretty-printed JSON under the user config
//! directory. The cache is an optimization, not a correctness-critical
//! store: loading never fails a run (missing or malformed content yields an
//! empty map) and saving is best-effort. There is no cross-process locking;
//! last writer wins, and a lost entry only costs a redundant download.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Persistent key → revision-token mapping.
#[derive(Debug, Clone)]
pub struct ChangeCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl ChangeCache {
    /// Default cache location: `<user-config-dir>/ghdir/cache.json`.
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("ghdir").join("cache.json"))
    }

    /// Load the cache from its default location.
    ///
    /// When no config directory can be determined the cache is an in-memory
    /// map that [`save`](Self::save) silently discards.
    pub fn load_default() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(path),
            None => Self {
                path: None,
                entries: BTreeMap::new(),
            },
        }
    }

    /// Load the cache from an explicit path. Missing files and malformed
    /// content both yield an empty cache.
    pub fn load_from(path: PathBuf) -> Self {
        let entries = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        Self {
            path: Some(path),
            entries,
        }
    }

    /// Last-seen revision token for a cache key.
    pub fn token(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Record the revision token for a cache key.
    pub fn set_token(&mut self, key: impl Into<String>, token: impl Into<String>) {
        self.entries.insert(key.into(), token.into());
    }

    /// Persist the cache. Best-effort: failures are logged and swallowed so
    /// cache persistence can never fail a successful fetch.
    pub fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(err) = self.write_to(path) {
            tracing::debug!(path = %path.display(), %err, "failed to save cache");
        }
    }

    fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, content)
    }
}
