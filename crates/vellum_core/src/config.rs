//! Authority configuration.
//!
//! Configuration is persisted as TOML (typically at
//! `~/.config/vellum/config.toml` on Unix systems) and loaded through the
//! same file-access collaborator the store uses, so headless and test
//! setups can provide it in memory.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::document::Version;
use crate::error::{AuthorityError, Result};
use crate::fs::AsyncFileSystem;

fn default_version_baseline() -> Version {
    1
}

/// User-tunable knobs of the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityConfig {
    /// Version a freshly loaded document starts at. Reopened documents
    /// ignore this and resume above their last session's version.
    #[serde(default = "default_version_baseline")]
    pub version_baseline: Version,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            version_baseline: default_version_baseline(),
        }
    }
}

impl AuthorityConfig {
    /// Parse a config from TOML text. Unknown keys are ignored; missing
    /// keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file, falling back to defaults when the file does not
    /// exist. A present-but-malformed file is an error, not a silent
    /// default.
    pub async fn load_from<FS: AsyncFileSystem>(fs: &FS, path: &Path) -> Result<Self> {
        if !fs.exists(path).await {
            log::debug!(
                "[Config] no config at '{}', using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        let text = fs
            .read_to_string(path)
            .await
            .map_err(|source| AuthorityError::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML for persistence.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
