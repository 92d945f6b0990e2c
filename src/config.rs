use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const OPTIONS_FILENAME: &str = "options.json";
const DEFAULT_LANGUAGE: &str = "en_US";

/// Options for a [`ContainerManager`](crate::ContainerManager), stored in
/// `options.json` next to the data directories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StashOptions {
    /// Storage root under which the per-kind directories live.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Language code loaded by default (e.g. "en_US", "ko_KR").
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Whether `reload_all` also reloads cached per-user records. Off by
    /// default: live per-user state is treated as authoritative in memory
    /// while cached, and only config/lang are refreshed from disk.
    #[serde(default)]
    pub reload_user_records: bool,
}

fn default_root() -> PathBuf {
    // Per-user data dir when the platform provides one, a local fallback
    // otherwise (e.g. stripped-down containers without $HOME).
    directories::ProjectDirs::from("", "", "docstash")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".docstash"))
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl Default for StashOptions {
    fn default() -> Self {
        Self {
            root: default_root(),
            default_language: default_language(),
            reload_user_records: false,
        }
    }
}

impl StashOptions {
    /// Options rooted at an explicit directory, everything else default.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load options from the given directory, or return defaults if no
    /// options file exists there.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join(OPTIONS_FILENAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        let options: StashOptions = serde_json::from_str(&content)?;
        Ok(options)
    }

    /// Save options to the given directory.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(dir.join(OPTIONS_FILENAME), content)?;
        Ok(())
    }
}
