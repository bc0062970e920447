//! Configuration resolved once at startup.
//!
//! Locations come from the environment (`$TD`, falling back to `$HOME`,
//! and `$EDITOR`); tunables come from `.td/config.json` with `TD_*`
//! environment overrides. The resulting [`Config`] is passed to
//! [`crate::Store::open`]; nothing else reads the environment.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::detect::DetectorKind;
use crate::error::{TdError, TdResult};
use crate::fsutil::atomic_write;

/// Name of the root sync directory inside the base directory.
pub const DIR_NAME: &str = ".td";
/// Settings file inside the root sync directory.
pub const SETTINGS_FILE: &str = "config.json";
/// Editor used when `$EDITOR` is unset.
pub const DEFAULT_EDITOR: &str = "vi";

/// Tunables stored at `.td/config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the remote topic store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Bearer token sent with every remote request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Per-request timeout for remote calls.
    pub timeout_secs: u64,
    /// Concurrent remote updates during a push. 1 means sequential.
    pub workers: usize,
    /// Rule deciding which topics a push sends.
    pub detector: DetectorKind,
    /// How long to wait for another invocation to release the store.
    pub lock_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: None,
            token: None,
            timeout_secs: 30,
            workers: 1,
            detector: DetectorKind::NonEmpty,
            lock_timeout_ms: 5000,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, or return defaults if it is absent.
    pub fn load(path: &Path) -> TdResult<Self> {
        match fs::read_to_string(path) {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Save settings to a JSON file (atomic).
    pub fn save(&self, path: &Path) -> TdResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        atomic_write(path, json.as_bytes())
    }
}

/// Everything td needs to know about its environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root sync directory (`<base>/.td`).
    pub root: PathBuf,
    /// Editor program, possibly with arguments.
    pub editor: String,
    pub settings: Settings,
}

impl Config {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> TdResult<Self> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup.
    ///
    /// Empty variables count as unset.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> TdResult<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base = var("TD")
            .or_else(|| var("HOME"))
            .ok_or(TdError::MissingEnvironment)?;
        let root = PathBuf::from(base).join(DIR_NAME);
        let editor = var("EDITOR").unwrap_or_else(|| DEFAULT_EDITOR.to_string());

        let mut settings = Settings::load(&root.join(SETTINGS_FILE))?;
        if let Some(server) = var("TD_SERVER") {
            settings.server = Some(server);
        }
        if let Some(token) = var("TD_TOKEN") {
            settings.token = Some(token);
        }
        if let Some(workers) = var("TD_WORKERS") {
            settings.workers = workers
                .trim()
                .parse()
                .map_err(|_| TdError::Config(format!("TD_WORKERS must be a number, got '{workers}'")))?;
        }
        if let Some(detector) = var("TD_DETECTOR") {
            settings.detector = detector.parse().map_err(TdError::Config)?;
        }

        Ok(Self {
            root,
            editor,
            settings,
        })
    }

    /// Configuration rooted at an explicit directory, with default settings.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            editor: DEFAULT_EDITOR.to_string(),
            settings: Settings::default(),
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.settings.lock_timeout_ms)
    }

    /// Worker count for pushes, never less than one.
    pub fn workers(&self) -> usize {
        self.settings.workers.max(1)
    }
}
