//! Persisted settings
//!
//! A single JSON document in the platform config directory
//! (`~/.config/branchgraph/config.json` on Linux) holds:
//!
//! - the most recently opened working folders
//! - the branches shown per repository, restored as the initial selection
//! - the engine options
//!
//! Missing fields fall back to their defaults, a missing file is an empty config and a
//! malformed file is a configuration error.

use crate::artifacts::branch::DEFAULT_BRANCH_PRIORITY;
use crate::errors::{EngineError, Result};
use anyhow::Context;
use derive_new::new;
use file_guard::Lock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::ops::DerefMut;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_DIR_NAME: &str = "branchgraph";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const MAX_RECENT_FOLDERS: usize = 10;

const DEFAULT_DEBOUNCE_MS: u64 = 1000;
const DEFAULT_MONITOR_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Branches preferred as owners of shared history, best first
    pub branch_priority: Vec<String>,
    /// Hide a local branch whose tip equals its shown remote's tip
    pub hide_same_local_as_remote: bool,
    pub debounce_ms: u64,
    pub monitor_interval_ms: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            branch_priority: DEFAULT_BRANCH_PRIORITY.map(str::to_string).to_vec(),
            hide_same_local_as_remote: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            monitor_interval_ms: DEFAULT_MONITOR_INTERVAL_MS,
        }
    }
}

impl EngineOptions {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub shown_branches: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recent_folders: Vec<PathBuf>,
    pub repos: BTreeMap<String, RepoConfig>,
    pub settings: EngineOptions,
}

impl Config {
    /// Move `folder` to the front of the recent list
    pub fn add_recent_folder(&mut self, folder: impl AsRef<Path>) {
        let folder = folder.as_ref().to_path_buf();
        self.recent_folders.retain(|recent| *recent != folder);
        self.recent_folders.insert(0, folder);
        self.recent_folders.truncate(MAX_RECENT_FOLDERS);
    }

    pub fn shown_branches(&self, repo_path: impl AsRef<Path>) -> Vec<String> {
        self.repos
            .get(&repo_key(repo_path.as_ref()))
            .map(|repo| repo.shown_branches.clone())
            .unwrap_or_default()
    }

    pub fn set_shown_branches(&mut self, repo_path: impl AsRef<Path>, names: Vec<String>) {
        self.repos
            .entry(repo_key(repo_path.as_ref()))
            .or_default()
            .shown_branches = names;
    }
}

fn repo_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Reads and writes the config document
#[derive(Debug, Clone, new)]
pub struct ConfigStore {
    path: Box<Path>,
}

impl ConfigStore {
    /// Store in the platform config directory
    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir()
            .context("no configuration directory on this platform")
            .map_err(EngineError::config)?;
        Ok(ConfigStore::new(
            dir.join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME)
                .into_boxed_path(),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Config> {
        self.read().map_err(EngineError::config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        self.write(config).map_err(EngineError::config)
    }

    /// Load, apply `change` and save under one call
    pub fn update(&self, change: impl FnOnce(&mut Config)) -> Result<Config> {
        let mut config = self.load()?;
        change(&mut config);
        self.save(&config)?;
        Ok(config)
    }

    fn read(&self) -> anyhow::Result<Config> {
        if !self.path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read config file at {:?}", self.path))?;
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("malformed config file at {:?}", self.path))
    }

    fn write(&self, config: &Config) -> anyhow::Result<()> {
        let parent = self.path.parent().with_context(|| {
            format!("config file at {:?} has no parent directory", self.path)
        })?;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {:?}", parent))?;

        let content = serde_json::to_string_pretty(config)?;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .with_context(|| format!("failed to open config file at {:?}", self.path))?;
        let mut lock = file_guard::lock(&mut file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut().write_all(content.as_bytes())?;

        tracing::debug!(path = ?self.path, "config saved");
        Ok(())
    }
}
