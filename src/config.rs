use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Taskwarrior executable in the user's PATH
    pub task_command: String,
    pub export_args: Vec<String>,
    /// Taskwarrior data directory; `~` expands to $HOME
    pub data_dir: String,
    /// Files in `data_dir` whose timestamps signal a change
    pub watch_files: Vec<String>,
    pub poll_interval_ms: u64,
    pub export_timeout_ms: u64,
    pub footer_height: u16,
    pub unique_key: Option<String>,
    pub sort_key: Option<String>,
    /// Fields shown in the footer instead of the table
    pub extra_info: Vec<String>,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            task_command: "task".to_string(),
            export_args: vec!["export".to_string()],
            data_dir: "~/.task".to_string(),
            watch_files: vec!["backlog.data".to_string(), "pending.data".to_string()],
            poll_interval_ms: 250,
            export_timeout_ms: 10_000,
            footer_height: 4,
            unique_key: Some("uuid".to_string()),
            sort_key: None,
            extra_info: vec![
                "uuid".to_string(),
                "depends".to_string(),
                "annotations".to_string(),
                "modified".to_string(),
            ],
            log_file: None,
        }
    }
}

impl Config {
    pub fn config_dir() -> Option<PathBuf> {
        let home = env::var("HOME").ok()?;
        Some(PathBuf::from(home).join(".taskhud"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.json"))
    }

    /// Load from `path`, or from `~/.taskhud/config.json` if it exists.
    /// Without either, the defaults are used.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::config_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Config::default()),
            },
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Config> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Full paths of the backing files
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        let dir = expand_home(&self.data_dir);
        self.watch_files.iter().map(|f| dir.join(f)).collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_millis(self.export_timeout_ms)
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if rest.is_empty() || rest.starts_with('/') {
            if let Ok(home) = env::var("HOME") {
                return PathBuf::from(format!("{}{}", home, rest));
            }
        }
    }
    PathBuf::from(path)
}
