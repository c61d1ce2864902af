use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use crate::models::DEFAULT_PIPELINE;

/// Settings read from `~/.salesline/rc`
///
/// The rc file holds `key=value` lines; `#` starts a comment. Recognized keys:
/// - `data.location` - database path, relative paths resolve against the rc directory
/// - `pipeline.default` - pipeline used when none is given on the command line
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_location: PathBuf,
    pub default_pipeline: String,
}

impl Config {
    /// Directory holding the rc file and the default database
    pub fn base_dir() -> PathBuf {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        home.join(".salesline")
    }

    pub fn rc_path() -> PathBuf {
        Self::base_dir().join("rc")
    }

    /// Load the rc file if present, otherwise defaults
    pub fn load() -> Result<Self> {
        let rc_path = Self::rc_path();
        if !rc_path.exists() {
            return Ok(Self::defaults(&Self::base_dir()));
        }
        let content = std::fs::read_to_string(&rc_path)
            .with_context(|| format!("Failed to read config file: {}", rc_path.display()))?;
        let base = rc_path.parent().map(Path::to_path_buf).unwrap_or_else(Self::base_dir);
        Ok(Self::parse(&content, &base))
    }

    fn defaults(base: &Path) -> Self {
        Self {
            data_location: base.join("pipeline.db"),
            default_pipeline: DEFAULT_PIPELINE.to_string(),
        }
    }

    /// Parse rc content; `base` resolves relative paths
    pub fn parse(content: &str, base: &Path) -> Self {
        let mut config = Self::defaults(base);
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                log::warn!("Ignoring malformed config line: {}", line);
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "data.location" => {
                    let path = PathBuf::from(value);
                    config.data_location = if path.is_relative() { base.join(path) } else { path };
                }
                "pipeline.default" if !value.is_empty() => {
                    config.default_pipeline = value.to_string();
                }
                other => log::warn!("Unknown config key: {}", other),
            }
        }
        config
    }
}
