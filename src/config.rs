//! Engine configuration.
//!
//! Read from `config.toml` in the platform config directory:
//! - Linux: ~/.config/pivote/config.toml
//! - macOS: ~/Library/Application Support/pivote/config.toml
//! - Windows: %APPDATA%\pivote\config.toml
//!
//! A missing file yields the defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::schema::ParseMode;
use crate::source::SourceKind;

/// Largest page the GitHub commits endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 200;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Where vote journals are read from
    #[serde(default)]
    pub source: SourceConfig,

    /// Background refresh settings
    #[serde(default)]
    pub refresh: RefreshSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Source configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,

    #[serde(default = "default_repo_owner")]
    pub repo_owner: String,

    #[serde(default = "default_repo_name")]
    pub repo_name: String,

    /// Clone URL overriding the GitHub one built from owner and name
    /// (a mirror, or a local path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,

    /// Parent directory of the local clone
    #[serde(default = "default_clone_dir")]
    pub clone_dir: PathBuf,

    /// Base URL of the GitHub REST API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Personal access token for the REST API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Commits requested per API page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Kill git subprocesses and abort HTTP requests after this long
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
}

fn default_repo_owner() -> String {
    "decred-proposals".to_string()
}

fn default_repo_name() -> String {
    "mainnet".to_string()
}

fn default_clone_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("pivote")
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_page_size() -> u32 {
    20
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            repo_owner: default_repo_owner(),
            repo_name: default_repo_name(),
            repo_url: None,
            clone_dir: default_clone_dir(),
            api_url: default_api_url(),
            access_token: None,
            page_size: default_page_size(),
            command_timeout_secs: None,
        }
    }
}

// Hand-written so the access token never reaches a log line
impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("kind", &self.kind)
            .field("repo_owner", &self.repo_owner)
            .field("repo_name", &self.repo_name)
            .field("repo_url", &self.repo_url)
            .field("clone_dir", &self.clone_dir)
            .field("api_url", &self.api_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("page_size", &self.page_size)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .finish()
    }
}

impl SourceConfig {
    /// Clone URL of the proposals repository, GitHub unless overridden
    pub fn repo_url(&self) -> String {
        match self.repo_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => format!(
                "https://github.com/{}/{}.git",
                self.repo_owner, self.repo_name
            ),
        }
    }

    /// Path of the local working copy
    pub fn clone_path(&self) -> PathBuf {
        self.clone_dir.join(crate::source::CLONE_DIR_NAME)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

/// Refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshSettings {
    /// Seconds between background refreshes
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Fail a whole refresh on the first bad commit
    #[serde(default)]
    pub strict: bool,
}

fn default_interval_secs() -> u64 {
    3600
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            strict: false,
        }
    }
}

impl RefreshSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn mode(&self) -> ParseMode {
        if self.strict {
            ParseMode::Strict
        } else {
            ParseMode::Lenient
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pivote").join("config.toml"))
    }

    /// Load from `path`, or from [`Self::default_path`] when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) => Self::load_from(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| PipelineError::Config {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the sources cannot work with
    pub fn validate(&self) -> Result<()> {
        let source = &self.source;
        if source.page_size == 0 || source.page_size > MAX_PAGE_SIZE {
            return Err(PipelineError::Config {
                message: format!(
                    "source.page_size must be between 1 and {}, got {}",
                    MAX_PAGE_SIZE, source.page_size
                ),
            });
        }
        if source.repo_owner.trim().is_empty() || source.repo_name.trim().is_empty() {
            return Err(PipelineError::Config {
                message: "source.repo_owner and source.repo_name must not be empty".to_string(),
            });
        }
        if self.refresh.interval_secs == 0 {
            return Err(PipelineError::Config {
                message: "refresh.interval_secs must be positive".to_string(),
            });
        }
        Ok(())
    }
}
