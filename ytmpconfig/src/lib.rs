//! # ytmpd Configuration Module
//!
//! This module provides configuration management for ytmpd, including:
//! - Loading configuration from YAML files
//! - Falling back to an embedded default configuration
//! - Config directory discovery and validation
//! - Load-time validation of option values
//!
//! Unlike a free-form key/value store, the configuration is a closed struct:
//! every option ytmpd understands is a named field with a default, and
//! unknown keys in the file are ignored.
//!
//! ## Usage
//!
//! ```no_run
//! use ytmpconfig::Config;
//!
//! let config = Config::load("")?;
//! println!("proxy at {}", config.proxy_base_url());
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, bail, Context, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{info, warn};

/// Embedded default configuration, written out on first start.
const DEFAULT_CONFIG: &str = include_str!("ytmpd.yaml");

/// Environment variable overriding the config directory.
pub const ENV_CONFIG_DIR: &str = "YTMPD_CONFIG";

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "ytmpd.yaml";

/// ytmpd configuration.
///
/// Every field has a default, so a partial (or empty) YAML file is valid.
/// Path fields left empty are derived from the config directory when the
/// configuration is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Period of the periodic sync, in minutes. Must be > 0.
    pub sync_interval_minutes: u64,
    /// When false, only manual syncs (command socket) run.
    pub auto_sync_enabled: bool,
    /// Prefix for MPD stored playlist names. Empty is allowed.
    pub playlist_prefix: String,

    /// When false, playlists are written with the resolved upstream URLs
    /// directly. Clients then see no ICY metadata and stale URLs cannot be
    /// refreshed; this exists as a compatibility fall-through only.
    pub proxy_enabled: bool,
    /// Host the proxy binds, and the host written into playlist URLs.
    pub proxy_host: String,
    /// Port the proxy binds. Must be > 0.
    pub proxy_port: u16,
    /// Upper bound on simultaneously served streams. Must be > 0.
    pub max_concurrent_streams: usize,
    /// Age, in hours, after which a stored stream URL is considered stale.
    pub stream_cache_hours: u64,

    /// Binary used for URL resolution.
    pub ytdlp_path: String,
    /// Deadline for one resolver call, in seconds.
    pub resolver_timeout_seconds: u64,

    /// TrackStore database file. Empty: `<config_dir>/tracks.db`.
    pub track_db_path: PathBuf,
    /// Unix socket MPD listens on. Empty: `~/.config/mpd/socket`.
    pub mpd_socket_path: PathBuf,
    /// Unix socket the daemon binds for its command channel.
    /// Empty: `<config_dir>/ytmpd.sock`.
    pub command_socket_path: PathBuf,
    /// Request headers file holding the catalog credentials.
    /// Empty: `<config_dir>/headers.yaml`.
    pub catalog_auth_path: PathBuf,

    /// Directory this configuration was loaded from.
    #[serde(skip)]
    config_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_interval_minutes: 30,
            auto_sync_enabled: true,
            playlist_prefix: "YT: ".to_string(),
            proxy_enabled: true,
            proxy_host: "localhost".to_string(),
            proxy_port: 8080,
            max_concurrent_streams: 10,
            stream_cache_hours: 5,
            ytdlp_path: "yt-dlp".to_string(),
            resolver_timeout_seconds: 30,
            track_db_path: PathBuf::new(),
            mpd_socket_path: PathBuf::new(),
            command_socket_path: PathBuf::new(),
            catalog_auth_path: PathBuf::new(),
            config_dir: PathBuf::new(),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> PathBuf {
        // 1. Provided directory wins
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }

        // 2. Environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Using config dir from env");
            return PathBuf::from(env_path);
        }

        // 3. Current directory
        if Path::new(".ytmpd").exists() {
            return PathBuf::from(".ytmpd");
        }

        // 4. Home directory
        if let Some(home) = home_dir() {
            return home.join(".ytmpd");
        }

        PathBuf::from(".ytmpd")
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("creating config dir {}", path.display()))?;
        }

        if !path.is_dir() {
            bail!("config path {} is not a directory", path.display());
        }

        // Write test
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        Ok(())
    }

    /// Loads the configuration from `<dir>/ytmpd.yaml`.
    ///
    /// `directory` may be empty, in which case the directory is discovered:
    /// `$YTMPD_CONFIG`, then `./.ytmpd`, then `~/.ytmpd`. A missing config
    /// file is created from the embedded defaults. Empty path options are
    /// filled in relative to the config directory, and the result is
    /// validated before it is returned.
    pub fn load(directory: &str) -> Result<Config> {
        let dir = Self::find_config_dir(directory);
        Self::validate_config_dir(&dir)?;

        let file = dir.join(CONFIG_FILE_NAME);
        if !file.exists() {
            info!(path = %file.display(), "Writing default configuration");
            fs::write(&file, DEFAULT_CONFIG)
                .with_context(|| format!("writing {}", file.display()))?;
        }

        let raw = fs::read_to_string(&file)
            .with_context(|| format!("reading {}", file.display()))?;
        let mut config: Config = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing {}", file.display()))?;

        config.config_dir = dir;
        config.fill_derived_paths();
        config.validate()?;

        Ok(config)
    }

    /// Fills empty path options with their derived defaults.
    fn fill_derived_paths(&mut self) {
        if self.track_db_path.as_os_str().is_empty() {
            self.track_db_path = self.config_dir.join("tracks.db");
        }
        if self.command_socket_path.as_os_str().is_empty() {
            self.command_socket_path = self.config_dir.join("ytmpd.sock");
        }
        if self.catalog_auth_path.as_os_str().is_empty() {
            self.catalog_auth_path = self.config_dir.join("headers.yaml");
        }
        if self.mpd_socket_path.as_os_str().is_empty() {
            match home_dir() {
                Some(home) => self.mpd_socket_path = home.join(".config/mpd/socket"),
                None => warn!("No home directory; mpd_socket_path must be set explicitly"),
            }
        }
    }

    /// Checks option values that have hard constraints.
    pub fn validate(&self) -> Result<()> {
        if self.sync_interval_minutes == 0 {
            return Err(anyhow!("sync_interval_minutes must be > 0"));
        }
        if self.max_concurrent_streams == 0 {
            return Err(anyhow!("max_concurrent_streams must be > 0"));
        }
        if self.proxy_port == 0 {
            return Err(anyhow!("proxy_port must be > 0"));
        }
        if self.proxy_host.is_empty() {
            return Err(anyhow!("proxy_host must not be empty"));
        }
        if self.resolver_timeout_seconds == 0 {
            return Err(anyhow!("resolver_timeout_seconds must be > 0"));
        }
        Ok(())
    }

    /// Directory the configuration was loaded from.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Base URL under which the proxy is reachable, without trailing slash.
    pub fn proxy_base_url(&self) -> String {
        format!("http://{}:{}", self.proxy_host, self.proxy_port)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_minutes * 60)
    }

    pub fn stream_cache(&self) -> Duration {
        Duration::from_secs(self.stream_cache_hours * 3600)
    }

    pub fn resolver_timeout(&self) -> Duration {
        Duration::from_secs(self.resolver_timeout_seconds)
    }
}
