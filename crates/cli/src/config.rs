//! `sageplex_cfg.json` loading and location.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use sageplex_core::Thresholds;
use sageplex_core::state::{DEFAULT_END_IGNORE_DIVISOR, DEFAULT_TOLERANCE_MS};
use sageplex_sync::SyncPolicy;

pub const CONFIG_FILE: &str = "sageplex_cfg.json";
pub const CONFIG_ENV: &str = "SAGEPLEX_CFG";

const PLEX_DATA_DIR: &str = "Plex Media Server";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no sageplex_cfg.json found; tried {tried}")]
    NotFound { tried: String },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: missing `{section}` block", .path.display())]
    MissingSection {
        path: PathBuf,
        section: &'static str,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SagexConfig {
    pub user: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_sagex_port")]
    pub port: u16,
}

impl SagexConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlexConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_plex_port")]
    pub port: u16,
    pub token: Option<String>,
}

impl PlexConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub start_ignore_secs: u32,
    pub end_ignore_divisor: i64,
    pub tolerance_ms: i64,
    pub lookup_retries: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            start_ignore_secs: 60,
            end_ignore_divisor: DEFAULT_END_IGNORE_DIVISOR,
            tolerance_ms: DEFAULT_TOLERANCE_MS,
            lookup_retries: 2,
        }
    }
}

impl SyncConfig {
    /// Comparison policy, with `--ignore-secs` taking precedence.
    pub fn policy(&self, ignore_secs: Option<u32>) -> SyncPolicy {
        let thresholds = Thresholds {
            end_ignore_divisor: self.end_ignore_divisor,
            ..Thresholds::default()
        }
        .with_start_ignore_secs(ignore_secs.unwrap_or(self.start_ignore_secs));
        SyncPolicy {
            thresholds,
            tolerance_ms: self.tolerance_ms,
            lookup_retries: self.lookup_retries,
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_sagex_port() -> u16 {
    8080
}

fn default_plex_port() -> u16 {
    32400
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    sagex: Option<SagexConfig>,
    plex: Option<PlexConfig>,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(skip)]
    pub path: PathBuf,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let body = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config =
            serde_json::from_str(&body).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.path = path.to_path_buf();
        Ok(config)
    }

    pub fn sagex(&self) -> Result<&SagexConfig, ConfigError> {
        self.sagex.as_ref().ok_or_else(|| self.missing("sagex"))
    }

    pub fn plex(&self) -> Result<&PlexConfig, ConfigError> {
        self.plex.as_ref().ok_or_else(|| self.missing("plex"))
    }

    fn missing(&self, section: &'static str) -> ConfigError {
        ConfigError::MissingSection {
            path: self.path.clone(),
            section,
        }
    }
}

/// `SAGEPLEX_CFG` may name the file itself or its directory.
fn env_candidate(value: &OsStr) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_dir() {
        path.join(CONFIG_FILE)
    } else {
        path
    }
}

/// The Plex Media Server data directories for this platform, most
/// likely first.
fn plex_data_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if cfg!(windows) {
        if let Some(local) = dirs::data_local_dir() {
            dirs.push(local.join(PLEX_DATA_DIR));
        }
    } else {
        if let Some(home) = dirs::home_dir() {
            dirs.push(home.join("Library/Application Support").join(PLEX_DATA_DIR));
        }
        if cfg!(target_os = "linux") {
            dirs.push(PathBuf::from("/config/Library/Application Support").join(PLEX_DATA_DIR));
        }
    }
    dirs
}

/// Places to look for the config file, in lookup order.
pub fn candidate_paths(explicit: Option<&Path>, env_value: Option<&OsStr>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }
    let mut paths: Vec<PathBuf> = env_value.map(env_candidate).into_iter().collect();
    paths.extend(plex_data_dirs().into_iter().map(|d| d.join(CONFIG_FILE)));
    paths
}

/// Find and load the configuration. An explicit path is used as given,
/// so a missing file there is reported as a read error on that path.
pub fn locate_and_load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        return Config::load(path);
    }
    let env_value = std::env::var_os(CONFIG_ENV);
    let candidates = candidate_paths(None, env_value.as_deref());
    match candidates.iter().find(|p| p.is_file()) {
        Some(path) => {
            tracing::info!(path = %path.display(), "using config");
            Config::load(path)
        }
        None => Err(ConfigError::NotFound {
            tried: candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}
