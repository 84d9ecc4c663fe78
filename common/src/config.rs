//! # Configuration
//!
//! Settings are read from the process environment (optionally seeded from a
//! `.env` file) and then overridden by command-line flags.
//!
//! The core crates never read the environment themselves: they receive the
//! pieces they need ([`ScanDefaults`], [`ReportOptions`]) by value.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::entities::EntityId;

pub const DEFAULT_SOCKET_PATH: &str = "/run/gvmd/gvmd.sock";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// "Full and fast"
pub const DEFAULT_SCAN_CONFIG: &str = "daba56c8-73ec-11df-a475-002264764cea";
/// "All IANA assigned TCP"
pub const DEFAULT_PORT_LIST: &str = "33d0cd82-57c6-11e1-8ed1-406186ea4fc5";
/// "OpenVAS Default"
pub const DEFAULT_SCANNER: &str = "08b69003-5fc2-4037-a479-93b440211c73";
/// "XML"
pub const DEFAULT_REPORT_FORMAT: &str = "a994b278-1f62-11e1-96ac-406186ea4fc5";
pub const DEFAULT_REPORT_FILTER: &str = "apply_overrides=0 levels=hmlg min_qod=70";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{0} must not be empty")]
    Blank(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

/// Password wrapper that never prints its contents.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Identifiers a new scan falls back on when the caller does not name them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanDefaults {
    pub scan_config: EntityId,
    pub port_list: EntityId,
    pub scanner: EntityId,
}

/// How reports are requested from the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub format: EntityId,
    pub filter: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub password: Secret,
    pub socket_path: PathBuf,
    pub timeout: Duration,
    pub log_level: String,
    pub scan: ScanDefaults,
    pub report: ReportOptions,
}

/// Values given on the command line. `None` keeps the environment's value.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub username: Option<String>,
    pub password: Option<String>,
    pub socket_path: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

/// Loads `.env` from the working directory. A missing file is not an error.
pub fn load_env_file() -> Result<bool, ConfigError> {
    let loaded = dotenvy::dotenv().map(|_| true).or_else(|err| match err {
        dotenvy::Error::Io(_) => Ok(false),
        _ => Err(err),
    })?;
    debug!(loaded, ".env lookup finished");
    Ok(loaded)
}

impl Config {
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), overrides)
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F, overrides: Overrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = overrides
            .username
            .or_else(|| lookup("GMP_USERNAME"))
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string());
        if username.trim().is_empty() {
            return Err(ConfigError::Blank("GMP_USERNAME"));
        }

        let password = overrides
            .password
            .or_else(|| lookup("GMP_PASSWORD"))
            .ok_or(ConfigError::Missing("GMP_PASSWORD"))?;
        if password.trim().is_empty() {
            return Err(ConfigError::Blank("GMP_PASSWORD"));
        }

        let socket_path = overrides
            .socket_path
            .or_else(|| lookup("GMP_SOCKET").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH));

        let timeout_secs = match overrides.timeout_secs {
            Some(secs) => secs,
            None => match lookup("GMP_TIMEOUT_SECS") {
                Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                    key: "GMP_TIMEOUT_SECS",
                    reason: e.to_string(),
                })?,
                None => DEFAULT_TIMEOUT_SECS,
            },
        };
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "GMP_TIMEOUT_SECS",
                reason: "must be at least 1".into(),
            });
        }

        let log_level = overrides
            .log_level
            .or_else(|| lookup("LOG_LEVEL"))
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let id = |key: &'static str, default: &str| -> Result<EntityId, ConfigError> {
            let raw = lookup(key).unwrap_or_else(|| default.to_string());
            EntityId::new(raw.trim()).map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            })
        };

        let scan = ScanDefaults {
            scan_config: id("GMP_SCAN_CONFIG", DEFAULT_SCAN_CONFIG)?,
            port_list: id("GMP_PORT_LIST", DEFAULT_PORT_LIST)?,
            scanner: id("GMP_SCANNER", DEFAULT_SCANNER)?,
        };

        let report = ReportOptions {
            format: id("GMP_REPORT_FORMAT", DEFAULT_REPORT_FORMAT)?,
            filter: lookup("GMP_REPORT_FILTER").unwrap_or_else(|| DEFAULT_REPORT_FILTER.to_string()),
        };

        Ok(Self {
            username,
            password: Secret(password),
            socket_path,
            timeout: Duration::from_secs(timeout_secs),
            log_level,
            scan,
            report,
        })
    }
}
