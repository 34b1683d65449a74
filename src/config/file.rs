//! Optional TOML configuration file.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 5050
//! discovery_port = 55555
//! poll_timeout = "500ms"
//! max_outbox_bytes = 8388608
//! max_connections = 1024
//! log_level = "info"
//!
//! [client]
//! port = 5050
//! discovery_port = 55555
//! discovery_timeout = "1s"
//! log_level = "warn"
//! ```

use serde::Deserialize;
use std::{fs, net::IpAddr, path::Path, time::Duration};

use super::types::LogLevel;
use crate::errors::ConfigError;

// -----------------------------------------------------------------------------
// ----- FileConfig ------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub client: ClientSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub discovery_port: Option<u16>,
    pub poll_timeout: Option<String>,
    pub max_outbox_bytes: Option<usize>,
    pub max_connections: Option<usize>,
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub discovery_port: Option<u16>,
    pub discovery_timeout: Option<String>,
    pub log_level: Option<LogLevel>,
}

// -----------------------------------------------------------------------------
// ----- FileConfig: Static ----------------------------------------------------

impl FileConfig {
    pub fn load(path: &Path) -> Result<FileConfig, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<FileConfig, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Toml { source: e })
    }

    /// Load `path` when given, otherwise an empty config.
    pub fn load_optional(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(FileConfig::default()),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

pub(crate) fn parse_duration_field(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<Duration>, ConfigError> {
    raw.map(|s| humantime::parse_duration(s).map_err(|e| ConfigError::Duration { field, source: e }))
        .transpose()
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
