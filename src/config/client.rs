use clap::Parser;
use std::{net::IpAddr, path::PathBuf, time::Duration};

use super::file::{FileConfig, parse_duration_field};
use super::types::LogLevel;
use super::{DEFAULT_DISCOVERY_PORT, DEFAULT_TCP_PORT};
use crate::errors::ConfigError;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(1);

// -----------------------------------------------------------------------------
// ----- ClientConfig ----------------------------------------------------------

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub target: ClientTarget,
    pub discovery_timeout: Duration,
    pub log_level: LogLevel,
}

/// Where the client should connect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientTarget {
    Direct { host: IpAddr, port: u16 },
    Discover { discovery_port: u16 },
}

// -----------------------------------------------------------------------------
// ----- ClientConfig: Static --------------------------------------------------

impl ClientConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::resolve(ClientArgs::parse())
    }

    pub fn resolve(args: ClientArgs) -> Result<Self, ConfigError> {
        let file = FileConfig::load_optional(args.config_file.as_deref())?.client;

        let target = match args.host.or(file.host) {
            Some(host) => ClientTarget::Direct {
                host,
                port: args.port.or(file.port).unwrap_or(DEFAULT_TCP_PORT),
            },
            None => ClientTarget::Discover {
                discovery_port: args
                    .discovery_port
                    .or(file.discovery_port)
                    .unwrap_or(DEFAULT_DISCOVERY_PORT),
            },
        };

        let file_timeout =
            parse_duration_field("discovery_timeout", file.discovery_timeout.as_deref())?;

        Ok(Self {
            target,
            discovery_timeout: args
                .discovery_timeout
                .or(file_timeout)
                .unwrap_or(DEFAULT_DISCOVERY_TIMEOUT),
            log_level: args.log_level.or(file.log_level).unwrap_or(LogLevel::Warn),
        })
    }
}

// -----------------------------------------------------------------------------
// ----- ClientArgs ------------------------------------------------------------

#[derive(Parser, Debug, Default)]
#[command(
    name = "lanrelay-client",
    version,
    about = "Interactive client for lanrelay",
    after_help = "If --host is omitted, UDP discovery is used."
)]
pub struct ClientArgs {
    #[arg(long = "host", short = 'H', env = "LANRELAY_HOST")]
    pub host: Option<IpAddr>,

    // Only used together with --host; discovery supplies the port otherwise.
    #[arg(long = "port", short = 'p', env = "LANRELAY_PORT")]
    pub port: Option<u16>,

    #[arg(long = "discover-port", short = 'd', env = "LANRELAY_DISCOVERY_PORT")]
    pub discovery_port: Option<u16>,

    #[arg(long = "discovery-timeout", value_parser = humantime::parse_duration)]
    pub discovery_timeout: Option<Duration>,

    #[arg(long = "log", env = "LANRELAY_LOG")]
    pub log_level: Option<LogLevel>,

    #[arg(long = "config", env = "LANRELAY_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
