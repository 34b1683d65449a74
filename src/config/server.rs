use clap::Parser;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use super::file::{FileConfig, parse_duration_field};
use super::types::LogLevel;
use super::{DEFAULT_DISCOVERY_PORT, DEFAULT_TCP_PORT};
use crate::errors::ConfigError;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(500);
const DEFAULT_MAX_OUTBOX_BYTES: usize = 8 * 1024 * 1024;
const DEFAULT_MAX_CONNECTIONS: usize = 1024;

// -----------------------------------------------------------------------------
// ----- ServerConfig ----------------------------------------------------------

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub discovery_addr: SocketAddr,
    pub poll_timeout: Duration,
    pub max_outbox_bytes: usize,
    pub max_connections: usize,
    pub log_level: LogLevel,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let any = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        Self {
            listen_addr: SocketAddr::new(any, DEFAULT_TCP_PORT),
            discovery_addr: SocketAddr::new(any, DEFAULT_DISCOVERY_PORT),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            max_outbox_bytes: DEFAULT_MAX_OUTBOX_BYTES,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            log_level: LogLevel::Info,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- ServerConfig: Static --------------------------------------------------

impl ServerConfig {
    /// Parse process arguments and environment. Exits on `--help` or bad flags.
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::resolve(ServerArgs::parse())
    }

    /// Layer flags/env over the optional file over built-in defaults.
    pub fn resolve(args: ServerArgs) -> Result<Self, ConfigError> {
        let file = FileConfig::load_optional(args.config_file.as_deref())?.server;
        let defaults = ServerConfig::default();

        let host = args
            .host
            .or(file.host)
            .unwrap_or(defaults.listen_addr.ip());
        let port = args.port.or(file.port).unwrap_or(DEFAULT_TCP_PORT);
        let discovery_port = args
            .discovery_port
            .or(file.discovery_port)
            .unwrap_or(DEFAULT_DISCOVERY_PORT);

        let file_poll_timeout = parse_duration_field("poll_timeout", file.poll_timeout.as_deref())?;

        Ok(Self {
            listen_addr: SocketAddr::new(host, port),
            discovery_addr: SocketAddr::new(host, discovery_port),
            poll_timeout: args
                .poll_timeout
                .or(file_poll_timeout)
                .unwrap_or(defaults.poll_timeout),
            max_outbox_bytes: args
                .max_outbox_bytes
                .or(file.max_outbox_bytes)
                .unwrap_or(defaults.max_outbox_bytes),
            max_connections: args
                .max_connections
                .or(file.max_connections)
                .unwrap_or(defaults.max_connections),
            log_level: args
                .log_level
                .or(file.log_level)
                .unwrap_or(defaults.log_level),
        })
    }
}

// -----------------------------------------------------------------------------
// ----- ServerArgs ------------------------------------------------------------

#[derive(Parser, Debug, Default)]
#[command(name = "lanrelay", version, about = "LAN broadcast message relay")]
pub struct ServerArgs {
    // IPv4 or IPv6 literal to bind both sockets on (defaults to 0.0.0.0).
    #[arg(long = "host", short = 'H', env = "LANRELAY_HOST")]
    pub host: Option<IpAddr>,

    #[arg(long = "port", short = 'p', env = "LANRELAY_PORT")]
    pub port: Option<u16>,

    #[arg(long = "discover-port", short = 'd', env = "LANRELAY_DISCOVERY_PORT")]
    pub discovery_port: Option<u16>,

    // Upper bound on one readiness wait, e.g. "500ms".
    #[arg(long = "poll-timeout", env = "LANRELAY_POLL_TIMEOUT", value_parser = humantime::parse_duration)]
    pub poll_timeout: Option<Duration>,

    // A peer whose queued output grows past this is disconnected.
    #[arg(long = "max-outbox-bytes", env = "LANRELAY_MAX_OUTBOX_BYTES")]
    pub max_outbox_bytes: Option<usize>,

    #[arg(long = "max-connections", env = "LANRELAY_MAX_CONNECTIONS")]
    pub max_connections: Option<usize>,

    #[arg(long = "log", env = "LANRELAY_LOG")]
    pub log_level: Option<LogLevel>,

    #[arg(long = "config", env = "LANRELAY_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_protocol_ports() {
        let cfg = ServerConfig::resolve(ServerArgs::default()).unwrap();
        assert_eq!(cfg.listen_addr.port(), 5050);
        assert_eq!(cfg.discovery_addr.port(), 55555);
        assert_eq!(cfg.poll_timeout, Duration::from_millis(500));
        assert_eq!(cfg.log_level, LogLevel::Info);
    }

    #[test]
    fn flags_are_parsed() {
        let args = ServerArgs::try_parse_from([
            "lanrelay",
            "-p",
            "6000",
            "--discover-port",
            "6001",
            "--poll-timeout",
            "100ms",
            "--log",
            "debug",
        ])
        .unwrap();

        let cfg = ServerConfig::resolve(args).unwrap();
        assert_eq!(cfg.listen_addr.port(), 6000);
        assert_eq!(cfg.discovery_addr.port(), 6001);
        assert_eq!(cfg.poll_timeout, Duration::from_millis(100));
        assert_eq!(cfg.log_level, LogLevel::Debug);
    }

    #[test]
    fn flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nport = 7000\ndiscovery_port = 7001\nmax_outbox_bytes = 99"
        )
        .unwrap();

        let args = ServerArgs {
            port: Some(8000),
            config_file: Some(file.path().to_path_buf()),
            ..ServerArgs::default()
        };

        let cfg = ServerConfig::resolve(args).unwrap();
        assert_eq!(cfg.listen_addr.port(), 8000);
        assert_eq!(cfg.discovery_addr.port(), 7001);
        assert_eq!(cfg.max_outbox_bytes, 99);
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
