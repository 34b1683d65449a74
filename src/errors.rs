use std::{collections::TryReserveError, io, net::SocketAddr, path::PathBuf};
use thiserror::Error;

// -----------------------------------------------------------------------------
// ----- FrameError ------------------------------------------------------------

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame length {len} exceeds maximum message size {max}")]
    Oversized { len: usize, max: usize },
}

// -----------------------------------------------------------------------------
// ----- RelayError ------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("buffer growth failed: {0}")]
    Alloc(#[from] TryReserveError),

    #[error("failed to bind {what} socket on {addr}: {source}")]
    Bind {
        what: &'static str,
        addr: SocketAddr,
        source: io::Error,
    },

    #[error("discovery failed: {0}")]
    Discovery(String),
}

// -----------------------------------------------------------------------------
// ----- ConfigError -----------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read error for {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("toml parse error: {source}")]
    Toml { source: toml::de::Error },

    #[error("invalid duration for `{field}`: {source}")]
    Duration {
        field: &'static str,
        source: humantime::DurationError,
    },
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_error_names_the_socket() {
        let err = RelayError::Bind {
            what: "discovery",
            addr: SocketAddr::from(([0, 0, 0, 0], 55555)),
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };
        assert!(err.to_string().starts_with("failed to bind discovery socket on 0.0.0.0:55555"));
    }

    #[test]
    fn oversized_message_mentions_limit() {
        let err = RelayError::from(FrameError::Oversized { len: 5000, max: 4096 });
        assert_eq!(
            err.to_string(),
            "frame length 5000 exceeds maximum message size 4096"
        );
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
