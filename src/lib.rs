pub mod client;
pub mod config;
pub mod errors;
pub mod logging;
pub mod net;
pub mod relay;
pub mod wire;

pub use client::ChatClient;
pub use config::{ClientConfig, ServerConfig};
pub use errors::{ConfigError, FrameError, RelayError};
pub use relay::{ConnectionId, Reactor, ReactorHandle};
