pub mod client;
pub mod file;
pub mod server;
pub mod types;

pub use client::{ClientArgs, ClientConfig, ClientTarget};
pub use file::FileConfig;
pub use server::{ServerArgs, ServerConfig};
pub use types::LogLevel;

pub const DEFAULT_TCP_PORT: u16 = 5050;
pub const DEFAULT_DISCOVERY_PORT: u16 = 55555;
