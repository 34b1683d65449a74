//! The relay core: connection state, the registry with its fanout, the
//! readiness loop that drives them, and the discovery responder.

pub mod connection;
pub mod discovery;
pub mod handle;
pub mod reactor;
pub mod registry;
pub mod shutdown;

pub use connection::{Connection, ConnectionId};
pub use discovery::{discover, discover_at};
pub use handle::ReactorHandle;
pub use reactor::Reactor;
pub use registry::{Fanout, Registry};
pub use shutdown::ShutdownToken;
