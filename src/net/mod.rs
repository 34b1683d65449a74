// net/mod.rs
//! Networking layer: the growable byte buffer and the non-blocking I/O
//! helpers built on it. Everything in here is transport-agnostic.

pub mod buffer;
pub mod io;

#[cfg(test)]
pub(crate) mod memory;

pub use buffer::Buffer;
pub use io::{ReadStatus, flush_outbox, read_chunk, write_nonblocking};

#[cfg(test)]
pub(crate) use memory::MemoryTransport;
