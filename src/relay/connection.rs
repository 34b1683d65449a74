use std::fmt;
use std::io::{Read, Write};
use std::net::SocketAddr;

use crate::errors::RelayError;
use crate::net::{Buffer, ReadStatus, flush_outbox, read_chunk};
use crate::wire::encode_or_enqueue;

// -----------------------------------------------------------------------------
// ----- ConnectionId ----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub usize);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// -----------------------------------------------------------------------------
// ----- Connection ------------------------------------------------------------

/// One accepted peer. `closed` means "remove at the end of this cycle".
#[derive(Debug)]
pub struct Connection<T> {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    transport: T,
    inbox: Buffer,
    outbox: Buffer,
    closed: bool,
    write_armed: bool,
}

// -----------------------------------------------------------------------------
// ----- Connection: Static ----------------------------------------------------

impl<T> Connection<T> {
    pub fn new(id: ConnectionId, transport: T, peer: Option<SocketAddr>) -> Self {
        Self {
            id,
            peer,
            transport,
            inbox: Buffer::new(),
            outbox: Buffer::new(),
            closed: false,
            write_armed: false,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Connection: Accessors -------------------------------------------------

impl<T> Connection<T> {
    #[inline]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    #[inline]
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[inline]
    pub fn mark_closed(&mut self) {
        self.closed = true;
    }

    #[inline]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    #[inline]
    pub fn inbox(&self) -> &Buffer {
        &self.inbox
    }

    #[inline]
    pub fn outbox(&self) -> &Buffer {
        &self.outbox
    }

    /// Move the inbox out so frames can be fanned out while the registry is
    /// borrowed mutably. Must be paired with `restore_inbox`.
    pub fn take_inbox(&mut self) -> Buffer {
        std::mem::take(&mut self.inbox)
    }

    pub fn restore_inbox(&mut self, inbox: Buffer) {
        self.inbox = inbox;
    }

    #[inline]
    pub fn is_write_armed(&self) -> bool {
        self.write_armed
    }

    #[inline]
    pub fn set_write_armed(&mut self, armed: bool) {
        self.write_armed = armed;
    }

    /// Write interest should be on exactly when bytes are queued.
    #[inline]
    pub fn needs_write_interest_change(&self) -> bool {
        self.write_armed == self.outbox.is_empty()
    }
}

// -----------------------------------------------------------------------------
// ----- Connection: I/O -------------------------------------------------------

impl<T: Read + Write> Connection<T> {
    pub fn read_chunk(&mut self, scratch: &mut [u8]) -> Result<ReadStatus, RelayError> {
        read_chunk(&mut self.transport, scratch, &mut self.inbox)
    }

    /// Frame `payload` for this peer, writing what the transport takes now.
    pub fn send_frame(&mut self, payload: &[u8]) -> Result<(), RelayError> {
        encode_or_enqueue(&mut self.transport, &mut self.outbox, payload)
    }

    /// Returns `true` when nothing is left queued.
    pub fn flush(&mut self) -> Result<bool, RelayError> {
        Ok(flush_outbox(&mut self.transport, &mut self.outbox)?)
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
