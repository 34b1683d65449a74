//! Owned connection registry and the fanout that runs over it.

use std::collections::HashMap;
use std::io::{Read, Write};

use tracing::{debug, warn};

use super::connection::{Connection, ConnectionId};
use crate::errors::FrameError;
use crate::wire::MAX_MESSAGE_SIZE;

// -----------------------------------------------------------------------------
// ----- Fanout ----------------------------------------------------------------

/// What a single broadcast did to the rest of the registry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Fanout {
    /// Peers that accepted the frame (written or queued).
    pub delivered: usize,
    /// Peers whose outbox went non-empty and still need write interest.
    pub needs_arming: Vec<ConnectionId>,
    /// Peers marked closed by this broadcast.
    pub failed: Vec<ConnectionId>,
}

// -----------------------------------------------------------------------------
// ----- Registry --------------------------------------------------------------

#[derive(Debug)]
pub struct Registry<T> {
    connections: HashMap<ConnectionId, Connection<T>>,
    max_outbox_bytes: usize,
}

// -----------------------------------------------------------------------------
// ----- Registry: Static ------------------------------------------------------

impl<T> Registry<T> {
    pub fn new(max_outbox_bytes: usize) -> Self {
        Self {
            connections: HashMap::new(),
            max_outbox_bytes,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Registry: Public ------------------------------------------------------

impl<T> Registry<T> {
    pub fn insert(&mut self, conn: Connection<T>) {
        self.connections.insert(conn.id(), conn);
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection<T>> {
        self.connections.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection<T>> {
        self.connections.get_mut(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn mark_closed(&mut self, id: ConnectionId) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.mark_closed();
        }
    }

    /// Unregister every connection marked closed and hand them back so the
    /// caller can release their transports.
    pub fn take_closed(&mut self) -> Vec<Connection<T>> {
        let closed: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.is_closed())
            .map(|c| c.id())
            .collect();

        closed
            .into_iter()
            .filter_map(|id| self.connections.remove(&id))
            .collect()
    }

    /// Unregister everything.
    pub fn drain(&mut self) -> Vec<Connection<T>> {
        self.connections.drain().map(|(_, conn)| conn).collect()
    }
}

// -----------------------------------------------------------------------------
// ----- Registry: Fanout ------------------------------------------------------

impl<T: Read + Write> Registry<T> {
    /// Deliver `payload` to every live connection except `sender`.
    ///
    /// A failing or over-limit peer is marked closed and skipped; it never
    /// stops delivery to the others.
    pub fn broadcast(
        &mut self,
        sender: Option<ConnectionId>,
        payload: &[u8],
    ) -> Result<Fanout, FrameError> {
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(FrameError::Oversized {
                len: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        let mut fanout = Fanout::default();

        for conn in self.connections.values_mut() {
            if Some(conn.id()) == sender || conn.is_closed() {
                continue;
            }

            if let Err(e) = conn.send_frame(payload) {
                warn!("send to {} failed: {e}", conn.id());
                conn.mark_closed();
                fanout.failed.push(conn.id());
                continue;
            }

            if conn.outbox().len() > self.max_outbox_bytes {
                warn!(
                    "{} outbound queue at {} bytes exceeds limit {}; disconnecting",
                    conn.id(),
                    conn.outbox().len(),
                    self.max_outbox_bytes
                );
                conn.mark_closed();
                fanout.failed.push(conn.id());
                continue;
            }

            fanout.delivered += 1;

            if !conn.outbox().is_empty() && !conn.is_write_armed() {
                fanout.needs_arming.push(conn.id());
            }
        }

        debug!(
            "fanout of {} bytes from {:?}: delivered={} failed={}",
            payload.len(),
            sender,
            fanout.delivered,
            fanout.failed.len()
        );

        Ok(fanout)
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
