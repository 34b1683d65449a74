//! Single-threaded readiness loop: accepts peers, reads and deframes their
//! input, fans complete frames out to everyone else, and flushes queued
//! output when sockets become writable. Connections marked closed during a
//! cycle are removed only once every event of that cycle has been handled.

use std::io;
use std::net::SocketAddr;

use mio::net::{TcpListener, TcpStream, UdpSocket};
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, error, info, warn};

use super::connection::{Connection, ConnectionId};
use super::discovery::Responder;
use super::handle::ReactorHandle;
use super::registry::{Fanout, Registry};
use super::shutdown::ShutdownToken;
use crate::config::ServerConfig;
use crate::errors::{FrameError, RelayError};
use crate::net::{ReadStatus, io::READ_CHUNK_SIZE};
use crate::wire::{Decoded, MAX_MESSAGE_SIZE, try_decode_front};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const LISTENER: Token = Token(0);
const DISCOVERY: Token = Token(1);
const FIRST_CONNECTION_ID: usize = 2;

const EVENTS_CAPACITY: usize = 128;

// -----------------------------------------------------------------------------
// ----- Readiness -------------------------------------------------------------

/// Owned copy of one poll event so handlers can borrow the reactor mutably.
#[derive(Debug, Clone, Copy)]
struct Readiness {
    token: Token,
    readable: bool,
    writable: bool,
    read_closed: bool,
    write_closed: bool,
    error: bool,
}

impl From<&mio::event::Event> for Readiness {
    fn from(event: &mio::event::Event) -> Self {
        Self {
            token: event.token(),
            readable: event.is_readable(),
            writable: event.is_writable(),
            read_closed: event.is_read_closed(),
            write_closed: event.is_write_closed(),
            error: event.is_error(),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Reactor ---------------------------------------------------------------

pub struct Reactor {
    poll: Poll,
    events: Events,
    ready: Vec<Readiness>,

    listener: TcpListener,
    local_addr: SocketAddr,

    responder: Responder,
    discovery_addr: SocketAddr,

    registry: Registry<TcpStream>,
    next_id: usize,
    // Set when accept failed with pending connections left behind; the
    // listener will not report readiness for them again.
    accept_retry: bool,
    scratch: Box<[u8]>,

    config: ServerConfig,
    handle: ReactorHandle,
}

// -----------------------------------------------------------------------------
// ----- Reactor: Static -------------------------------------------------------

impl Reactor {
    /// Bind the stream listener and the discovery socket. Failure here is
    /// fatal for the process.
    pub fn bind(config: &ServerConfig) -> Result<Self, RelayError> {
        let poll = Poll::new()?;

        let mut listener =
            TcpListener::bind(config.listen_addr).map_err(|source| RelayError::Bind {
                what: "stream",
                addr: config.listen_addr,
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let socket = UdpSocket::bind(config.discovery_addr).map_err(|source| RelayError::Bind {
            what: "discovery",
            addr: config.discovery_addr,
            source,
        })?;
        let mut responder = Responder::new(socket, local_addr.port());
        let discovery_addr = responder.local_addr()?;

        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;
        poll.registry()
            .register(responder.socket_mut(), DISCOVERY, Interest::READABLE)?;

        Ok(Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            ready: Vec::with_capacity(EVENTS_CAPACITY),
            listener,
            local_addr,
            responder,
            discovery_addr,
            registry: Registry::new(config.max_outbox_bytes),
            next_id: FIRST_CONNECTION_ID,
            accept_retry: false,
            scratch: vec![0u8; READ_CHUNK_SIZE].into_boxed_slice(),
            config: config.clone(),
            handle: ReactorHandle::new(ShutdownToken::new()),
        })
    }
}

// -----------------------------------------------------------------------------
// ----- Reactor: Public -------------------------------------------------------

impl Reactor {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn discovery_addr(&self) -> SocketAddr {
        self.discovery_addr
    }

    pub fn handle(&self) -> ReactorHandle {
        self.handle.clone()
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Run cycles until shutdown is requested through a handle, then close
    /// everything.
    pub fn run(&mut self) -> Result<(), RelayError> {
        info!(
            "listening on tcp {}, discovery udp {}",
            self.local_addr, self.discovery_addr
        );

        let result = loop {
            if self.handle.is_shutting_down() {
                break Ok(());
            }

            if let Err(e) = self.turn() {
                error!("poll failed: {e}");
                break Err(e);
            }
        };

        self.shutdown();
        result
    }

    /// One readiness wait plus handling of everything it reported.
    pub fn turn(&mut self) -> Result<(), RelayError> {
        match self.poll.poll(&mut self.events, Some(self.config.poll_timeout)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        if std::mem::take(&mut self.accept_retry) {
            self.accept_pending();
        }

        let mut ready = std::mem::take(&mut self.ready);
        ready.clear();
        ready.extend(self.events.iter().map(Readiness::from));

        for r in &ready {
            match r.token {
                LISTENER => self.accept_pending(),
                DISCOVERY => {
                    self.responder.drain();
                }
                Token(id) => self.on_connection_event(ConnectionId(id), r),
            }
        }

        self.ready = ready;
        self.reap_closed();

        Ok(())
    }

    /// Fan `payload` out to every live connection except `sender`. With no
    /// sender the payload reaches everyone.
    pub fn broadcast(
        &mut self,
        sender: Option<ConnectionId>,
        payload: &[u8],
    ) -> Result<Fanout, FrameError> {
        let fanout = self.registry.broadcast(sender, payload)?;

        for id in &fanout.needs_arming {
            self.set_write_interest(*id, true);
        }

        Ok(fanout)
    }

    /// Try to push out whatever is queued, then close every connection.
    pub fn shutdown(&mut self) {
        let open = self.registry.len();
        if open > 0 {
            info!("closing {open} connection(s)");
        }

        for mut conn in self.registry.drain() {
            if let Err(e) = conn.flush() {
                debug!("final flush to {} failed: {e}", conn.id());
            }
            let _ = self.poll.registry().deregister(conn.transport_mut());
        }

        self.handle.publish_connection_count(0);
    }
}

// -----------------------------------------------------------------------------
// ----- Reactor: Accept -------------------------------------------------------

impl Reactor {
    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => self.admit(stream, peer),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("accept error: {e}");
                    self.accept_retry = true;
                    break;
                }
            }
        }
    }

    fn admit(&mut self, mut stream: TcpStream, peer: SocketAddr) {
        if self.registry.len() >= self.config.max_connections {
            warn!(
                "connection limit {} reached; rejecting {peer}",
                self.config.max_connections
            );
            return;
        }

        let id = ConnectionId(self.next_id);
        self.next_id += 1;

        let _ = stream.set_nodelay(true);

        if let Err(e) = self
            .poll
            .registry()
            .register(&mut stream, Token(id.0), Interest::READABLE)
        {
            warn!("failed to register {peer}: {e}");
            return;
        }

        info!("client connected: {peer} ({id})");
        self.registry.insert(Connection::new(id, stream, Some(peer)));
        self.handle.publish_connection_count(self.registry.len());
    }
}

// -----------------------------------------------------------------------------
// ----- Reactor: Connection Events --------------------------------------------

impl Reactor {
    fn on_connection_event(&mut self, id: ConnectionId, r: &Readiness) {
        let Some(conn) = self.registry.get_mut(id) else {
            debug!("event for unknown connection {id}");
            return;
        };

        if conn.is_closed() {
            return;
        }

        // Hang-up or socket error ends the connection without further I/O.
        if r.error || r.write_closed {
            conn.mark_closed();
            return;
        }

        // A half-closed peer may still have frames buffered; the read loop
        // drains them and then sees EOF.
        if r.readable || r.read_closed {
            self.on_readable(id);
        }

        if r.writable {
            self.on_writable(id);
        }
    }

    fn on_readable(&mut self, id: ConnectionId) {
        loop {
            let Some(conn) = self.registry.get_mut(id) else {
                return;
            };

            if conn.is_closed() {
                return;
            }

            match conn.read_chunk(&mut self.scratch) {
                Ok(ReadStatus::Data(_)) => self.drain_frames(id),
                Ok(ReadStatus::WouldBlock) => return,
                Ok(ReadStatus::Closed) => {
                    self.registry.mark_closed(id);
                    return;
                }
                Err(e) => {
                    warn!("read from {id} failed: {e}");
                    self.registry.mark_closed(id);
                    return;
                }
            }
        }
    }

    /// Fan out every complete frame at the front of `id`'s inbox.
    fn drain_frames(&mut self, id: ConnectionId) {
        let Some(conn) = self.registry.get_mut(id) else {
            return;
        };

        let mut inbox = conn.take_inbox();
        let mut malformed = None;

        loop {
            match try_decode_front(inbox.view()) {
                Decoded::Incomplete => break,
                Decoded::Malformed { declared } => {
                    malformed = Some(declared);
                    break;
                }
                Decoded::Complete(frame) => {
                    let consumed = frame.wire_len();
                    if let Err(e) = self.broadcast(Some(id), frame.payload()) {
                        warn!("dropping frame from {id}: {e}");
                    }
                    inbox.consume(consumed);
                }
            }
        }

        let Some(conn) = self.registry.get_mut(id) else {
            return;
        };

        conn.restore_inbox(inbox);

        if let Some(declared) = malformed {
            warn!(
                "protocol violation from {id}: frame length {declared} exceeds {MAX_MESSAGE_SIZE}"
            );
            conn.mark_closed();
        }
    }

    fn on_writable(&mut self, id: ConnectionId) {
        let Some(conn) = self.registry.get_mut(id) else {
            return;
        };

        if conn.is_closed() {
            return;
        }

        match conn.flush() {
            Ok(_) => {
                if conn.needs_write_interest_change() {
                    let want = !conn.outbox().is_empty();
                    self.set_write_interest(id, want);
                }
            }
            Err(e) => {
                warn!("write to {id} failed: {e}");
                conn.mark_closed();
            }
        }
    }

    fn set_write_interest(&mut self, id: ConnectionId, want: bool) {
        let Some(conn) = self.registry.get_mut(id) else {
            return;
        };

        let interest = if want {
            Interest::READABLE | Interest::WRITABLE
        } else {
            Interest::READABLE
        };

        match self
            .poll
            .registry()
            .reregister(conn.transport_mut(), Token(id.0), interest)
        {
            Ok(()) => conn.set_write_armed(want),
            Err(e) => {
                warn!("failed to update interest for {id}: {e}");
                conn.mark_closed();
            }
        }
    }

    fn reap_closed(&mut self) {
        for mut conn in self.registry.take_closed() {
            let _ = self.poll.registry().deregister(conn.transport_mut());

            match conn.peer() {
                Some(peer) => info!("client disconnected: {peer} ({})", conn.id()),
                None => info!("client disconnected ({})", conn.id()),
            }
        }

        self.handle.publish_connection_count(self.registry.len());
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
