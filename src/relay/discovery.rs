//! LAN discovery: a client broadcasts `CHAT_DISCOVER?` and the server answers
//! `CHAT_HERE <port>` to whoever asked.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::errors::RelayError;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const DISCOVER_REQUEST: &[u8] = b"CHAT_DISCOVER?";
pub const DISCOVER_RESPONSE: &str = "CHAT_HERE";

const DATAGRAM_CAPACITY: usize = 512;

// -----------------------------------------------------------------------------
// ----- Protocol --------------------------------------------------------------

/// Reply owed to `datagram`, if it is a discovery request.
pub fn respond(datagram: &[u8], stream_port: u16) -> Option<String> {
    if datagram.starts_with(DISCOVER_REQUEST) {
        Some(format!("{DISCOVER_RESPONSE} {stream_port}"))
    } else {
        None
    }
}

/// Port advertised by a `CHAT_HERE <port>` reply.
pub fn parse_reply(datagram: &[u8]) -> Option<u16> {
    let rest = datagram.strip_prefix(DISCOVER_RESPONSE.as_bytes())?;
    let text = std::str::from_utf8(rest).ok()?.trim_start();

    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    if end == 0 {
        return None;
    }

    text[..end].parse().ok()
}

// -----------------------------------------------------------------------------
// ----- Responder -------------------------------------------------------------

/// Server side of discovery, driven by the reactor's poll loop.
#[derive(Debug)]
pub struct Responder {
    socket: mio::net::UdpSocket,
    stream_port: u16,
}

impl Responder {
    pub fn new(socket: mio::net::UdpSocket, stream_port: u16) -> Self {
        Self {
            socket,
            stream_port,
        }
    }

    pub fn socket_mut(&mut self) -> &mut mio::net::UdpSocket {
        &mut self.socket
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Answer every datagram queued on the socket. Returns how many replies
    /// were sent.
    pub fn drain(&mut self) -> usize {
        let mut buf = [0u8; DATAGRAM_CAPACITY];
        let mut replies = 0;

        loop {
            let (n, src) = match self.socket.recv_from(&mut buf) {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("discovery recv error: {e}");
                    break;
                }
            };

            let Some(reply) = respond(&buf[..n], self.stream_port) else {
                debug!("ignoring {n}-byte datagram from {src}");
                continue;
            };

            match self.socket.send_to(reply.as_bytes(), src) {
                Ok(_) => {
                    debug!("discovery reply to {src}: {reply}");
                    replies += 1;
                }
                Err(e) => warn!("discovery reply to {src} failed: {e}"),
            }
        }

        replies
    }
}

// -----------------------------------------------------------------------------
// ----- Client ----------------------------------------------------------------

/// Broadcast a discovery request on the local network.
pub async fn discover(discovery_port: u16, timeout: Duration) -> Result<SocketAddr, RelayError> {
    discover_at(SocketAddr::from((Ipv4Addr::BROADCAST, discovery_port)), timeout).await
}

/// Send a discovery request to `target` and wait for one reply. The server is
/// the reply's source address with the advertised stream port.
pub async fn discover_at(target: SocketAddr, timeout: Duration) -> Result<SocketAddr, RelayError> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.set_broadcast(true)?;
    socket.send_to(DISCOVER_REQUEST, target).await?;

    let mut buf = [0u8; DATAGRAM_CAPACITY];
    let (n, src) = tokio::time::timeout(timeout, socket.recv_from(&mut buf))
        .await
        .map_err(|_| {
            RelayError::Discovery(format!(
                "no reply from {target} within {}",
                humantime::format_duration(timeout)
            ))
        })??;

    let port = parse_reply(&buf[..n])
        .ok_or_else(|| RelayError::Discovery(format!("unrecognised reply from {src}")))?;

    Ok(SocketAddr::new(src.ip(), port))
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
