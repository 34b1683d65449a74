//! Non-blocking read/write helpers. Loops stop on "would block", never on a
//! fixed iteration count.

use std::io::{self, Read, Write};

use super::buffer::Buffer;
use crate::errors::RelayError;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

/// Size of the stack scratch used for a single read syscall.
pub const READ_CHUNK_SIZE: usize = 8 * 1024;

// -----------------------------------------------------------------------------
// ----- ReadStatus ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// This many bytes were appended to the buffer.
    Data(usize),
    /// Nothing more is available right now.
    WouldBlock,
    /// The peer closed its side of the stream.
    Closed,
}

// -----------------------------------------------------------------------------
// ----- Public ----------------------------------------------------------------

/// Perform one read into `scratch` and append what arrived to `inbox`.
pub fn read_chunk<R: Read + ?Sized>(
    src: &mut R,
    scratch: &mut [u8],
    inbox: &mut Buffer,
) -> Result<ReadStatus, RelayError> {
    loop {
        match src.read(scratch) {
            Ok(0) => return Ok(ReadStatus::Closed),
            Ok(n) => {
                inbox.append(&scratch[..n])?;
                return Ok(ReadStatus::Data(n));
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(ReadStatus::WouldBlock),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Write as much of `data` as the transport takes without blocking.
/// Returns the number of bytes accepted (possibly fewer than `data.len()`).
pub fn write_nonblocking<W: Write + ?Sized>(dst: &mut W, data: &[u8]) -> io::Result<usize> {
    let mut total = 0;

    while total < data.len() {
        match dst.write(&data[total..]) {
            Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(total)
}

/// Push queued bytes to the transport. Returns `true` once `outbox` is empty.
pub fn flush_outbox<W: Write + ?Sized>(dst: &mut W, outbox: &mut Buffer) -> io::Result<bool> {
    if outbox.is_empty() {
        return Ok(true);
    }

    let written = write_nonblocking(dst, outbox.view())?;
    outbox.consume(written);

    Ok(outbox.is_empty())
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::MemoryTransport;

    #[test]
    fn read_chunk_appends_then_would_block() {
        let mut t = MemoryTransport::new();
        t.feed(b"abc");
        let mut scratch = [0u8; 16];
        let mut inbox = Buffer::new();

        assert_eq!(
            read_chunk(&mut t, &mut scratch, &mut inbox).unwrap(),
            ReadStatus::Data(3)
        );
        assert_eq!(
            read_chunk(&mut t, &mut scratch, &mut inbox).unwrap(),
            ReadStatus::WouldBlock
        );
        assert_eq!(inbox.view(), b"abc");
    }

    #[test]
    fn read_chunk_reports_eof() {
        let mut t = MemoryTransport::new();
        t.close_read();
        let mut scratch = [0u8; 16];
        let mut inbox = Buffer::new();

        assert_eq!(
            read_chunk(&mut t, &mut scratch, &mut inbox).unwrap(),
            ReadStatus::Closed
        );
    }

    #[test]
    fn partial_write_stops_at_would_block() {
        let mut t = MemoryTransport::with_write_budget(4);
        let n = write_nonblocking(&mut t, b"abcdefgh").unwrap();
        assert_eq!(n, 4);
        assert_eq!(t.written(), b"abcd");
    }

    #[test]
    fn flush_outbox_drains_across_calls() {
        let mut t = MemoryTransport::with_write_budget(3);
        let mut outbox = Buffer::new();
        outbox.append(b"hello").unwrap();

        assert!(!flush_outbox(&mut t, &mut outbox).unwrap());
        assert_eq!(outbox.view(), b"lo");

        t.grant_writes(10);
        assert!(flush_outbox(&mut t, &mut outbox).unwrap());
        assert_eq!(t.written(), b"hello");
    }

    #[test]
    fn broken_transport_propagates() {
        let mut t = MemoryTransport::new();
        t.break_pipe();
        let err = write_nonblocking(&mut t, b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
