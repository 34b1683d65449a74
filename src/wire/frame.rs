//! Length-prefixed framing: a 4-byte big-endian payload length followed by
//! exactly that many payload bytes.

use std::io::Write;

use bytes::{BufMut, BytesMut};

use crate::errors::{FrameError, RelayError};
use crate::net::{Buffer, write_nonblocking};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const HEADER_LEN: usize = 4;
pub const MAX_MESSAGE_SIZE: usize = 4096;

// -----------------------------------------------------------------------------
// ----- Frame -----------------------------------------------------------------

/// Zero-copy view of one complete frame at the front of an inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    payload: &'a [u8],
}

impl<'a> Frame<'a> {
    #[inline]
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Bytes to consume from the inbox once this frame has been handled.
    #[inline]
    pub fn wire_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded<'a> {
    /// Fewer than `4 + length` bytes buffered so far.
    Incomplete,
    /// Declared length is above `MAX_MESSAGE_SIZE`; the stream is unusable.
    Malformed { declared: usize },
    Complete(Frame<'a>),
}

// -----------------------------------------------------------------------------
// ----- Decode ----------------------------------------------------------------

/// Classify the front of `inbox`.
///
/// On `Complete` the caller must consume `frame.wire_len()` bytes before
/// decoding again.
pub fn try_decode_front(inbox: &[u8]) -> Decoded<'_> {
    if inbox.len() < HEADER_LEN {
        return Decoded::Incomplete;
    }

    let declared = u32::from_be_bytes([inbox[0], inbox[1], inbox[2], inbox[3]]) as usize;
    if declared > MAX_MESSAGE_SIZE {
        return Decoded::Malformed { declared };
    }

    let total_len = HEADER_LEN + declared;
    if inbox.len() < total_len {
        return Decoded::Incomplete;
    }

    Decoded::Complete(Frame {
        payload: &inbox[HEADER_LEN..total_len],
    })
}

// -----------------------------------------------------------------------------
// ----- Encode ----------------------------------------------------------------

/// Write path for the reactor.
///
/// With an empty `outbox` the frame goes straight to the transport and only
/// the unaccepted tail is queued. With a non-empty `outbox` the whole frame is
/// queued behind what is already there so the byte order on the wire holds.
pub fn encode_or_enqueue<W: Write + ?Sized>(
    transport: &mut W,
    outbox: &mut Buffer,
    payload: &[u8],
) -> Result<(), RelayError> {
    let header = header_for(payload.len())?;

    if !outbox.is_empty() {
        outbox.append(&header)?;
        outbox.append(payload)?;
        return Ok(());
    }

    let mut wire = [0u8; HEADER_LEN + MAX_MESSAGE_SIZE];
    let total_len = HEADER_LEN + payload.len();
    wire[..HEADER_LEN].copy_from_slice(&header);
    wire[HEADER_LEN..total_len].copy_from_slice(payload);

    let written = write_nonblocking(transport, &wire[..total_len])?;
    outbox.append(&wire[written..total_len])?;

    Ok(())
}

/// Append one encoded frame to `dst`. Used by the async client.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<(), FrameError> {
    header_for(payload.len())?;

    dst.reserve(HEADER_LEN + payload.len());
    dst.put_u32(payload.len() as u32);
    dst.extend_from_slice(payload);

    Ok(())
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

#[inline]
fn header_for(len: usize) -> Result<[u8; HEADER_LEN], FrameError> {
    if len > MAX_MESSAGE_SIZE {
        return Err(FrameError::Oversized {
            len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    Ok((len as u32).to_be_bytes())
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::MemoryTransport;

    fn drain_payloads(inbox: &mut Buffer) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Decoded::Complete(frame) = try_decode_front(inbox.view()) {
            out.push(frame.payload().to_vec());
            let n = frame.wire_len();
            inbox.consume(n);
        }
        out
    }

    fn encoded(payload: &[u8]) -> Vec<u8> {
        let mut dst = BytesMut::new();
        encode_frame(payload, &mut dst).unwrap();
        dst.to_vec()
    }

    #[test]
    fn round_trips_boundary_sizes() {
        for len in [0, 1, 255, MAX_MESSAGE_SIZE] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let mut t = MemoryTransport::new();
            let mut outbox = Buffer::new();

            encode_or_enqueue(&mut t, &mut outbox, &payload).unwrap();
            assert!(outbox.is_empty());

            let mut inbox = Buffer::new();
            inbox.append(t.written()).unwrap();
            assert_eq!(drain_payloads(&mut inbox), vec![payload]);
            assert!(inbox.is_empty());
        }
    }

    #[test]
    fn oversized_payload_never_reaches_transport() {
        let mut t = MemoryTransport::new();
        let mut outbox = Buffer::new();
        let payload = vec![0u8; MAX_MESSAGE_SIZE + 1];

        let err = encode_or_enqueue(&mut t, &mut outbox, &payload).unwrap_err();
        assert!(matches!(err, RelayError::Frame(FrameError::Oversized { .. })));
        assert!(t.written().is_empty());
        assert!(outbox.is_empty());

        let mut dst = BytesMut::new();
        assert!(encode_frame(&payload, &mut dst).is_err());
        assert!(dst.is_empty());
    }

    #[test]
    fn oversized_prefix_is_malformed() {
        let declared = (MAX_MESSAGE_SIZE as u32 + 1).to_be_bytes();
        assert_eq!(
            try_decode_front(&declared),
            Decoded::Malformed {
                declared: MAX_MESSAGE_SIZE + 1
            }
        );
    }

    #[test]
    fn short_input_is_incomplete() {
        assert_eq!(try_decode_front(&[]), Decoded::Incomplete);
        assert_eq!(try_decode_front(&[0, 0, 0]), Decoded::Incomplete);
        assert_eq!(try_decode_front(&[0, 0, 0, 3, b'a', b'b']), Decoded::Incomplete);
    }

    #[test]
    fn frames_are_independent_of_chunking() {
        let mut stream = Vec::new();
        for msg in [&b"hello"[..], b"", b"a somewhat longer message", b"x"] {
            stream.extend(encoded(msg));
        }

        let mut whole = Buffer::new();
        whole.append(&stream).unwrap();
        let expected = drain_payloads(&mut whole);
        assert_eq!(expected.len(), 4);

        for chunk in [1, 2, 3, 5, 7, 64] {
            let mut inbox = Buffer::new();
            let mut got = Vec::new();
            for piece in stream.chunks(chunk) {
                inbox.append(piece).unwrap();
                got.extend(drain_payloads(&mut inbox));
            }
            assert_eq!(got, expected, "chunk size {chunk}");
            assert!(inbox.is_empty());
        }
    }

    #[test]
    fn partial_write_queues_tail_in_order() {
        // header split across the boundary
        let mut t = MemoryTransport::with_write_budget(2);
        let mut outbox = Buffer::new();

        encode_or_enqueue(&mut t, &mut outbox, b"hello").unwrap();
        assert_eq!(t.written(), &[0, 0]);
        assert_eq!(outbox.view(), &[0, 5, b'h', b'e', b'l', b'l', b'o']);
    }

    #[test]
    fn non_empty_outbox_queues_whole_frame() {
        let mut t = MemoryTransport::new();
        let mut outbox = Buffer::new();
        outbox.append(b"pending").unwrap();

        encode_or_enqueue(&mut t, &mut outbox, b"hi").unwrap();
        assert!(t.written().is_empty());
        assert_eq!(outbox.view(), b"pending\0\0\0\x02hi");
    }

    #[test]
    fn broken_pipe_is_reported() {
        let mut t = MemoryTransport::new();
        t.break_pipe();
        let mut outbox = Buffer::new();

        let err = encode_or_enqueue(&mut t, &mut outbox, b"hi").unwrap_err();
        assert!(matches!(err, RelayError::Io(_)));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
