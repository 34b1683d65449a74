use bytes::{Buf, Bytes, BytesMut};
use std::io;
use std::net::SocketAddr;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};

use crate::errors::{FrameError, RelayError};
use crate::wire::{Decoded, HEADER_LEN, MAX_MESSAGE_SIZE, encode_frame, try_decode_front};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const SCRATCH_CAPACITY_HINT: usize = 4096;

// -----------------------------------------------------------------------------
// ----- ChatClient ------------------------------------------------------------

/// Async framed connection to a relay server.
#[derive(Debug)]
pub struct ChatClient {
    reader: FrameReader,
    writer: FrameWriter,
}

impl ChatClient {
    pub async fn connect(addr: SocketAddr) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let _ = stream.set_nodelay(true);
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();

        Self {
            reader: FrameReader::new(reader),
            writer: FrameWriter::new(writer),
        }
    }

    pub async fn send(&mut self, payload: &[u8]) -> Result<(), RelayError> {
        self.writer.send(payload).await
    }

    pub async fn next_frame(&mut self) -> Result<Option<Bytes>, RelayError> {
        self.reader.next_frame().await
    }

    /// Split so reading and writing can be driven from one `select!`.
    pub fn into_split(self) -> (FrameReader, FrameWriter) {
        (self.reader, self.writer)
    }
}

// -----------------------------------------------------------------------------
// ----- FrameReader -----------------------------------------------------------

#[derive(Debug)]
pub struct FrameReader {
    reader: OwnedReadHalf,
    inbox: BytesMut,
}

impl FrameReader {
    fn new(reader: OwnedReadHalf) -> Self {
        Self {
            reader,
            inbox: BytesMut::with_capacity(SCRATCH_CAPACITY_HINT),
        }
    }

    /// Next payload, or `None` once the server closed the stream cleanly.
    ///
    /// Cancel safe: bytes already read stay buffered for the next call.
    pub async fn next_frame(&mut self) -> Result<Option<Bytes>, RelayError> {
        loop {
            match try_decode_front(&self.inbox) {
                Decoded::Complete(frame) => {
                    let len = frame.payload().len();
                    self.inbox.advance(HEADER_LEN);
                    return Ok(Some(self.inbox.split_to(len).freeze()));
                }
                Decoded::Malformed { declared } => {
                    return Err(FrameError::Oversized {
                        len: declared,
                        max: MAX_MESSAGE_SIZE,
                    }
                    .into());
                }
                Decoded::Incomplete => {}
            }

            self.inbox.reserve(SCRATCH_CAPACITY_HINT);
            let n = self.reader.read_buf(&mut self.inbox).await?;
            if n == 0 {
                if self.inbox.is_empty() {
                    return Ok(None);
                }
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
            }
        }
    }
}

// -----------------------------------------------------------------------------
// ----- FrameWriter -----------------------------------------------------------

#[derive(Debug)]
pub struct FrameWriter {
    writer: OwnedWriteHalf,
    outbox: BytesMut,
}

impl FrameWriter {
    fn new(writer: OwnedWriteHalf) -> Self {
        Self {
            writer,
            outbox: BytesMut::with_capacity(SCRATCH_CAPACITY_HINT),
        }
    }

    pub async fn send(&mut self, payload: &[u8]) -> Result<(), RelayError> {
        self.outbox.clear();
        encode_frame(payload, &mut self.outbox)?;
        self.writer.write_all_buf(&mut self.outbox).await?;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
