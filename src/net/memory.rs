//! In-memory stand-in for a non-blocking socket, used by unit tests to model
//! slow consumers, half-closed peers and broken pipes.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

#[derive(Debug, Default)]
pub struct MemoryTransport {
    inbound: VecDeque<u8>,
    read_closed: bool,
    written: Vec<u8>,
    // None means the transport accepts everything.
    write_budget: Option<usize>,
    broken: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that accepts `budget` bytes before reporting "would block".
    pub fn with_write_budget(budget: usize) -> Self {
        Self {
            write_budget: Some(budget),
            ..Self::default()
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes);
    }

    pub fn close_read(&mut self) {
        self.read_closed = true;
    }

    pub fn grant_writes(&mut self, extra: usize) {
        if let Some(budget) = self.write_budget.as_mut() {
            *budget += extra;
        }
    }

    pub fn break_pipe(&mut self) {
        self.broken = true;
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }
}

impl Read for MemoryTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.inbound.is_empty() {
            if self.read_closed {
                return Ok(0);
            }
            return Err(io::ErrorKind::WouldBlock.into());
        }

        let n = buf.len().min(self.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(self.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MemoryTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.broken {
            return Err(io::ErrorKind::BrokenPipe.into());
        }

        let n = match self.write_budget.as_mut() {
            None => buf.len(),
            Some(0) => return Err(io::ErrorKind::WouldBlock.into()),
            Some(budget) => {
                let n = buf.len().min(*budget);
                *budget -= n;
                n
            }
        };

        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
