use bytes::{Bytes, BytesMut};

// -----------------------------------------------------------------------------
// ----- LineSplitter ----------------------------------------------------------

/// Turns raw terminal input into lines. One trailing `\r` is stripped so
/// CRLF input behaves like LF.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: BytesMut,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, input: &[u8]) {
        self.pending.extend_from_slice(input);
    }

    /// Next complete line, without its terminator. May be empty.
    pub fn next_line(&mut self) -> Option<Bytes> {
        let idx = memchr::memchr(b'\n', &self.pending)?;

        let mut line = self.pending.split_to(idx + 1);
        line.truncate(idx);
        if line.last() == Some(&b'\r') {
            line.truncate(idx - 1);
        }

        Some(line.freeze())
    }

    /// Whatever is left after the last newline, e.g. at end of input.
    pub fn take_remainder(&mut self) -> Option<Bytes> {
        if self.pending.is_empty() {
            return None;
        }

        let mut rest = self.pending.split();
        if rest.last() == Some(&b'\r') {
            rest.truncate(rest.len() - 1);
        }

        Some(rest.freeze())
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
