//! Newline framing for the upstream NDJSON stream.
//!
//! Chunk boundaries carry no meaning: one event may span several chunks and
//! one chunk may carry several events. The decoder only ever hands out
//! complete lines.

use bytes::{Bytes, BytesMut};
use thiserror::Error;

/// Longest unterminated line the decoder will buffer (1 MiB).
pub const DEFAULT_MAX_PENDING: usize = 1024 * 1024;

/// The backend kept sending bytes without a newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("line exceeds {limit} bytes without a newline")]
pub struct LineTooLong {
    pub limit: usize,
}

/// Incremental line splitter.
///
/// Invariant: `pending` holds exactly the bytes received after the last
/// `\n` seen so far, so it never contains a newline, and never grows past
/// `max_pending`.
#[derive(Debug)]
pub struct FrameDecoder {
    pending: BytesMut,
    max_pending: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::with_max_pending(DEFAULT_MAX_PENDING)
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_pending(max_pending: usize) -> Self {
        Self {
            pending: BytesMut::new(),
            max_pending,
        }
    }

    /// Append a chunk and return every line it completes.
    ///
    /// Blank lines are skipped. Returns nothing until a newline arrives.
    ///
    /// # Errors
    ///
    /// Returns [`LineTooLong`] once the unterminated tail would exceed the
    /// configured limit. The decoder should be discarded afterwards.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Bytes>, LineTooLong> {
        let Some(last_newline) = chunk.iter().rposition(|&b| b == b'\n') else {
            self.check_room(chunk.len())?;
            self.pending.extend_from_slice(chunk);
            return Ok(Vec::new());
        };
        if chunk.len() - last_newline - 1 > self.max_pending {
            return Err(self.too_long());
        }

        // pending has no newline, so the last one in the buffer is the
        // last one in this chunk.
        let boundary = self.pending.len() + last_newline + 1;
        self.pending.extend_from_slice(chunk);
        let complete = self.pending.split_to(boundary).freeze();

        Ok(complete
            .split(|&b| b == b'\n')
            .filter(|line| !is_blank(line))
            .map(|line| complete.slice_ref(line))
            .collect())
    }

    fn check_room(&self, incoming: usize) -> Result<(), LineTooLong> {
        if self.pending.len() + incoming > self.max_pending {
            Err(self.too_long())
        } else {
            Ok(())
        }
    }

    const fn too_long(&self) -> LineTooLong {
        LineTooLong {
            limit: self.max_pending,
        }
    }

    /// Bytes waiting for a terminating newline.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Consume the decoder and return the unterminated tail, if not blank.
    pub fn finish(self) -> Option<Bytes> {
        if is_blank(&self.pending) {
            None
        } else {
            Some(self.pending.freeze())
        }
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}
