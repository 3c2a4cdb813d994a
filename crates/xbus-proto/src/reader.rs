use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::warn;

use crate::error::{ProtoError, Result};
use crate::TERMINATOR;

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Largest message accepted without a terminator before the peer is treated
/// as misbehaving.
pub const DEFAULT_MAX_MESSAGE: usize = 64 * 1024;

/// Reads NUL-terminated messages from any `Read` stream.
///
/// Buffers arbitrary chunking internally: a single read may carry several
/// messages, or one message may arrive over many reads — callers always get
/// exactly one complete message at a time.
pub struct MessageReader<T> {
    inner: T,
    buf: BytesMut,
    max_message: usize,
    /// An oversized message was reported; its remaining bytes are discarded
    /// up to the next terminator.
    skipping: bool,
}

impl<T: Read> MessageReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_max_message(inner, DEFAULT_MAX_MESSAGE)
    }

    pub fn with_max_message(inner: T, max_message: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_message,
            skipping: false,
        }
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Ok(None)` on orderly EOF. A partial message truncated by EOF
    /// is logged and dropped. A message that is not valid UTF-8 or exceeds
    /// the size limit fails with an error for that message only; the stream
    /// stays usable (an oversized message's remaining bytes are skipped
    /// through its terminator).
    pub fn next_message(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == TERMINATOR) {
                let message = self.buf.split_to(pos);
                self.buf.advance(1);
                if self.skipping {
                    // Tail of a message already reported as oversized.
                    self.skipping = false;
                    continue;
                }
                return String::from_utf8(message.to_vec())
                    .map(Some)
                    .map_err(ProtoError::from);
            }

            if self.skipping {
                self.buf.clear();
            } else if self.buf.len() > self.max_message {
                let len = self.buf.len();
                self.buf.clear();
                self.skipping = true;
                return Err(ProtoError::MessageTooLong {
                    len,
                    max: self.max_message,
                });
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ProtoError::Io(err)),
            };

            if read == 0 {
                if !self.buf.is_empty() {
                    warn!(
                        len = self.buf.len(),
                        "connection closed mid-message, dropping partial"
                    );
                    self.buf.clear();
                }
                return Ok(None);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
