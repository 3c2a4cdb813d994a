use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::error::{ProtoError, Result};
use crate::request::Request;
use crate::response::Response;
use crate::TERMINATOR;

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Writes NUL-terminated messages to any `Write` stream.
pub struct MessageWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> MessageWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Append the terminator and write the whole message (blocking).
    ///
    /// A message containing the terminator byte is rejected: it would be
    /// read back as two messages.
    pub fn write_message(&mut self, message: &str) -> Result<()> {
        if message.as_bytes().contains(&TERMINATOR) {
            return Err(ProtoError::EmbeddedTerminator);
        }

        self.buf.clear();
        self.buf.extend_from_slice(message.as_bytes());
        self.buf.extend_from_slice(&[TERMINATOR]);

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(ProtoError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(ProtoError::Io(err)),
            }
        }

        self.flush()
    }

    /// Encode and write a request.
    pub fn write_request(&mut self, request: &Request) -> Result<()> {
        self.write_message(&request.to_string())
    }

    /// Encode and write a response.
    pub fn write_response(&mut self, response: &Response) -> Result<()> {
        self.write_message(&response.to_string())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(ProtoError::Io(err)),
            }
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
