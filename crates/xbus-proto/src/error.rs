/// Errors that can occur while encoding, decoding, or framing messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// The input contains no action character, so it cannot be a request.
    #[error("no action character in message")]
    MissingAction,

    /// The action characters do not form a recognized action.
    #[error("unrecognized action sequence")]
    UnknownAction,

    /// An action character was found but no subject follows it.
    #[error("missing subject after action")]
    MissingSubject,

    /// A framed message was not valid UTF-8.
    #[error("message is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The peer sent more bytes than allowed without a terminator.
    #[error("message too long ({len} bytes, max {max})")]
    MessageTooLong { len: usize, max: usize },

    /// An outgoing message contains the terminator byte.
    #[error("message contains an embedded terminator byte")]
    EmbeddedTerminator,

    /// The connection closed while writing.
    #[error("connection closed")]
    ConnectionClosed,

    /// An I/O error occurred while reading or writing messages.
    #[error("message I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProtoError>;
