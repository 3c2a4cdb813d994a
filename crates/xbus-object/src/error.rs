/// Errors that can occur while running a service object.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    /// Socket-level failure.
    #[error("transport error: {0}")]
    Transport(#[from] xbus_transport::TransportError),

    /// Message-level failure.
    #[error("protocol error: {0}")]
    Proto(#[from] xbus_proto::ProtoError),

    /// The broker speaks a different protocol version. Fatal for the
    /// service process; the broker itself never enforces agreement.
    #[error("protocol version mismatch: expected {expected}, broker has {actual}")]
    VersionMismatch { expected: String, actual: String },

    /// Another connection already registered the requested name.
    #[error("object name '{0}' is already registered")]
    NameTaken(String),

    /// The broker answered the connection handshake with something
    /// unexpected.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The broker closed the connection.
    #[error("bus connection closed")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, ObjectError>;
