/// Errors that can occur while running the broker.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Socket-level failure (bind, accept, stream setup).
    #[error("transport error: {0}")]
    Transport(#[from] xbus_transport::TransportError),

    /// Message-level failure on a connection.
    #[error("protocol error: {0}")]
    Proto(#[from] xbus_proto::ProtoError),
}

pub type Result<T> = std::result::Result<T, BrokerError>;
