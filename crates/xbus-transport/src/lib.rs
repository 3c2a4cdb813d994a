//! Unix domain socket transport for the xbus message bus.
//!
//! Provides the byte-stream layer everything else builds on: a listener that
//! owns the well-known socket path ([`BusListener`]) and a connected duplex
//! stream ([`BusStream`]). Message framing and routing live in the layers
//! above; this crate only moves bytes.

pub mod error;
pub mod listener;
pub mod stream;

pub use error::{Result, TransportError};
pub use listener::BusListener;
pub use stream::BusStream;

/// Well-known socket path used when no explicit path is configured.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/xbus.sock";
