//! Broker engine for the xbus message bus.
//!
//! The broker accepts connections on a Unix domain socket and runs one
//! session per connection. Bus-directed requests (empty object) are answered
//! directly; object-directed requests are forwarded to the connection that
//! registered the name, and the eventual reply is matched back to the waiting
//! caller by correlation tag.
//!
//! The moving parts, leaves first:
//!
//! - [`Registry`] — name → connection and connection → session maps.
//! - [`Correlator`] — blocks a caller's worker until the target's reply
//!   arrives on the target's own session.
//! - [`Router`] — the per-request dispatch state machine.
//! - [`Broker`] — bind, accept, spawn a session worker per connection.

use std::sync::{Mutex, MutexGuard};

pub mod correlator;
pub mod error;
pub mod registry;
pub mod router;
pub mod server;
mod session;

pub use correlator::{Correlator, DELIVERY_FAILED};
pub use error::{BrokerError, Result};
pub use registry::Registry;
pub use router::Router;
pub use server::{Broker, BrokerConfig};

/// Identifier assigned to each accepted connection.
///
/// Unique for the broker's lifetime and doubles as the correlation tag on
/// forwarded requests; 0 is reserved for "tag unset".
pub type ConnectionId = u64;

/// Lock a mutex, recovering the data if a panicking holder poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
