//! Wire protocol for the xbus message bus.
//!
//! Two text encodings travel over a connection, separated by NUL bytes:
//!
//! - **Requests**: `[object] action subject[:arg,arg,...|=value][&][?][#tag]`
//!   where the action is one of `-` (field), `+` (property), `!` (notify).
//! - **Responses**: `status[,rest0,rest1,...][#tag]`.
//!
//! A string is a request iff it decodes to a valid one ([`is_request`]);
//! that check is the sole discriminator between the two encodings on a
//! stream. [`MessageReader`] and [`MessageWriter`] handle the NUL framing
//! over arbitrary chunking.

pub mod error;
pub mod reader;
pub mod request;
pub mod response;
mod scan;
pub mod writer;

pub use error::{ProtoError, Result};
pub use reader::{MessageReader, DEFAULT_MAX_MESSAGE};
pub use request::{is_request, Action, Request};
pub use response::{Response, STATUS_ERR, STATUS_OK};
pub use writer::MessageWriter;

/// Byte separating consecutive messages on a connection.
pub const TERMINATOR: u8 = 0;

/// Protocol version exchanged over the bus `version` property.
///
/// Services compare this against the broker's answer before registering and
/// treat a mismatch as fatal; the broker itself never enforces agreement.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");
