//! Service skeleton for objects on the xbus message bus.
//!
//! A [`ServiceObject`] connects to the broker, confirms the protocol
//! version, registers its name, and then dispatches incoming requests to a
//! capability table: named fields (mutable values), named property handlers,
//! and an optional notification callback.
//!
//! ```no_run
//! use xbus_object::{ObjectConfig, ServiceObject};
//! use xbus_proto::Response;
//!
//! let mut calc = ServiceObject::connect("calc", &ObjectConfig::default())?;
//! calc.add_field("precision", "2");
//! calc.add_property("add", |request| {
//!     let sum: i64 = request.args.iter().filter_map(|a| a.parse::<i64>().ok()).sum();
//!     Response::ok_with([sum.to_string()])
//! });
//! calc.run()?;
//! # Ok::<(), xbus_object::ObjectError>(())
//! ```

pub mod error;
pub mod object;

pub use error::{ObjectError, Result};
pub use object::{
    NotifyHandler, ObjectConfig, PropertyHandler, ServiceObject, StopHandle,
};
