//! Minimal calculator service — registers as `calc` and serves until killed.
//!
//! Run a broker first:
//!   cargo run -p xbus -- serve
//!
//! Then this service:
//!   cargo run -p xbus-object --example calc-service
//!
//! And call it:
//!   cargo run -p xbus -- request calc add 2,3
//!   cargo run -p xbus -- get calc precision

use xbus_object::{ObjectConfig, ServiceObject};
use xbus_proto::Response;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut calc = ServiceObject::connect("calc", &ObjectConfig::default())?;
    eprintln!("registered as 'calc' on the bus");

    calc.add_field("precision", "2");
    calc.add_property("add", |request| {
        let mut sum = 0i64;
        for arg in &request.args {
            match arg.parse::<i64>() {
                Ok(value) => sum += value,
                Err(_) => return Response::err_with(["NOT A NUMBER", arg.as_str()]),
            }
        }
        Response::ok_with([sum.to_string()])
    });
    calc.on_notify(|request| {
        eprintln!("notification: {request}");
    });

    calc.run()?;
    Ok(())
}
