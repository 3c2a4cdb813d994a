use std::path::Path;

use xbus_proto::{Action, Request};

use crate::client::BusClient;
use crate::cmd::ListenArgs;
use crate::exit::{CliError, CliResult, FAILURE, SUCCESS};

/// Wait for one broadcast notification (optionally filtered by subject) and
/// print it.
pub fn run(args: ListenArgs, socket: &Path) -> CliResult<i32> {
    let mut bus = BusClient::connect(socket)?;

    loop {
        let Some(message) = bus.recv()? else {
            return Err(CliError::new(FAILURE, "bus connection closed"));
        };
        let Ok(request) = Request::parse(&message) else {
            continue;
        };
        if request.action != Action::Notify {
            continue;
        }
        if let Some(subject) = &args.subject {
            if *subject != request.subject {
                continue;
            }
        }
        println!("{request}");
        return Ok(SUCCESS);
    }
}
