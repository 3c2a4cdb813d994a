use std::path::Path;

use xbus_proto::Request;

use crate::client::{self, BusClient};
use crate::cmd::SendArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: SendArgs, socket: &Path) -> CliResult<i32> {
    // The close pseudo-request never gets a reply; waiting for one would
    // hang forever.
    if let Ok(request) = Request::parse(&args.request) {
        if client::is_close_request(&request) {
            let mut bus = BusClient::connect(socket)?;
            bus.send(&args.request)?;
            return Ok(SUCCESS);
        }
    }

    let reply = client::round_trip_raw(socket, &args.request)?;
    println!("{reply}");
    Ok(SUCCESS)
}
