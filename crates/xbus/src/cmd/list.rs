use std::path::Path;

use xbus_proto::{Action, Request};

use crate::client;
use crate::cmd::ListArgs;
use crate::exit::{CliResult, FAILURE, SUCCESS};
use crate::output::{print_objects, print_response, OutputFormat};

pub fn run(_args: ListArgs, socket: &Path, format: OutputFormat) -> CliResult<i32> {
    let request = Request::new(Action::Property, "", "list");
    let response = client::round_trip(socket, &request)?;
    if !response.is_ok() {
        print_response(&response, format);
        return Ok(FAILURE);
    }
    print_objects(&response.rest, format);
    Ok(SUCCESS)
}
