use std::path::Path;

use xbus_proto::{Action, Request};

use crate::client;
use crate::cmd::{FieldArgs, SetArgs};
use crate::exit::{CliResult, FAILURE, SUCCESS};
use crate::output::{print_response, OutputFormat};

pub fn get(args: FieldArgs, socket: &Path, format: OutputFormat) -> CliResult<i32> {
    let request = Request::new(Action::Field, &args.object, &args.name).query();
    let response = client::round_trip(socket, &request)?;
    print_response(&response, format);
    Ok(if response.is_ok() { SUCCESS } else { FAILURE })
}

pub fn set(args: SetArgs, socket: &Path, format: OutputFormat) -> CliResult<i32> {
    let request =
        Request::new(Action::Field, &args.object, &args.name).with_args([args.value.as_str()]);
    let response = client::round_trip(socket, &request)?;
    print_response(&response, format);
    Ok(if response.is_ok() { SUCCESS } else { FAILURE })
}
