use std::path::Path;

use xbus_proto::{Action, Request};

use crate::client;
use crate::cmd::CallArgs;
use crate::exit::{CliResult, FAILURE, SUCCESS};
use crate::output::{print_response, OutputFormat};

#[derive(Clone, Copy, Debug)]
pub enum CallKind {
    /// Property invocation.
    Call,
    /// Property query.
    Request,
    /// Notification.
    Notify,
}

pub fn run(args: CallArgs, kind: CallKind, socket: &Path, format: OutputFormat) -> CliResult<i32> {
    let request = build_request(&args, kind);
    let response = client::round_trip(socket, &request)?;
    print_response(&response, format);
    Ok(if response.is_ok() { SUCCESS } else { FAILURE })
}

fn build_request(args: &CallArgs, kind: CallKind) -> Request {
    let action = match kind {
        CallKind::Notify => Action::Notify,
        _ => Action::Property,
    };
    // '-' addresses the bus itself.
    let object = if args.object == "-" {
        String::new()
    } else {
        args.object.clone()
    };

    let mut request = Request::new(action, object, &args.name);
    if let Some(raw) = &args.args {
        request.args = raw.split(',').map(str::to_string).collect();
    }
    if matches!(kind, CallKind::Request) {
        request.is_query = true;
    }
    request
}
