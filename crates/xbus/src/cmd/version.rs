use xbus_proto::PROTOCOL_VERSION;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(_args: VersionArgs) -> CliResult<i32> {
    println!("xbus v{PROTOCOL_VERSION}");
    Ok(SUCCESS)
}
