use std::path::Path;

use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod call;
pub mod field;
pub mod list;
pub mod listen;
pub mod parse;
pub mod repl;
pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bus broker.
    Serve(ServeArgs),
    /// Call a property on an object.
    Call(CallArgs),
    /// Query a property on an object.
    Request(CallArgs),
    /// Send a notification.
    Notify(CallArgs),
    /// Read a field.
    Get(FieldArgs),
    /// Write a field.
    Set(SetArgs),
    /// Send a raw encoded request and print the raw reply.
    Send(SendArgs),
    /// List registered objects.
    List(ListArgs),
    /// Wait for a broadcast notification and print it.
    Listen(ListenArgs),
    /// Interactive request loop.
    Repl(ReplArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Extract one piece of an encoded request.
    ParseReq(ParseReqArgs),
    /// Extract one piece of an encoded response.
    ParseRes(ParseResArgs),
}

pub fn run(command: Command, socket: &Path, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, socket),
        Command::Call(args) => call::run(args, call::CallKind::Call, socket, format),
        Command::Request(args) => call::run(args, call::CallKind::Request, socket, format),
        Command::Notify(args) => call::run(args, call::CallKind::Notify, socket, format),
        Command::Get(args) => field::get(args, socket, format),
        Command::Set(args) => field::set(args, socket, format),
        Command::Send(args) => send::run(args, socket),
        Command::List(args) => list::run(args, socket, format),
        Command::Listen(args) => listen::run(args, socket),
        Command::Repl(args) => repl::run(args, socket),
        Command::Version(args) => version::run(args),
        Command::ParseReq(args) => parse::run_request(args),
        Command::ParseRes(args) => parse::run_response(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Fail in-flight calls whose reply takes longer than this
    /// (e.g. 5s, 500ms). Unbounded when unset.
    #[arg(long, value_name = "DURATION")]
    pub call_timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Target object, or '-' for the bus itself.
    pub object: String,
    /// Property or notification name.
    pub name: String,
    /// Comma-separated argument list.
    pub args: Option<String>,
}

#[derive(Args, Debug)]
pub struct FieldArgs {
    /// Target object.
    pub object: String,
    /// Field name.
    pub name: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Target object.
    pub object: String,
    /// Field name.
    pub name: String,
    /// New value.
    pub value: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Encoded request, e.g. 'calc+add:2,3?'.
    pub request: String,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Only match notifications with this subject.
    pub subject: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ReplArgs {}

#[derive(Args, Debug, Default)]
pub struct VersionArgs {}

#[derive(Args, Debug)]
pub struct ParseReqArgs {
    /// object, action, subject, query, async, or an args index.
    pub what: String,
    /// Encoded request.
    pub request: String,
}

#[derive(Args, Debug)]
pub struct ParseResArgs {
    /// status or a rest index.
    pub what: String,
    /// Encoded response.
    pub response: String,
}
