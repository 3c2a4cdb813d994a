mod client;
mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::{Command, ReplArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "xbus", version, about = "Local message bus over Unix domain sockets")]
struct Cli {
    /// Bus socket path.
    #[arg(
        long,
        short = 's',
        value_name = "PATH",
        default_value = xbus_transport::DEFAULT_SOCKET_PATH,
        global = true
    )]
    socket: PathBuf,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Option<Command>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    // No subcommand drops into the interactive loop.
    let command = cli.command.unwrap_or(Command::Repl(ReplArgs::default()));

    match cmd::run(command, &cli.socket, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_with_timeout() {
        let cli = Cli::try_parse_from(["xbus", "serve", "--call-timeout", "5s"])
            .expect("serve args should parse");
        assert!(matches!(cli.command, Some(Command::Serve(_))));
    }

    #[test]
    fn parses_call_with_args() {
        let cli = Cli::try_parse_from(["xbus", "call", "calc", "add", "2,3"])
            .expect("call args should parse");
        let Some(Command::Call(args)) = cli.command else {
            panic!("expected call command");
        };
        assert_eq!(args.object, "calc");
        assert_eq!(args.name, "add");
        assert_eq!(args.args.as_deref(), Some("2,3"));
    }

    #[test]
    fn socket_flag_is_global() {
        let cli = Cli::try_parse_from(["xbus", "list", "--socket", "/tmp/other.sock"])
            .expect("global socket flag should parse");
        assert_eq!(cli.socket, PathBuf::from("/tmp/other.sock"));
    }

    #[test]
    fn defaults_to_the_well_known_socket_and_repl() {
        let cli = Cli::try_parse_from(["xbus"]).expect("bare invocation should parse");
        assert_eq!(
            cli.socket,
            PathBuf::from(xbus_transport::DEFAULT_SOCKET_PATH)
        );
        assert!(cli.command.is_none());
    }

    #[test]
    fn set_requires_a_value() {
        let err = Cli::try_parse_from(["xbus", "set", "calc", "precision"])
            .expect_err("set without value should fail");
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn parses_parse_req_extractor() {
        let cli = Cli::try_parse_from(["xbus", "parse-req", "subject", "calc+add:2,3"])
            .expect("parse-req args should parse");
        assert!(matches!(cli.command, Some(Command::ParseReq(_))));
    }
}
