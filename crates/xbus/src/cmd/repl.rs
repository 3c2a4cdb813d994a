use std::io::{BufRead, Write};
use std::path::Path;

use xbus_proto::{Action, Request, Response, PROTOCOL_VERSION};

use crate::client::{self, BusClient};
use crate::cmd::ReplArgs;
use crate::exit::{io_error, CliResult, SUCCESS};

pub fn run(_args: ReplArgs, socket: &Path) -> CliResult<i32> {
    println!("xbus v{PROTOCOL_VERSION}");
    let mut bus = BusClient::connect(socket)?;

    let stdin = std::io::stdin();
    let mut stdin = stdin.lock();

    loop {
        print!("] ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        let read = stdin
            .read_line(&mut line)
            .map_err(|err| io_error("stdin read failed", err))?;
        if read == 0 {
            break;
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            continue;
        }

        if matches!(line, "/q" | "/quit" | "/exit") {
            let _ = bus.send("+close");
            break;
        }

        // Validate locally: the broker discards invalid requests without
        // answering, which would leave us waiting forever.
        let request = match Request::parse(line) {
            Ok(request) => request,
            Err(err) => {
                println!("not a request: {err}");
                continue;
            }
        };
        if client::is_close_request(&request) {
            let _ = bus.send(line);
            break;
        }

        bus.send(line)?;

        // Read until our reply shows up; broadcasts can interleave.
        loop {
            let Some(message) = bus.recv()? else {
                return Ok(SUCCESS);
            };
            match Request::parse(&message) {
                Ok(incoming) => {
                    println!("{incoming}");
                    if incoming.action != Action::Notify {
                        let _ = bus.send(&Response::err_with(["UNSUPPORTED"]).to_string());
                    }
                }
                Err(_) => {
                    println!("{}", Response::parse(&message));
                    break;
                }
            }
        }
    }

    Ok(SUCCESS)
}
