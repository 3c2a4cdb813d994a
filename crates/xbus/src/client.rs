use std::path::Path;

use xbus_proto::{Action, MessageReader, MessageWriter, Request, Response};
use xbus_transport::BusStream;

use crate::exit::{proto_error, transport_error, CliError, CliResult, FAILURE};

/// A connected one-shot bus client.
pub struct BusClient {
    reader: MessageReader<BusStream>,
    writer: MessageWriter<BusStream>,
}

impl BusClient {
    pub fn connect(socket: &Path) -> CliResult<Self> {
        let stream =
            BusStream::connect(socket).map_err(|err| transport_error("connect failed", err))?;
        let write_half = stream
            .try_clone()
            .map_err(|err| transport_error("connect failed", err))?;
        Ok(Self {
            reader: MessageReader::new(stream),
            writer: MessageWriter::new(write_half),
        })
    }

    pub fn send(&mut self, message: &str) -> CliResult<()> {
        self.writer
            .write_message(message)
            .map_err(|err| proto_error("send failed", err))
    }

    /// Next message, or `None` when the broker hangs up.
    pub fn recv(&mut self) -> CliResult<Option<String>> {
        self.reader
            .next_message()
            .map_err(|err| proto_error("receive failed", err))
    }

    fn recv_reply(&mut self) -> CliResult<String> {
        self.recv()?
            .ok_or_else(|| CliError::new(FAILURE, "connection closed before a reply arrived"))
    }
}

/// One connect → send → receive cycle against the bus.
pub fn round_trip(socket: &Path, request: &Request) -> CliResult<Response> {
    Ok(Response::parse(&round_trip_raw(
        socket,
        &request.to_string(),
    )?))
}

/// Raw-string variant of [`round_trip`]; returns the encoded reply.
pub fn round_trip_raw(socket: &Path, request: &str) -> CliResult<String> {
    let mut client = BusClient::connect(socket)?;
    client.send(request)?;
    client.recv_reply()
}

/// Whether `request` is the bus `close` pseudo-request, which never gets a
/// reply.
pub fn is_close_request(request: &Request) -> bool {
    request.object.is_empty()
        && request.action == Action::Property
        && request.subject == "close"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_request_is_recognized() {
        assert!(is_close_request(&Request::parse("+close").unwrap()));
        assert!(!is_close_request(&Request::parse("obj+close").unwrap()));
        assert!(!is_close_request(&Request::parse("+closedown").unwrap()));
        assert!(!is_close_request(&Request::parse("!close").unwrap()));
    }
}
