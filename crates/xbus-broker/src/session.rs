use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};
use xbus_proto::{MessageReader, MessageWriter, ProtoError, Request, Response};
use xbus_transport::BusStream;

use crate::correlator::Correlator;
use crate::registry::{Registry, SharedWriter};
use crate::router::Router;
use crate::{lock, ConnectionId};

/// Removes the connection's registry entries when the worker exits, however
/// it exits. Waiters blocked on this connection are released by the removal.
struct SessionGuard {
    id: ConnectionId,
    registry: Arc<Registry>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove_connection(self.id);
        info!(conn = self.id, "disconnected");
    }
}

/// Drive one accepted connection until it closes or fails.
///
/// Messages are classified in arrival order: while the session has
/// outstanding correlation slots, every incoming message is treated as a
/// response (a reply payload may itself contain action characters, so
/// request-parsing it would misroute); otherwise a message that decodes to a
/// valid request goes to the router, and anything else is logged and
/// discarded.
pub(crate) fn run(
    id: ConnectionId,
    stream: BusStream,
    registry: Arc<Registry>,
    correlator: Arc<Correlator>,
    router: Arc<Router>,
) {
    let writer: SharedWriter = match stream.try_clone() {
        Ok(write_half) => Arc::new(Mutex::new(MessageWriter::new(write_half))),
        Err(err) => {
            error!(conn = id, %err, "failed to split connection");
            return;
        }
    };
    let mut reader = MessageReader::new(stream);

    registry.create_session(id, Arc::clone(&writer));
    let _guard = SessionGuard {
        id,
        registry: Arc::clone(&registry),
    };

    loop {
        let message = match reader.next_message() {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!(conn = id, "peer closed the connection");
                break;
            }
            Err(ProtoError::Utf8(err)) => {
                warn!(conn = id, %err, "discarding non-UTF-8 message");
                continue;
            }
            Err(err) => {
                warn!(conn = id, %err, "read failed, dropping connection");
                break;
            }
        };

        if !handle_message(id, &message, &registry, &correlator, &router, &writer) {
            break;
        }
    }
}

/// Process one message; returns false when the connection should be dropped.
fn handle_message(
    id: ConnectionId,
    message: &str,
    registry: &Registry,
    correlator: &Correlator,
    router: &Router,
    writer: &SharedWriter,
) -> bool {
    if registry.has_slots(id) {
        let response = Response::parse(message);
        let tag = response.tag;
        if correlator.fulfill(id, tag, response) {
            debug!(conn = id, tag, "matched response");
        } else {
            warn!(conn = id, %message, "unmatched response, discarding");
        }
        return true;
    }

    match Request::parse(message) {
        Ok(request) => {
            debug!(conn = id, %message, "request");
            let Some(reply) = router.handle(request, id) else {
                return true;
            };
            if let Err(err) = lock(writer).write_response(&reply) {
                warn!(conn = id, %err, "reply write failed, dropping connection");
                return false;
            }
            true
        }
        Err(err) => {
            warn!(conn = id, %message, %err, "message is neither a reply nor a request, discarding");
            true
        }
    }
}
