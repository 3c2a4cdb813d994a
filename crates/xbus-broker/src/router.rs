use std::sync::Arc;

use tracing::{debug, info, warn};
use xbus_proto::{Action, Request, Response, PROTOCOL_VERSION};

use crate::correlator::{Correlator, DELIVERY_FAILED};
use crate::registry::Registry;
use crate::{lock, ConnectionId};

/// The per-request dispatch state machine.
///
/// Invoked once for each decoded, valid request read from a connection.
/// Bus-directed requests (empty object) are answered here; object-directed
/// requests are forwarded to the registered connection and, except for
/// notifications, correlated with their eventual reply.
pub struct Router {
    registry: Arc<Registry>,
    correlator: Arc<Correlator>,
}

impl Router {
    pub fn new(registry: Arc<Registry>, correlator: Arc<Correlator>) -> Self {
        Self {
            registry,
            correlator,
        }
    }

    /// Handle one request from `caller`. `None` means no reply is sent.
    pub fn handle(&self, request: Request, caller: ConnectionId) -> Option<Response> {
        if request.object.is_empty() {
            self.handle_bus(request, caller)
        } else {
            Some(self.handle_object(request, caller))
        }
    }

    fn handle_bus(&self, request: Request, caller: ConnectionId) -> Option<Response> {
        match request.action {
            Action::Property => self.handle_bus_property(&request, caller),
            Action::Notify => Some(self.broadcast(request, caller)),
            Action::Field => Some(Response::err_with(["UNKNOWN ACTION"])),
        }
    }

    fn handle_bus_property(&self, request: &Request, caller: ConnectionId) -> Option<Response> {
        match request.subject.as_str() {
            // The caller-side loop treats its own `close` as "hang up"; the
            // broker's part is to send nothing back.
            "close" => None,
            "register" => Some(self.register(request, caller)),
            "version" => Some(Response::ok_with([PROTOCOL_VERSION])),
            "list" => Some(Response::ok_with(self.registry.list_objects())),
            "fd" => Some(Response::ok_with([caller.to_string()])),
            _ => Some(Response::err_with(["UNKNOWN PROPERTY"])),
        }
    }

    fn register(&self, request: &Request, caller: ConnectionId) -> Response {
        let [name] = request.args.as_slice() else {
            return Response::err_with(["ARGUMENT MISMATCH"]);
        };
        if self.registry.try_register(name, caller) {
            info!(conn = caller, name, "registered object");
            Response::ok()
        } else {
            Response::err_with(["ALREADY REGISTERED", name.as_str()])
        }
    }

    /// Deliver a bus-directed notification to every other live connection.
    fn broadcast(&self, mut request: Request, caller: ConnectionId) -> Response {
        request.tag = 0;
        let encoded = request.to_string();

        let writers = self.registry.other_writers(caller);
        let count = writers.len();
        for writer in writers {
            if let Err(err) = lock(&writer).write_message(&encoded) {
                // The receiver's own session loop handles its teardown.
                warn!(conn = caller, %err, "broadcast write failed");
            }
        }

        debug!(conn = caller, count, subject = %request.subject, "broadcast");
        Response::ok_with(["SENT".to_string(), count.to_string()])
    }

    fn handle_object(&self, mut request: Request, caller: ConnectionId) -> Response {
        let Some(target) = self.registry.lookup_object(&request.object) else {
            return Response::err_with(["NO SUCH OBJECT"]);
        };
        let Some(writer) = self.registry.writer(target) else {
            // The registration raced its connection's teardown.
            return Response::err_with(["NO SUCH OBJECT"]);
        };

        // Slot first, forward second: the target may answer before the
        // forwarding write even returns.
        let pending = if request.action == Action::Notify {
            None
        } else {
            match self.correlator.begin(caller, target) {
                Some(pending) => Some(pending),
                None => return Response::err_with([DELIVERY_FAILED]),
            }
        };

        request.tag = caller;
        let encoded = request.to_string();
        if let Err(err) = lock(&writer).write_message(&encoded) {
            warn!(conn = target, %err, "forward write failed");
            if let Some(pending) = pending {
                pending.cancel();
            }
            return Response::err_with([DELIVERY_FAILED]);
        }
        debug!(conn = caller, target, %encoded, "forwarded");

        match pending {
            None => Response::ok_with(["SENT"]),
            Some(pending) => {
                let mut response = pending.wait();
                response.tag = 0;
                response
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread;

    use xbus_proto::{MessageReader, MessageWriter};
    use xbus_transport::BusStream;

    use super::*;

    struct Harness {
        registry: Arc<Registry>,
        correlator: Arc<Correlator>,
        router: Arc<Router>,
    }

    impl Harness {
        fn new() -> Self {
            let registry = Arc::new(Registry::new());
            let correlator = Arc::new(Correlator::new(Arc::clone(&registry), None));
            let router = Arc::new(Router::new(
                Arc::clone(&registry),
                Arc::clone(&correlator),
            ));
            Self {
                registry,
                correlator,
                router,
            }
        }

        /// Create a session and hand back the peer end of its stream.
        fn session(&self, id: ConnectionId) -> MessageReader<BusStream> {
            let (ours, theirs) = BusStream::pair().unwrap();
            self.registry
                .create_session(id, Arc::new(Mutex::new(MessageWriter::new(ours))));
            MessageReader::new(theirs)
        }
    }

    fn request(encoded: &str) -> Request {
        Request::parse(encoded).unwrap()
    }

    #[test]
    fn close_suppresses_the_reply() {
        let harness = Harness::new();
        assert!(harness.router.handle(request("+close"), 1).is_none());
    }

    #[test]
    fn register_and_list() {
        let harness = Harness::new();
        let reply = harness.router.handle(request("+register:calc"), 1).unwrap();
        assert!(reply.is_ok());

        let reply = harness
            .router
            .handle(request("+register:calc"), 2)
            .unwrap();
        assert_eq!(reply.rest, vec!["ALREADY REGISTERED", "calc"]);

        let reply = harness.router.handle(request("+list"), 2).unwrap();
        assert_eq!(reply.rest, vec!["calc"]);
    }

    #[test]
    fn register_requires_exactly_one_argument() {
        let harness = Harness::new();
        let reply = harness.router.handle(request("+register"), 1).unwrap();
        assert_eq!(reply.rest, vec!["ARGUMENT MISMATCH"]);

        let reply = harness
            .router
            .handle(request("+register:a,b"), 1)
            .unwrap();
        assert_eq!(reply.rest, vec!["ARGUMENT MISMATCH"]);
    }

    #[test]
    fn version_fd_and_unknowns() {
        let harness = Harness::new();

        let reply = harness.router.handle(request("+version"), 9).unwrap();
        assert_eq!(reply.rest, vec![PROTOCOL_VERSION]);

        let reply = harness.router.handle(request("+fd"), 9).unwrap();
        assert_eq!(reply.rest, vec!["9"]);

        let reply = harness.router.handle(request("+nonsense"), 9).unwrap();
        assert_eq!(reply.rest, vec!["UNKNOWN PROPERTY"]);

        let reply = harness.router.handle(request("-field?"), 9).unwrap();
        assert_eq!(reply.rest, vec!["UNKNOWN ACTION"]);
    }

    #[test]
    fn broadcast_reaches_every_other_session() {
        let harness = Harness::new();
        let mut receiver_a = harness.session(1);
        let mut receiver_b = harness.session(2);
        let _sender_session = harness.session(3);

        let reply = harness
            .router
            .handle(request("!ping:now#3"), 3)
            .unwrap();
        assert_eq!(reply.rest, vec!["SENT", "2"]);

        // Tag is stripped before fan-out.
        assert_eq!(receiver_a.next_message().unwrap().unwrap(), "!ping:now");
        assert_eq!(receiver_b.next_message().unwrap().unwrap(), "!ping:now");
    }

    #[test]
    fn object_call_forwards_tags_and_relays_reply() {
        let harness = Harness::new();
        let mut object_end = harness.session(5);
        assert!(harness.registry.try_register("calc", 5));

        let router = Arc::clone(&harness.router);
        let call = thread::spawn(move || router.handle(request("calc+add:2,3?"), 8).unwrap());

        // The object sees the forwarded request tagged with the caller's id.
        let forwarded = object_end.next_message().unwrap().unwrap();
        assert_eq!(forwarded, "calc+add:2,3?#8");

        // The session loop is not running here, so resolve the slot the way
        // it would: fulfill with the tagged response.
        let fulfilled = harness
            .correlator
            .fulfill(5, 8, xbus_proto::Response::parse("OK,5#8"));
        assert!(fulfilled);

        let reply = call.join().unwrap();
        assert!(reply.is_ok());
        assert_eq!(reply.rest, vec!["5"]);
        assert_eq!(reply.tag, 0);
    }

    #[test]
    fn object_notify_is_fire_and_forget() {
        let harness = Harness::new();
        let mut object_end = harness.session(5);
        assert!(harness.registry.try_register("calc", 5));

        let reply = harness
            .router
            .handle(request("calc!refresh"), 8)
            .unwrap();
        assert_eq!(reply.rest, vec!["SENT"]);
        assert_eq!(
            object_end.next_message().unwrap().unwrap(),
            "calc!refresh#8"
        );
    }

    #[test]
    fn unknown_object_is_rejected_immediately() {
        let harness = Harness::new();
        let reply = harness.router.handle(request("ghost+poke"), 1).unwrap();
        assert_eq!(reply.rest, vec!["NO SUCH OBJECT"]);
    }

    #[test]
    fn forward_write_failure_fails_the_call() {
        let harness = Harness::new();
        // Session whose peer end is already closed: writes will fail.
        let (ours, theirs) = BusStream::pair().unwrap();
        drop(theirs);
        harness
            .registry
            .create_session(5, Arc::new(Mutex::new(MessageWriter::new(ours))));
        assert!(harness.registry.try_register("calc", 5));

        let reply = harness.router.handle(request("calc+poke"), 8).unwrap();
        assert_eq!(reply.rest, vec![DELIVERY_FAILED]);
        assert!(!harness.registry.has_slots(5));
    }
}
