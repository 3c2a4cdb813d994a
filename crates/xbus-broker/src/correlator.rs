use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use xbus_proto::Response;

use crate::registry::Registry;
use crate::ConnectionId;

/// Reason reported to a caller whose reply can no longer arrive: the target
/// disappeared mid-call, the forward write failed, or the call timed out.
pub const DELIVERY_FAILED: &str = "DELIVERY FAILED";

/// Matches responses arriving on one connection to callers blocked on
/// another.
///
/// Each in-flight call owns a single-assignment rendezvous: the caller's
/// worker blocks on the receiving end while the target's session loop
/// resolves the sending end when a response with the matching tag arrives.
pub struct Correlator {
    registry: Arc<Registry>,
    call_timeout: Option<Duration>,
}

impl Correlator {
    pub fn new(registry: Arc<Registry>, call_timeout: Option<Duration>) -> Self {
        Self {
            registry,
            call_timeout,
        }
    }

    /// Register a slot for a reply from `target` addressed to `caller`.
    ///
    /// Must happen before the forwarded request is written, so an answer
    /// racing the registration cannot be dropped. Returns `None` when the
    /// target's session is already gone.
    pub fn begin(&self, caller: ConnectionId, target: ConnectionId) -> Option<PendingReply<'_>> {
        let (sender, receiver) = sync_channel(1);
        if !self.registry.add_slot(target, caller, sender) {
            debug!(caller, target, "target session gone before forward");
            return None;
        }
        Some(PendingReply {
            correlator: self,
            caller,
            target,
            receiver,
        })
    }

    /// Resolve the slot under `conn`'s session whose key equals `tag`.
    ///
    /// Returns false if no slot matches; the response is then discarded by
    /// the caller, never requeued as a fresh request. Each slot resolves at
    /// most once: the first matching response consumes it.
    pub fn fulfill(&self, conn: ConnectionId, tag: ConnectionId, response: Response) -> bool {
        match self.registry.take_slot(conn, tag) {
            Some(sender) => {
                if sender.send(response).is_err() {
                    warn!(conn, tag, "waiter gone before reply delivery");
                }
                true
            }
            None => false,
        }
    }
}

/// A registered correlation slot whose reply has not arrived yet.
pub struct PendingReply<'a> {
    correlator: &'a Correlator,
    caller: ConnectionId,
    target: ConnectionId,
    receiver: Receiver<Response>,
}

impl PendingReply<'_> {
    /// Block until the reply arrives or can no longer arrive.
    ///
    /// Resolves to `ERR DELIVERY FAILED` when the target's session is torn
    /// down while waiting, or when the configured call timeout expires.
    pub fn wait(self) -> Response {
        let outcome = match self.correlator.call_timeout {
            Some(timeout) => self.receiver.recv_timeout(timeout),
            None => self.receiver.recv().map_err(RecvTimeoutError::from),
        };

        match outcome {
            Ok(response) => response,
            Err(RecvTimeoutError::Disconnected) => {
                debug!(
                    caller = self.caller,
                    target = self.target,
                    "target connection gone, failing call"
                );
                Response::err_with([DELIVERY_FAILED])
            }
            Err(RecvTimeoutError::Timeout) => {
                // Withdraw the slot, then drain a reply that may have been
                // resolved concurrently with the expiry.
                self.correlator
                    .registry
                    .take_slot(self.target, self.caller);
                match self.receiver.try_recv() {
                    Ok(response) => response,
                    Err(_) => {
                        warn!(
                            caller = self.caller,
                            target = self.target,
                            "call timed out, failing call"
                        );
                        Response::err_with([DELIVERY_FAILED])
                    }
                }
            }
        }
    }

    /// Withdraw the slot without waiting (the forward write failed, so no
    /// reply can come).
    pub fn cancel(self) {
        self.correlator
            .registry
            .take_slot(self.target, self.caller);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use xbus_proto::MessageWriter;
    use xbus_transport::BusStream;

    use super::*;

    fn registry_with_session(id: ConnectionId) -> Arc<Registry> {
        let registry = Arc::new(Registry::new());
        let (left, right) = BusStream::pair().unwrap();
        std::mem::forget(right);
        registry.create_session(id, Arc::new(Mutex::new(MessageWriter::new(left))));
        registry
    }

    #[test]
    fn reply_reaches_the_waiting_caller() {
        let registry = registry_with_session(7);
        let correlator = Arc::new(Correlator::new(Arc::clone(&registry), None));

        let pending = correlator.begin(3, 7).unwrap();

        let fulfiller = Arc::clone(&correlator);
        let handle = thread::spawn(move || {
            assert!(fulfiller.fulfill(7, 3, Response::ok_with(["5"])));
        });

        let response = pending.wait();
        assert_eq!(response.rest, vec!["5"]);
        handle.join().unwrap();
        assert!(!registry.has_slots(7));
    }

    #[test]
    fn begin_fails_when_target_session_is_gone() {
        let registry = Arc::new(Registry::new());
        let correlator = Correlator::new(registry, None);
        assert!(correlator.begin(3, 7).is_none());
    }

    #[test]
    fn teardown_releases_the_waiter_with_delivery_error() {
        let registry = registry_with_session(7);
        let correlator = Correlator::new(Arc::clone(&registry), None);

        let pending = correlator.begin(3, 7).unwrap();
        let teardown_registry = Arc::clone(&registry);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            teardown_registry.remove_connection(7);
        });

        let response = pending.wait();
        assert_eq!(response.rest, vec![DELIVERY_FAILED]);
        handle.join().unwrap();
    }

    #[test]
    fn timeout_resolves_to_delivery_error_and_withdraws_slot() {
        let registry = registry_with_session(7);
        let correlator =
            Correlator::new(Arc::clone(&registry), Some(Duration::from_millis(30)));

        let pending = correlator.begin(3, 7).unwrap();
        let response = pending.wait();
        assert_eq!(response.status, "ERR");
        assert_eq!(response.rest, vec![DELIVERY_FAILED]);
        assert!(!registry.has_slots(7));
        // A late reply now finds nothing to match.
        assert!(!correlator.fulfill(7, 3, Response::ok()));
    }

    #[test]
    fn unmatched_fulfill_reports_false() {
        let registry = registry_with_session(7);
        let correlator = Correlator::new(registry, None);
        assert!(!correlator.fulfill(7, 99, Response::ok()));
    }

    #[test]
    fn cancel_withdraws_the_slot() {
        let registry = registry_with_session(7);
        let correlator = Correlator::new(Arc::clone(&registry), None);

        let pending = correlator.begin(3, 7).unwrap();
        assert!(registry.has_slots(7));
        pending.cancel();
        assert!(!registry.has_slots(7));
    }

    #[test]
    fn concurrent_calls_match_by_tag_not_arrival_order() {
        let registry = registry_with_session(7);
        let correlator = Arc::new(Correlator::new(Arc::clone(&registry), None));

        let mut waiters = Vec::new();
        for caller in 1..=3u64 {
            let correlator = Arc::clone(&correlator);
            waiters.push(thread::spawn(move || {
                let pending = correlator.begin(caller, 7).unwrap();
                (caller, pending.wait())
            }));
        }

        // Let every waiter register its slot, then answer in reverse order.
        thread::sleep(Duration::from_millis(50));
        for caller in (1..=3u64).rev() {
            assert!(correlator.fulfill(7, caller, Response::ok_with([caller.to_string()])));
        }

        for waiter in waiters {
            let (caller, response) = waiter.join().unwrap();
            assert_eq!(response.rest, vec![caller.to_string()]);
        }
    }
}
