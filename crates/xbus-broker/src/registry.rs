use std::collections::HashMap;
use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};
use xbus_proto::{MessageWriter, Response};
use xbus_transport::BusStream;

use crate::{lock, ConnectionId};

/// Write half of a connection, shared between its own session loop and any
/// router worker that forwards messages to it.
pub type SharedWriter = Arc<Mutex<MessageWriter<BusStream>>>;

struct SessionState {
    writer: SharedWriter,
    /// Pending correlation slots, keyed by the waiting caller's connection
    /// id. A slot is resolved by a response on *this* connection whose tag
    /// matches the key. Dropping the state releases every waiter.
    slots: HashMap<ConnectionId, SyncSender<Response>>,
}

/// Shared broker state: which names are registered to which connection, and
/// which callers are awaiting replies from which connection.
///
/// Constructed once at startup and handed to every connection worker; all
/// operations are internally synchronized and check-then-act sequences are
/// atomic under the respective lock.
pub struct Registry {
    objects: Mutex<HashMap<String, ConnectionId>>,
    sessions: Mutex<HashMap<ConnectionId, SessionState>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Claim `name` for `id`. Returns false without mutating if the name is
    /// already taken; an existing claim is never overwritten.
    pub fn try_register(&self, name: &str, id: ConnectionId) -> bool {
        let mut objects = lock(&self.objects);
        if objects.contains_key(name) {
            return false;
        }
        objects.insert(name.to_string(), id);
        true
    }

    pub fn lookup_object(&self, name: &str) -> Option<ConnectionId> {
        lock(&self.objects).get(name).copied()
    }

    /// Snapshot of the registered names, sorted for stable output.
    pub fn list_objects(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.objects).keys().cloned().collect();
        names.sort();
        names
    }

    pub fn create_session(&self, id: ConnectionId, writer: SharedWriter) {
        let previous = lock(&self.sessions).insert(
            id,
            SessionState {
                writer,
                slots: HashMap::new(),
            },
        );
        if previous.is_some() {
            warn!(conn = id, "session id reused while still registered");
        }
    }

    /// Tear down everything `id` owns: any object claims pointing at it
    /// (normally at most one, more are tolerated) and its session. Dropping
    /// the session's slots releases every caller still waiting on it.
    pub fn remove_connection(&self, id: ConnectionId) {
        let mut objects = lock(&self.objects);
        objects.retain(|name, owner| {
            if *owner == id {
                debug!(conn = id, name, "unregistering object");
                false
            } else {
                true
            }
        });
        drop(objects);

        lock(&self.sessions).remove(&id);
    }

    /// The shared writer for `id`'s connection, if it is still alive.
    pub fn writer(&self, id: ConnectionId) -> Option<SharedWriter> {
        lock(&self.sessions)
            .get(&id)
            .map(|session| Arc::clone(&session.writer))
    }

    /// Writers for every live connection except `exclude`, for broadcast.
    pub fn other_writers(&self, exclude: ConnectionId) -> Vec<SharedWriter> {
        lock(&self.sessions)
            .iter()
            .filter(|(id, _)| **id != exclude)
            .map(|(_, session)| Arc::clone(&session.writer))
            .collect()
    }

    /// Store a pending slot under `target`'s session, keyed by `waiter`.
    /// Returns false if the target's session is already gone.
    pub fn add_slot(
        &self,
        target: ConnectionId,
        waiter: ConnectionId,
        sender: SyncSender<Response>,
    ) -> bool {
        let mut sessions = lock(&self.sessions);
        let Some(session) = sessions.get_mut(&target) else {
            return false;
        };
        if session.slots.insert(waiter, sender).is_some() {
            warn!(
                conn = target,
                waiter, "replacing unresolved correlation slot"
            );
        }
        true
    }

    /// Remove and return the slot under `conn`'s session whose key is `tag`.
    pub fn take_slot(
        &self,
        conn: ConnectionId,
        tag: ConnectionId,
    ) -> Option<SyncSender<Response>> {
        lock(&self.sessions)
            .get_mut(&conn)
            .and_then(|session| session.slots.remove(&tag))
    }

    /// Whether `id`'s session has any outstanding correlation slots.
    pub fn has_slots(&self, id: ConnectionId) -> bool {
        lock(&self.sessions)
            .get(&id)
            .is_some_and(|session| !session.slots.is_empty())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
