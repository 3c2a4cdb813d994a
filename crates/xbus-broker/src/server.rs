use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};
use xbus_transport::{BusListener, DEFAULT_SOCKET_PATH};

use crate::correlator::Correlator;
use crate::error::Result;
use crate::registry::Registry;
use crate::router::Router;
use crate::{session, ConnectionId};

/// Broker runtime configuration.
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    /// Socket path to bind.
    pub socket_path: PathBuf,
    /// Upper bound on how long a forwarded call may wait for its reply
    /// before resolving to a delivery error. `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            call_timeout: None,
        }
    }
}

/// The bus broker: owns the listening socket and the shared state, and runs
/// one worker thread per accepted connection.
pub struct Broker {
    listener: BusListener,
    registry: Arc<Registry>,
    correlator: Arc<Correlator>,
    router: Arc<Router>,
    next_id: AtomicU64,
    running: Arc<AtomicBool>,
}

impl Broker {
    /// Bind the bus socket and set up the shared state.
    pub fn bind(config: BrokerConfig) -> Result<Self> {
        let listener = BusListener::bind(&config.socket_path)?;
        let registry = Arc::new(Registry::new());
        let correlator = Arc::new(Correlator::new(
            Arc::clone(&registry),
            config.call_timeout,
        ));
        let router = Arc::new(Router::new(
            Arc::clone(&registry),
            Arc::clone(&correlator),
        ));
        Ok(Self {
            listener,
            registry,
            correlator,
            router,
            // Connection ids start at 1: 0 is reserved for "tag unset", and
            // a counter (unlike raw fds) can never alias a dead connection.
            next_id: AtomicU64::new(1),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Flag that stops the accept loop when cleared.
    ///
    /// The loop only observes the flag between accepts; making one dummy
    /// connection after clearing it wakes a blocked accept.
    pub fn running_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// The path the broker is listening on.
    pub fn path(&self) -> &Path {
        self.listener.path()
    }

    /// Accept connections until the running flag is cleared.
    ///
    /// Each accepted connection gets a fresh id and its own session worker;
    /// a failed accept is logged and does not stop the broker.
    pub fn run(self) -> Result<()> {
        while self.running.load(Ordering::SeqCst) {
            let stream = match self.listener.accept() {
                Ok(stream) => stream,
                Err(err) => {
                    if !self.running.load(Ordering::SeqCst) {
                        break;
                    }
                    warn!(%err, "accept failed");
                    continue;
                }
            };

            let id: ConnectionId = self.next_id.fetch_add(1, Ordering::Relaxed);
            match stream.peer_credentials() {
                Some((uid, gid, pid)) => info!(conn = id, uid, gid, pid, "new connection"),
                None => info!(conn = id, "new connection"),
            }

            let registry = Arc::clone(&self.registry);
            let correlator = Arc::clone(&self.correlator);
            let router = Arc::clone(&self.router);
            let spawned = thread::Builder::new()
                .name(format!("xbus-conn-{id}"))
                .spawn(move || session::run(id, stream, registry, correlator, router));
            if let Err(err) = spawned {
                warn!(conn = id, %err, "failed to spawn session worker");
            }
        }

        info!("broker stopped");
        Ok(())
    }
}
