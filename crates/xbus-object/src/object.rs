use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use tracing::{debug, info, warn};
use xbus_proto::{
    is_request, Action, MessageReader, MessageWriter, ProtoError, Request, Response,
    PROTOCOL_VERSION,
};
use xbus_transport::{BusStream, DEFAULT_SOCKET_PATH};

use crate::error::{ObjectError, Result};

/// Service-side configuration.
#[derive(Clone, Debug)]
pub struct ObjectConfig {
    /// Bus socket path to connect to.
    pub socket_path: PathBuf,
}

impl Default for ObjectConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
        }
    }
}

/// Handler for a property call or query.
pub type PropertyHandler = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

/// Handler for an incoming notification; notifications are never answered.
pub type NotifyHandler = Arc<dyn Fn(&Request) + Send + Sync>;

/// Asks a running [`ServiceObject`] loop to stop after its current read.
#[derive(Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A named service registered on the bus.
///
/// The skeleton is a capability table: fields are named mutable values,
/// properties map a subject to a handler, and dispatch is by lookup. After
/// [`connect`](Self::connect) (which confirms the protocol version and
/// registers the name), populate the tables and call [`run`](Self::run).
pub struct ServiceObject {
    name: String,
    reader: MessageReader<BusStream>,
    writer: Arc<Mutex<MessageWriter<BusStream>>>,
    fields: Arc<Mutex<HashMap<String, String>>>,
    properties: HashMap<String, PropertyHandler>,
    notify: Option<NotifyHandler>,
    running: Arc<AtomicBool>,
}

impl ServiceObject {
    /// Connect to the broker, confirm the protocol version, and register
    /// `name`.
    ///
    /// A version mismatch or a taken name is an error here; callers treat
    /// both as fatal for the service process.
    pub fn connect(name: impl Into<String>, config: &ObjectConfig) -> Result<Self> {
        let name = name.into();
        let stream = BusStream::connect(&config.socket_path)?;
        let write_half = stream.try_clone()?;
        let mut reader = MessageReader::new(stream);
        let mut writer = MessageWriter::new(write_half);

        check_version(&mut reader, &mut writer)?;
        register(&mut reader, &mut writer, &name)?;
        info!(name, "object registered on the bus");

        Ok(Self {
            name,
            reader,
            writer: Arc::new(Mutex::new(writer)),
            fields: Arc::new(Mutex::new(HashMap::new())),
            properties: HashMap::new(),
            notify: None,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a named mutable value, reachable with field get/set requests.
    pub fn add_field(&mut self, name: impl Into<String>, initial: impl Into<String>) {
        lock(&self.fields).insert(name.into(), initial.into());
    }

    /// Add a named property handler, reachable with property call/query
    /// requests.
    pub fn add_property(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&Request) -> Response + Send + Sync + 'static,
    ) {
        self.properties.insert(name.into(), Arc::new(handler));
    }

    /// Set the callback run for incoming notifications.
    pub fn on_notify(&mut self, handler: impl Fn(&Request) + Send + Sync + 'static) {
        self.notify = Some(Arc::new(handler));
    }

    /// Handle for stopping the read loop from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.running))
    }

    /// Read and dispatch requests until the connection closes or
    /// [`StopHandle::stop`] is called.
    ///
    /// Each request runs on its own worker thread, so handlers may finish
    /// out of order; replies echo the request's tag, which is what keeps
    /// them matchable at the broker.
    pub fn run(&mut self) -> Result<()> {
        let dispatcher = Arc::new(Dispatcher {
            fields: Arc::clone(&self.fields),
            properties: self.properties.clone(),
            notify: self.notify.clone(),
        });

        self.running.store(true, Ordering::SeqCst);
        while self.running.load(Ordering::SeqCst) {
            let message = match self.reader.next_message() {
                Ok(Some(message)) => message,
                Ok(None) => {
                    debug!(name = %self.name, "bus closed the connection");
                    break;
                }
                // Per-message problems are logged and skipped; only real
                // transport failures end the loop.
                Err(err @ (ProtoError::Utf8(_) | ProtoError::MessageTooLong { .. })) => {
                    warn!(name = %self.name, %err, "discarding unreadable message");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let request = match Request::parse(&message) {
                Ok(request) => request,
                Err(err) => {
                    warn!(name = %self.name, %message, %err, "discarding invalid request");
                    continue;
                }
            };

            let dispatcher = Arc::clone(&dispatcher);
            let writer = Arc::clone(&self.writer);
            thread::spawn(move || {
                let Some(mut response) = dispatcher.dispatch(&request) else {
                    return;
                };
                response.tag = request.tag;
                let response = harden(response);
                if let Err(err) = lock(&writer).write_response(&response) {
                    warn!(%err, "reply write failed");
                }
            });
        }
        Ok(())
    }
}

/// The shared capability table a running object dispatches against.
struct Dispatcher {
    fields: Arc<Mutex<HashMap<String, String>>>,
    properties: HashMap<String, PropertyHandler>,
    notify: Option<NotifyHandler>,
}

impl Dispatcher {
    /// Dispatch one request; `None` means no reply is sent.
    fn dispatch(&self, request: &Request) -> Option<Response> {
        match request.action {
            Action::Property => Some(self.call_property(request)),
            Action::Field => Some(self.access_field(request)),
            Action::Notify => {
                if let Some(handler) = &self.notify {
                    handler(request);
                }
                None
            }
        }
    }

    fn call_property(&self, request: &Request) -> Response {
        match self.properties.get(&request.subject) {
            Some(handler) => handler(request),
            None => Response::err_with(["NO SUCH PROPERTY"]),
        }
    }

    fn access_field(&self, request: &Request) -> Response {
        let mut fields = lock(&self.fields);
        let Some(value) = fields.get_mut(&request.subject) else {
            return Response::err_with(["NO SUCH FIELD"]);
        };
        if request.is_query {
            return Response::ok_with([value.clone()]);
        }
        let [new_value] = request.args.as_slice() else {
            return Response::err_with(["ARGUMENT MISMATCH"]);
        };
        *value = new_value.clone();
        Response::ok()
    }
}

/// Replace a response whose status would itself decode as a request.
///
/// The request/response discriminator on a stream is "does it parse as a
/// request", so a status carrying an action character would be misrouted by
/// every receiver. Only the status matters: payload items are free to
/// contain action characters (`OK`/`ERR` in front keeps the whole encoding
/// unambiguous).
fn harden(response: Response) -> Response {
    if is_request(&response.status) {
        warn!(status = %response.status, "handler status decodes as a request, replacing");
        let mut replacement = Response::err_with(["BAD STATUS"]);
        replacement.tag = response.tag;
        return replacement;
    }
    response
}

fn check_version(
    reader: &mut MessageReader<BusStream>,
    writer: &mut MessageWriter<BusStream>,
) -> Result<()> {
    writer.write_request(&Request::new(Action::Property, "", "version").query())?;
    let message = reader.next_message()?.ok_or(ObjectError::Disconnected)?;
    let response = Response::parse(&message);

    if !response.is_ok() || response.rest.len() != 1 {
        let _ = writer.write_message("+close");
        return Err(ObjectError::Handshake(format!(
            "unexpected version reply '{message}'"
        )));
    }
    if response.rest[0] != PROTOCOL_VERSION {
        let _ = writer.write_message("+close");
        return Err(ObjectError::VersionMismatch {
            expected: PROTOCOL_VERSION.to_string(),
            actual: response.rest[0].clone(),
        });
    }
    Ok(())
}

fn register(
    reader: &mut MessageReader<BusStream>,
    writer: &mut MessageWriter<BusStream>,
    name: &str,
) -> Result<()> {
    writer.write_request(&Request::new(Action::Property, "", "register").with_args([name]))?;
    let message = reader.next_message()?.ok_or(ObjectError::Disconnected)?;
    let response = Response::parse(&message);

    if response.is_ok() {
        return Ok(());
    }
    if response.rest.first().map(String::as_str) == Some("ALREADY REGISTERED") {
        return Err(ObjectError::NameTaken(name.to_string()));
    }
    Err(ObjectError::Handshake(format!(
        "registration rejected: '{message}'"
    )))
}

/// Lock a mutex, recovering the data if a panicking holder poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
