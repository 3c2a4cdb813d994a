//! CLI tests that drive the real binary against a live broker.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use xbus_object::{ObjectConfig, ObjectError, ServiceObject};
use xbus_proto::Response;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/xbus-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn xbus(socket: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_xbus"))
        .arg("--socket")
        .arg(socket)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("xbus binary should run")
}

fn stdout_line(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

struct BrokerProcess(Child);

impl BrokerProcess {
    fn start(socket: &Path) -> Self {
        let child = Command::new(env!("CARGO_BIN_EXE_xbus"))
            .arg("--socket")
            .arg(socket)
            .arg("serve")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("broker process should start");

        let deadline = Instant::now() + Duration::from_secs(10);
        while !socket.exists() {
            assert!(Instant::now() < deadline, "broker socket never appeared");
            thread::sleep(Duration::from_millis(25));
        }
        Self(child)
    }
}

impl Drop for BrokerProcess {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn spawn_calc(socket: &Path) {
    let config = ObjectConfig {
        socket_path: socket.to_path_buf(),
    };
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut calc = loop {
        match ServiceObject::connect("calc", &config) {
            Ok(object) => break object,
            Err(ObjectError::Transport(err)) => {
                assert!(Instant::now() < deadline, "object connect timed out: {err}");
                thread::sleep(Duration::from_millis(25));
            }
            Err(err) => panic!("object connect failed: {err}"),
        }
    };
    calc.add_field("precision", "2");
    calc.add_property("add", |request| {
        let sum: i64 = request
            .args
            .iter()
            .filter_map(|arg| arg.parse::<i64>().ok())
            .sum();
        Response::ok_with([sum.to_string()])
    });
    thread::spawn(move || calc.run());
}

#[test]
fn version_runs_without_a_broker() {
    let dir = unique_temp_dir("version");
    let output = xbus(&dir.join("missing.sock"), &["version"]);
    assert!(output.status.success());
    assert!(stdout_line(&output).starts_with("xbus v"));
}

#[test]
fn parse_helpers_run_without_a_broker() {
    let dir = unique_temp_dir("parse");
    let socket = dir.join("missing.sock");

    let output = xbus(&socket, &["parse-req", "subject", "calc+add:2,3?"]);
    assert!(output.status.success());
    assert_eq!(stdout_line(&output), "add");

    let output = xbus(&socket, &["parse-req", "1", "calc+add:2,3"]);
    assert_eq!(stdout_line(&output), "3");

    let output = xbus(&socket, &["parse-res", "status", "OK,5"]);
    assert_eq!(stdout_line(&output), "OK");

    let output = xbus(&socket, &["parse-req", "object", "no request"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn end_to_end_command_surface() {
    let dir = unique_temp_dir("e2e");
    let socket = dir.join("bus.sock");
    let _broker = BrokerProcess::start(&socket);
    spawn_calc(&socket);

    // Wait for the registration to land.
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let output = xbus(&socket, &["--format", "plain", "list"]);
        if output.status.success() && stdout_line(&output) == "calc" {
            break;
        }
        assert!(Instant::now() < deadline, "calc never appeared in list");
        thread::sleep(Duration::from_millis(25));
    }

    let output = xbus(&socket, &["--format", "plain", "request", "calc", "add", "2,3"]);
    assert!(output.status.success());
    assert_eq!(stdout_line(&output), "OK,5");

    let output = xbus(&socket, &["--format", "plain", "get", "calc", "precision"]);
    assert_eq!(stdout_line(&output), "OK,2");

    let output = xbus(&socket, &["--format", "plain", "set", "calc", "precision", "4"]);
    assert_eq!(stdout_line(&output), "OK");
    let output = xbus(&socket, &["--format", "plain", "get", "calc", "precision"]);
    assert_eq!(stdout_line(&output), "OK,4");

    // Errors surface as ERR replies with a failure exit code.
    let output = xbus(&socket, &["--format", "plain", "call", "ghost", "poke"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_line(&output), "ERR,NO SUCH OBJECT");

    let output = xbus(&socket, &["--format", "json", "list"]);
    assert_eq!(stdout_line(&output), r#"{"objects":["calc"]}"#);

    let output = xbus(&socket, &["send", "+fd"]);
    assert!(output.status.success());
    assert!(stdout_line(&output).starts_with("OK,"));
}

#[test]
fn notify_round_trip_via_listen() {
    let dir = unique_temp_dir("listen");
    let socket = dir.join("bus.sock");
    let _broker = BrokerProcess::start(&socket);

    let listener_socket = socket.clone();
    let listener = thread::spawn(move || {
        xbus(&listener_socket, &["listen", "door"])
    });

    // The listener needs to be connected before the broadcast goes out;
    // retry until it reports the notification.
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let output = xbus(&socket, &["--format", "plain", "notify", "-", "door", "open"]);
        assert!(output.status.success());
        if listener.is_finished() {
            break;
        }
        assert!(Instant::now() < deadline, "listener never saw the notification");
        thread::sleep(Duration::from_millis(50));
    }

    let output = listener.join().expect("listener thread should finish");
    assert!(output.status.success());
    assert_eq!(stdout_line(&output), "!door:open");
}
