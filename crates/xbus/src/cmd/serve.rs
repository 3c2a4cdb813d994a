use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Duration;

use xbus_broker::{Broker, BrokerConfig};
use xbus_transport::BusStream;

use crate::cmd::ServeArgs;
use crate::exit::{broker_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};

pub fn run(args: ServeArgs, socket: &Path) -> CliResult<i32> {
    let call_timeout = args
        .call_timeout
        .as_deref()
        .map(parse_duration)
        .transpose()?;

    let broker = Broker::bind(BrokerConfig {
        socket_path: socket.to_path_buf(),
        call_timeout,
    })
    .map_err(|err| broker_error("bind failed", err))?;

    let running = broker.running_handle();
    let path = broker.path().to_path_buf();
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
        // The accept loop only sees the flag between accepts; one throwaway
        // connection wakes it up.
        let _ = BusStream::connect(&path);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;

    broker
        .run()
        .map_err(|err| broker_error("broker failed", err))?;
    Ok(SUCCESS)
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("bad").is_err());
    }
}
