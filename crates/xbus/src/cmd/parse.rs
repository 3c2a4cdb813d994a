use xbus_proto::{Request, Response};

use crate::cmd::{ParseReqArgs, ParseResArgs};
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};

pub fn run_request(args: ParseReqArgs) -> CliResult<i32> {
    let request = Request::parse(&args.request)
        .map_err(|err| CliError::new(USAGE, format!("not a valid request: {err}")))?;

    let value = match args.what.as_str() {
        "object" => request.object,
        "action" => request.action.to_string(),
        "subject" => request.subject,
        // The original verb for the query flag was "request".
        "query" | "request" => u8::from(request.is_query).to_string(),
        "async" => u8::from(request.is_async).to_string(),
        "tag" => request.tag.to_string(),
        what => indexed(&request.args, what, "args")?,
    };

    println!("{value}");
    Ok(SUCCESS)
}

pub fn run_response(args: ParseResArgs) -> CliResult<i32> {
    let response = Response::parse(&args.response);

    let value = match args.what.as_str() {
        "status" => response.status,
        "tag" => response.tag.to_string(),
        what => indexed(&response.rest, what, "rest")?,
    };

    println!("{value}");
    Ok(SUCCESS)
}

fn indexed(items: &[String], what: &str, which: &str) -> CliResult<String> {
    let index: usize = what.parse().map_err(|_| {
        CliError::new(
            USAGE,
            format!("WHAT must be a known field name or a {which} index, got '{what}'"),
        )
    })?;
    items.get(index).cloned().ok_or_else(|| {
        CliError::new(
            USAGE,
            format!("{which} index {index} out of bounds ({} items)", items.len()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req_args(what: &str, request: &str) -> ParseReqArgs {
        ParseReqArgs {
            what: what.to_string(),
            request: request.to_string(),
        }
    }

    fn res_args(what: &str, response: &str) -> ParseResArgs {
        ParseResArgs {
            what: what.to_string(),
            response: response.to_string(),
        }
    }

    #[test]
    fn request_extractors_accept_known_fields() {
        assert_eq!(run_request(req_args("object", "calc+add:2,3?")).unwrap(), 0);
        assert_eq!(run_request(req_args("action", "calc+add")).unwrap(), 0);
        assert_eq!(run_request(req_args("query", "calc+add?")).unwrap(), 0);
        assert_eq!(run_request(req_args("1", "calc+add:2,3")).unwrap(), 0);
    }

    #[test]
    fn request_extractor_rejects_invalid_input() {
        assert_eq!(run_request(req_args("object", "garbage")).unwrap_err().code, USAGE);
        assert_eq!(run_request(req_args("wat", "calc+add")).unwrap_err().code, USAGE);
        assert_eq!(run_request(req_args("7", "calc+add:2")).unwrap_err().code, USAGE);
    }

    #[test]
    fn response_extractors_accept_status_and_indices() {
        assert_eq!(run_response(res_args("status", "OK,5")).unwrap(), 0);
        assert_eq!(run_response(res_args("0", "OK,5")).unwrap(), 0);
        assert_eq!(run_response(res_args("3", "OK,5")).unwrap_err().code, USAGE);
    }
}
