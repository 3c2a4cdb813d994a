use std::fmt;

use crate::scan::{parse_tag, split_list};

/// Status reported when an operation succeeded.
pub const STATUS_OK: &str = "OK";
/// Status reported when an operation failed; `rest` carries the reason.
pub const STATUS_ERR: &str = "ERR";

/// A decoded response.
///
/// Wire form: `status[,rest0,rest1,...][#tag]`. Every string decodes to some
/// response, so classification on a stream checks for a request first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Response {
    pub status: String,
    /// Payload on success, reason code(s) on error.
    pub rest: Vec<String>,
    /// Echo of the request's correlation tag; cleared before final delivery.
    pub tag: u64,
}

impl Response {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            rest: Vec::new(),
            tag: 0,
        }
    }

    pub fn ok() -> Self {
        Self::new(STATUS_OK)
    }

    pub fn ok_with<I, S>(rest: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status: STATUS_OK.to_string(),
            rest: rest.into_iter().map(Into::into).collect(),
            tag: 0,
        }
    }

    pub fn err_with<I, S>(rest: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status: STATUS_ERR.to_string(),
            rest: rest.into_iter().map(Into::into).collect(),
            tag: 0,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Decode a response. Never fails; absent parts stay at their defaults.
    pub fn parse(input: &str) -> Self {
        let status_len = input
            .find(|c: char| matches!(c, ',' | '#'))
            .unwrap_or(input.len());
        let status = input[..status_len].to_string();
        let mut rest_input = &input[status_len..];

        let mut rest = Vec::new();
        if rest_input.starts_with(',') {
            rest_input = &rest_input[1..];
            let list_len = rest_input.find('#').unwrap_or(rest_input.len());
            rest = split_list(&rest_input[..list_len]);
            rest_input = &rest_input[list_len..];
        }

        let mut tag = 0;
        if let Some(tag_str) = rest_input.strip_prefix('#') {
            tag = parse_tag(tag_str);
        }

        Self { status, rest, tag }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status)?;
        for item in &self.rest {
            write!(f, ",{item}")?;
        }
        if self.tag != 0 {
            write!(f, "#{}", self.tag)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status_rest_and_tag() {
        let response = Response::parse("OK,5,ready#42");
        assert_eq!(response.status, "OK");
        assert_eq!(response.rest, vec!["5", "ready"]);
        assert_eq!(response.tag, 42);
    }

    #[test]
    fn parses_bare_status() {
        let response = Response::parse("ERR");
        assert_eq!(response.status, "ERR");
        assert!(response.rest.is_empty());
        assert_eq!(response.tag, 0);
    }

    #[test]
    fn parses_tag_without_rest() {
        let response = Response::parse("OK#7");
        assert_eq!(response.status, "OK");
        assert!(response.rest.is_empty());
        assert_eq!(response.tag, 7);
    }

    #[test]
    fn empty_rest_list_yields_one_empty_item() {
        let response = Response::parse("OK,");
        assert_eq!(response.rest, vec![""]);
    }

    #[test]
    fn round_trips_canonical_encodings() {
        for encoded in ["OK", "OK,5", "ERR,NO SUCH OBJECT", "OK,a,b,c#12", "OK#3"] {
            assert_eq!(Response::parse(encoded).to_string(), encoded);
        }
    }

    #[test]
    fn constructors_set_conventional_statuses() {
        assert!(Response::ok().is_ok());
        assert_eq!(Response::ok_with(["5"]).to_string(), "OK,5");
        assert_eq!(
            Response::err_with(["ALREADY REGISTERED", "calc"]).to_string(),
            "ERR,ALREADY REGISTERED,calc"
        );
    }

    #[test]
    fn malformed_tag_defaults_to_zero() {
        let response = Response::parse("OK,5#bogus");
        assert_eq!(response.tag, 0);
    }
}
