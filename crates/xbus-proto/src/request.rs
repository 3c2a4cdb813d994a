use std::fmt;

use crate::error::{ProtoError, Result};
use crate::scan::{parse_tag, split_list};

/// The three kinds of operation a request can name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Mutable named value on an object: get (query) or set.
    Field,
    /// Callable or queryable operation on an object.
    Property,
    /// Fire-and-forget message; never answered.
    Notify,
}

impl Action {
    /// The wire character that introduces the subject.
    pub fn as_char(self) -> char {
        match self {
            Action::Field => '-',
            Action::Property => '+',
            Action::Notify => '!',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            '-' => Some(Action::Field),
            '+' => Some(Action::Property),
            '!' => Some(Action::Notify),
            _ => None,
        }
    }

    pub(crate) fn is_action_char(c: char) -> bool {
        matches!(c, '-' | '+' | '!')
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A decoded request.
///
/// Wire form: `[object] action subject[:arg,arg,...|=value][&][?][#tag]`.
/// An empty `object` addresses the bus itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub object: String,
    pub action: Action,
    pub subject: String,
    /// Order-significant argument list; may be empty.
    pub args: Vec<String>,
    /// Property: read instead of invoke. Field: get instead of set.
    pub is_query: bool,
    /// Parse-level flag only; routing does not act on it.
    pub is_async: bool,
    /// Correlation id, 0 means unset.
    pub tag: u64,
}

impl Request {
    pub fn new(action: Action, object: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            action,
            subject: subject.into(),
            args: Vec::new(),
            is_query: false,
            is_async: false,
            tag: 0,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn query(mut self) -> Self {
        self.is_query = true;
        self
    }

    /// Decode a request with a left-to-right scan.
    ///
    /// Fails iff no single recognized action character is found or no subject
    /// follows it. Unconsumed trailing bytes are ignored. A malformed `#tag`
    /// logs and leaves the tag at 0; it does not fail the parse.
    pub fn parse(input: &str) -> Result<Self> {
        // Object: everything before the first action character.
        let action_at = input
            .find(Action::is_action_char)
            .ok_or(ProtoError::MissingAction)?;
        let object = input[..action_at].to_string();
        let mut rest = &input[action_at..];

        // Action: the whole run of non-word characters is consumed, so a run
        // longer than one character never matches a recognized action.
        let run_len = rest
            .find(|c: char| c.is_ascii_alphanumeric() || c == '_')
            .unwrap_or(rest.len());
        let mut run = rest[..run_len].chars();
        let action = match (run.next().and_then(Action::from_char), run.next()) {
            (Some(action), None) => action,
            _ => return Err(ProtoError::UnknownAction),
        };
        rest = &rest[run_len..];

        // Subject: the following word run.
        let subject_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(rest.len());
        if subject_len == 0 {
            return Err(ProtoError::MissingSubject);
        }
        let subject = rest[..subject_len].to_string();
        rest = &rest[subject_len..];

        let mut args = Vec::new();
        if rest.starts_with(':') || rest.starts_with('=') {
            rest = &rest[1..];
            let list_len = rest
                .find(|c: char| matches!(c, '?' | '&' | '#'))
                .unwrap_or(rest.len());
            args = split_list(&rest[..list_len]);
            rest = &rest[list_len..];
        }

        let is_async = rest.starts_with('&');
        if is_async {
            rest = &rest[1..];
        }
        let is_query = rest.starts_with('?');
        if is_query {
            rest = &rest[1..];
        }

        let mut tag = 0;
        if let Some(tag_str) = rest.strip_prefix('#') {
            tag = parse_tag(tag_str);
        }

        Ok(Self {
            object,
            action,
            subject,
            args,
            is_query,
            is_async,
            tag,
        })
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.object, self.action, self.subject)?;
        if !self.args.is_empty() {
            let separator = if self.action == Action::Field { '=' } else { ':' };
            write!(f, "{separator}{}", self.args.join(","))?;
        }
        if self.is_async {
            f.write_str("&")?;
        }
        if self.is_query {
            f.write_str("?")?;
        }
        if self.tag != 0 {
            write!(f, "#{}", self.tag)?;
        }
        Ok(())
    }
}

/// Whether `input` decodes to a valid request.
///
/// This is the discriminator used to tell requests apart from responses
/// arriving on the same stream.
pub fn is_request(input: &str) -> bool {
    Request::parse(input).is_ok()
}
