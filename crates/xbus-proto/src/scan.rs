//! Shared scanning helpers for the two text encodings.

use tracing::error;

/// Split a comma-separated list into its items.
///
/// An empty input yields a single empty item: the encodings treat a bare
/// separator (`:` or `,` with nothing after it) as "one empty argument",
/// never as "no arguments".
pub(crate) fn split_list(input: &str) -> Vec<String> {
    input.split(',').map(str::to_string).collect()
}

/// Parse the digit run at the start of `input` as a correlation tag.
///
/// A missing or unparseable run logs an error and yields 0 (tag unset);
/// tag problems never fail the surrounding message parse. Trailing
/// non-digit bytes are ignored.
pub(crate) fn parse_tag(input: &str) -> u64 {
    let end = input
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(input.len());
    match input[..end].parse() {
        Ok(tag) => tag,
        Err(_) => {
            error!(input, "malformed correlation tag, defaulting to 0");
            0
        }
    }
}
