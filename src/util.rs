//! Utilities.

use std::borrow::Cow;

use chrono::NaiveDateTime;

/// Layout of timestamps in `mm* -Y` output, after [`unescape`].
pub const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Decodes the percent escapes `mm* -Y` output uses for characters that would
/// otherwise clash with the format, i.e. `/`, `:` and `%` itself.
#[must_use]
pub fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('%') {
        return Cow::Borrowed(s);
    }

    // %25 last, otherwise "%252F" would turn into "/"
    Cow::Owned(
        s.replace("%2F", "/")
            .replace("%3A", ":")
            .replace("%25", "%"),
    )
}

/// Encodes a value the way `mm* -Y` output does. Inverse of [`unescape`].
#[must_use]
pub fn escape(s: &str) -> String {
    s.replace('%', "%25").replace('/', "%2F").replace(':', "%3A")
}

/// Parses an escaped `-Y` timestamp, e.g. `Thu Feb 16 12%3A47%3A18 2017`.
///
/// # Errors
///
/// Returns an error if the unescaped value does not match
/// [`TIMESTAMP_FORMAT`].
pub fn parse_timestamp(s: &str) -> chrono::ParseResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&unescape(s), TIMESTAMP_FORMAT)
}
