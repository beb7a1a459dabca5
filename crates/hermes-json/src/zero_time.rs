//! Removal of zero-instant timestamp fields.
//!
//! Typed resolvers that embed a timestamp struct serialize an unset value as
//! `"0001-01-01T00:00:00Z"`. Those fields are noise to the gateway, so they
//! are cut out of the serialized document before it is returned.
//!
//! The pass works on the compact encoding directly. It never re-parses the
//! document, so key order and number formatting survive untouched.

/// RFC 3339 rendering of the zero instant, 0001-01-01 00:00:00 UTC.
pub const ZERO_INSTANT: &str = "0001-01-01T00:00:00Z";

const NEEDLE: &[u8] = b"\":\"0001-01-01T00:00:00Z\"";

/// Removes every `"key":"0001-01-01T00:00:00Z"` member from `doc`.
///
/// The separating comma before the member is removed with it, or the one
/// after it when the member comes first. A member that was alone leaves an
/// empty object behind; the parent is not touched. Running the pass twice
/// gives the same result as running it once.
///
/// ```
/// use hermes_json::strip_zero_timestamps;
///
/// let out = strip_zero_timestamps(br#"{"id":1,"deletedAt":"0001-01-01T00:00:00Z"}"#);
/// assert_eq!(out, br#"{"id":1}"#);
/// ```
pub fn strip_zero_timestamps(doc: &[u8]) -> Vec<u8> {
    let mut buf = doc.to_vec();
    let mut from = 0;

    while let Some(found) = find(&buf[from..], NEEDLE).map(|pos| pos + from) {
        // The needle's first quote must close a key, not sit escaped inside a string.
        if is_escaped(&buf, found) {
            from = found + 1;
            continue;
        }
        let Some(key_start) = opening_quote(&buf, found) else {
            from = found + 1;
            continue;
        };

        let mut start = key_start;
        let mut end = found + NEEDLE.len();
        if let Some(comma) = comma_before(&buf, start) {
            start = comma;
        } else if let Some(comma) = comma_after(&buf, end) {
            end = comma + 1;
        }

        buf.drain(start..end);
        from = 0;
    }
    buf
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

// A quote is escaped when an odd number of backslashes precede it.
fn is_escaped(buf: &[u8], quote: usize) -> bool {
    buf[..quote]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count()
        % 2
        == 1
}

// Nearest unescaped quote before `closing`.
fn opening_quote(buf: &[u8], closing: usize) -> Option<usize> {
    let mut pos = closing;
    while pos > 0 {
        pos -= 1;
        if buf[pos] == b'"' && !is_escaped(buf, pos) {
            return Some(pos);
        }
    }
    None
}

fn comma_before(buf: &[u8], start: usize) -> Option<usize> {
    buf[..start]
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .filter(|&pos| buf[pos] == b',')
}

fn comma_after(buf: &[u8], end: usize) -> Option<usize> {
    buf[end..]
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|offset| end + offset)
        .filter(|&pos| buf[pos] == b',')
}
