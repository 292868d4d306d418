//! `application/x-www-form-urlencoded` grammar, shared by the query string
//! and urlencoded form bodies.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::http_helpers::StringValues;

/// Parse a raw query string into a [`StringValues`] collection.
///
/// A leading `?` is ignored. Pairs are separated by `&` and split on the
/// first `=` only. Keys and values are percent-decoded with `+` read as a
/// space. A segment without `=` yields the key with an empty value, and
/// duplicate keys accumulate in encounter order. Segments whose key decodes
/// to the empty string, or whose percent-encoding is malformed, are skipped.
///
/// # Examples
///
/// ```
/// use toni_http::parsers::parse_query;
///
/// let query = parse_query("?a=1&b=two+words&a=3");
/// assert_eq!(query.get_all("a"), ["1", "3"]);
/// assert_eq!(query.get("b"), Some("two words"));
/// ```
pub fn parse_query(raw: &str) -> StringValues {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    parse_urlencoded(raw.as_bytes(), usize::MAX)
}

/// Parse urlencoded bytes, keeping at most `max_fields` pairs.
pub(crate) fn parse_urlencoded(bytes: &[u8], max_fields: usize) -> StringValues {
    let mut values = StringValues::new();
    let mut kept = 0usize;

    for segment in bytes.split(|b| *b == b'&') {
        if segment.is_empty() {
            continue;
        }

        let Ok(segment) = std::str::from_utf8(segment) else {
            debug!("skipping urlencoded segment that is not valid UTF-8");
            continue;
        };

        let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
        let (Some(key), Some(value)) = (decode_component(key), decode_component(value)) else {
            debug!(segment, "skipping urlencoded segment with malformed percent-encoding");
            continue;
        };

        if key.is_empty() {
            continue;
        }

        if kept == max_fields {
            debug!(max_fields, "dropping urlencoded fields past the limit");
            break;
        }
        kept += 1;

        values.append(key, value);
    }

    values
}

/// Percent-decode one key or value, reading `+` as a space.
///
/// Returns `None` for a `%` not followed by two hex digits, or when the
/// decoded bytes are not UTF-8.
fn decode_component(raw: &str) -> Option<String> {
    if !is_well_formed(raw.as_bytes()) {
        return None;
    }

    let spaced: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };

    percent_decode_str(&spaced)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}

fn is_well_formed(bytes: &[u8]) -> bool {
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len()
                || !bytes[i + 1].is_ascii_hexdigit()
                || !bytes[i + 2].is_ascii_hexdigit()
            {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}
