//! `Cookie` request header parsing.

use tracing::debug;

use crate::http_helpers::StringValues;

/// Parse a single `Cookie` header value.
///
/// See [`parse_cookie_headers`] for the rules.
pub fn parse_cookies(header: &str) -> StringValues {
    parse_cookie_headers([header])
}

/// Parse every `Cookie` header line of a request as one logical list.
///
/// Pairs are separated by `;`, whitespace around names and values is
/// trimmed, and one pair of surrounding double quotes is stripped from the
/// value. Values are not percent-decoded. When a name repeats, the last
/// value wins. Segments without `=` or with an empty name are skipped.
///
/// # Examples
///
/// ```
/// use toni_http::parsers::parse_cookie_headers;
///
/// let cookies = parse_cookie_headers(["a=1; b=2", "a=3"]);
/// assert_eq!(cookies.get("a"), Some("3"));
/// assert_eq!(cookies.get("b"), Some("2"));
/// ```
pub fn parse_cookie_headers<I, S>(headers: I) -> StringValues
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cookies = StringValues::new();

    for line in headers {
        for segment in line.as_ref().split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let Some((name, value)) = segment.split_once('=') else {
                debug!(segment, "skipping cookie segment without '='");
                continue;
            };

            let name = name.trim();
            if name.is_empty() {
                debug!(segment, "skipping cookie segment with empty name");
                continue;
            }

            cookies.replace(name.to_string(), unquote(value.trim()).to_string());
        }
    }

    cookies
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
