//! Parsers behind the request's derived views.
//!
//! `parse_query` and `parse_cookies` are pure functions over already
//! buffered strings. `read_form` is the only one that touches the body
//! stream and the only one that suspends.

mod cookies;
mod form;
mod multipart;
mod query;

pub use cookies::{parse_cookie_headers, parse_cookies};
pub use form::{FormEncoding, MULTIPART_FORM_DATA, URLENCODED, is_form_content_type, read_form};
pub use query::parse_query;
