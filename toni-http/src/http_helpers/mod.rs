mod multi_map;

#[path = "body.struct.rs"]
mod body;
pub use self::body::Body;

#[path = "headers.struct.rs"]
mod headers;
pub use self::headers::Headers;

#[path = "string_values.struct.rs"]
mod string_values;
pub use self::string_values::StringValues;

#[path = "host.struct.rs"]
mod host;
pub use self::host::Host;

#[path = "form.struct.rs"]
mod form;
pub use self::form::{FormCollection, FormFile};

#[path = "http_request.struct.rs"]
mod http_request;
pub use self::http_request::{HttpRequest, HttpRequestBuilder};
