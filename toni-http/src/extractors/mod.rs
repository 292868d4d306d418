//! Extractors for request data
//!
//! Extractors provide a type-safe way to pull typed values out of an
//! [`HttpRequest`]. They work by implementing the `FromRequest` trait.
//!
//! # Example
//!
//! ```
//! use serde::Deserialize;
//! use toni_http::extractors::{FromRequest, Query};
//! use toni_http::HttpRequest;
//!
//! #[derive(Deserialize)]
//! struct Search {
//!     q: String,
//!     limit: Option<u32>,
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let req = HttpRequest::builder().query_string("?q=rust&limit=5").build();
//! let Query(search) = Query::<Search>::from_request(&req).await.unwrap();
//! assert_eq!(search.q, "rust");
//! assert_eq!(search.limit, Some(5));
//! # }
//! ```

mod form;
mod query;

pub use form::{Form, FormExtractError};
pub use query::{Query, QueryError};

use async_trait::async_trait;

use crate::http_helpers::{HttpRequest, StringValues};

/// Trait for types that can be extracted from an HTTP request
#[async_trait]
pub trait FromRequest: Sized {
    /// The error type returned if extraction fails
    type Error: std::fmt::Display;

    /// Extract self from the request
    async fn from_request(req: &HttpRequest) -> Result<Self, Self::Error>;
}

/// Re-encode a parsed collection so serde can deserialize it.
fn to_urlencoded(values: &StringValues) -> Result<String, serde_urlencoded::ser::Error> {
    let pairs: Vec<(&str, &str)> = values
        .iter()
        .flat_map(|(key, values)| values.iter().map(move |value| (key, value.as_str())))
        .collect();

    serde_urlencoded::to_string(pairs)
}
