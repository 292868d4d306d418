pub mod cancellation;
pub mod config;
pub mod error;
pub mod extractors;
pub mod http_helpers;
pub mod parsers;

pub use cancellation::CancellationSignal;
pub use config::FormOptions;
pub use error::{ConfigError, FormError};
pub use extractors::{Form, FromRequest, Query};
pub use http_helpers::{
    Body, FormCollection, FormFile, Headers, Host, HttpRequest, HttpRequestBuilder, StringValues,
};

// Re-export so `FromRequest` implementors don't need their own dependency
pub use async_trait::async_trait;
