//! Query parameter extractor

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{FromRequest, to_urlencoded};
use crate::http_helpers::HttpRequest;

/// Extractor for query parameters
///
/// Deserializes from the request's cached [`query`](HttpRequest::query)
/// view, so the raw query string is parsed at most once per request.
#[derive(Debug, Clone)]
pub struct Query<T>(pub T);

impl<T> Query<T> {
    /// Extract the inner value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Query<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> std::ops::DerefMut for Query<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Error type for query extraction
#[derive(Debug)]
pub enum QueryError {
    /// Failed to deserialize query parameters
    DeserializeError(String),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::DeserializeError(msg) => {
                write!(f, "Failed to deserialize query parameters: {}", msg)
            }
        }
    }
}

impl std::error::Error for QueryError {}

#[async_trait]
impl<T: DeserializeOwned + Send> FromRequest for Query<T> {
    type Error = QueryError;

    async fn from_request(req: &HttpRequest) -> Result<Self, Self::Error> {
        let encoded = to_urlencoded(req.query())
            .map_err(|e| QueryError::DeserializeError(e.to_string()))?;

        let value: T = serde_urlencoded::from_str(&encoded)
            .map_err(|e| QueryError::DeserializeError(e.to_string()))?;

        Ok(Query(value))
    }
}
