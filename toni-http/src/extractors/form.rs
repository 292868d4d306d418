//! Form body extractor

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{FromRequest, to_urlencoded};
use crate::error::FormError;
use crate::http_helpers::HttpRequest;

/// Extractor for form bodies, urlencoded or multipart.
///
/// Only text fields take part in deserialization; uploaded files stay
/// reachable through [`HttpRequest::get_form`], which returns the same
/// cached collection this extractor reads from.
#[derive(Debug, Clone)]
pub struct Form<T>(pub T);

impl<T> Form<T> {
    /// Extract the inner value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Form<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> std::ops::DerefMut for Form<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Error type for form extraction
#[derive(Debug)]
pub enum FormExtractError {
    /// The body could not be read as a form
    Read(FormError),
    /// Failed to deserialize form fields
    DeserializeError(String),
}

impl std::fmt::Display for FormExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormExtractError::Read(err) => write!(f, "Failed to read form: {}", err),
            FormExtractError::DeserializeError(msg) => {
                write!(f, "Failed to deserialize form fields: {}", msg)
            }
        }
    }
}

impl std::error::Error for FormExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FormExtractError::Read(err) => Some(err),
            FormExtractError::DeserializeError(_) => None,
        }
    }
}

impl From<FormError> for FormExtractError {
    fn from(err: FormError) -> Self {
        FormExtractError::Read(err)
    }
}

#[async_trait]
impl<T: DeserializeOwned + Send> FromRequest for Form<T> {
    type Error = FormExtractError;

    async fn from_request(req: &HttpRequest) -> Result<Self, Self::Error> {
        let form = req.get_form().await?;

        let encoded = to_urlencoded(form.fields())
            .map_err(|e| FormExtractError::DeserializeError(e.to_string()))?;

        let value: T = serde_urlencoded::from_str(&encoded)
            .map_err(|e| FormExtractError::DeserializeError(e.to_string()))?;

        Ok(Form(value))
    }
}
