//! Asynchronous form body reading.
//!
//! Dispatches on the media type of `Content-Type`:
//! - `application/x-www-form-urlencoded`: the body is buffered (bounded by
//!   `Content-Length` when present) and parsed with the query grammar.
//! - `multipart/form-data`: sections are parsed as they stream in, see
//!   [`multipart`](super::multipart).
//! - anything else fails with [`FormError::UnsupportedMediaType`] before the
//!   body is touched.
//!
//! Every read from the body races the request's [`CancellationSignal`], so a
//! fired signal aborts the read within one buffer's worth of latency.

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace, warn};

use super::multipart::MultipartReader;
use super::query::parse_urlencoded;
use crate::cancellation::CancellationSignal;
use crate::config::FormOptions;
use crate::error::FormError;
use crate::http_helpers::{Body, FormCollection};

pub const URLENCODED: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Form encoding named by a `Content-Type` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEncoding {
    UrlEncoded,
    Multipart { boundary: String },
}

impl FormEncoding {
    /// Classify a `Content-Type` value. The media type compares
    /// case-insensitively; only the `boundary` parameter is looked at.
    pub fn from_content_type(content_type: Option<&str>) -> Result<Self, FormError> {
        let content_type = content_type.unwrap_or("");
        let media_type = media_type(content_type);

        if media_type.eq_ignore_ascii_case(URLENCODED) {
            return Ok(Self::UrlEncoded);
        }

        if media_type.eq_ignore_ascii_case(MULTIPART_FORM_DATA) {
            let boundary = content_type
                .split(';')
                .skip(1)
                .filter_map(|param| param.split_once('='))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("boundary"))
                .map(|(_, value)| value.trim().trim_matches('"'))
                .filter(|boundary| !boundary.is_empty())
                .ok_or(FormError::InvalidMultipart("missing boundary parameter"))?;

            return Ok(Self::Multipart {
                boundary: boundary.to_string(),
            });
        }

        Err(FormError::UnsupportedMediaType(content_type.to_string()))
    }
}

/// Whether `content_type` names one of the form encodings.
pub fn is_form_content_type(content_type: Option<&str>) -> bool {
    let media_type = media_type(content_type.unwrap_or(""));
    media_type.eq_ignore_ascii_case(URLENCODED)
        || media_type.eq_ignore_ascii_case(MULTIPART_FORM_DATA)
}

fn media_type(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or("").trim()
}

/// Read `body` as a form.
///
/// The media type is checked first, so an unsupported `Content-Type` never
/// consumes the stream. A body that has already been read fails with
/// [`FormError::AlreadyConsumed`].
pub async fn read_form(
    body: &mut Body,
    content_type: Option<&str>,
    content_length: Option<u64>,
    signal: &CancellationSignal,
    options: &FormOptions,
) -> Result<FormCollection, FormError> {
    let encoding = FormEncoding::from_content_type(content_type)?;

    if body.is_consumed() {
        return Err(FormError::AlreadyConsumed);
    }
    if signal.is_cancelled() {
        return Err(FormError::Cancelled);
    }

    debug!(?encoding, ?content_length, "reading form body");
    let mut reader = CancellableReader::new(body, signal, options.buffer_size);

    match encoding {
        FormEncoding::UrlEncoded => {
            let bytes = reader
                .read_to_end(content_length, options.max_body_size)
                .await?;
            let fields = parse_urlencoded(&bytes, options.max_fields);
            Ok(FormCollection::new(fields, Vec::new()))
        }
        FormEncoding::Multipart { boundary } => {
            MultipartReader::new(&boundary, options)
                .read(&mut reader)
                .await
        }
    }
}

/// Body reader that gives up as soon as the cancellation signal fires.
pub(crate) struct CancellableReader<'a, R> {
    inner: &'a mut R,
    signal: &'a CancellationSignal,
    buf: Vec<u8>,
    finished: bool,
}

impl<'a, R> CancellableReader<'a, R>
where
    R: AsyncRead + Unpin,
{
    pub(crate) fn new(inner: &'a mut R, signal: &'a CancellationSignal, buffer_size: usize) -> Self {
        Self {
            inner,
            signal,
            buf: vec![0; buffer_size.max(1)],
            finished: false,
        }
    }

    /// Next chunk of the body, `None` at end of stream.
    pub(crate) async fn next_chunk(&mut self) -> Result<Option<&[u8]>, FormError> {
        let Self {
            inner,
            signal,
            buf,
            finished,
        } = self;

        if *finished {
            return Ok(None);
        }
        if signal.is_cancelled() {
            warn!("form read cancelled");
            return Err(FormError::Cancelled);
        }

        let read = tokio::select! {
            biased;
            _ = signal.cancelled() => {
                warn!("form read cancelled");
                return Err(FormError::Cancelled);
            }
            read = inner.read(buf.as_mut_slice()) => read?,
        };

        trace!(bytes = read, "read form body chunk");
        if read == 0 {
            *finished = true;
            return Ok(None);
        }
        Ok(Some(&buf[..read]))
    }

    /// Buffer the rest of the body, stopping after `limit` bytes when given.
    pub(crate) async fn read_to_end(
        &mut self,
        limit: Option<u64>,
        max_size: usize,
    ) -> Result<Vec<u8>, FormError> {
        if let Some(len) = limit {
            if len > max_size as u64 {
                warn!(content_length = len, max_size, "form body larger than allowed");
                return Err(FormError::BodyTooLarge { limit: max_size });
            }
            if len == 0 {
                return Ok(Vec::new());
            }
        }

        let mut collected = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            collected.extend_from_slice(chunk);

            if let Some(len) = limit {
                let len = len as usize;
                if collected.len() >= len {
                    collected.truncate(len);
                    break;
                }
            }
            if collected.len() > max_size {
                warn!(max_size, "form body larger than allowed");
                return Err(FormError::BodyTooLarge { limit: max_size });
            }
        }

        Ok(collected)
    }
}
