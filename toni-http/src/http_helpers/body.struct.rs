use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// Single-pass request body stream.
///
/// Wraps whatever byte source the transport hands over and remembers whether
/// anything has pulled from it. Once consumed it cannot be rewound; a caller
/// that needs to read the body twice must install a buffered replacement
/// with [`HttpRequest::set_body`](super::HttpRequest::set_body) before the
/// first read.
pub struct Body {
    reader: Pin<Box<dyn AsyncRead + Send>>,
    consumed: bool,
}

impl Body {
    /// A body with no bytes that has not been read yet.
    pub fn empty() -> Self {
        Self::from_reader(tokio::io::empty())
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self {
            reader: Box::pin(reader),
            consumed: false,
        }
    }

    /// Placeholder left behind when the real body is taken out of a request.
    pub(crate) fn drained() -> Self {
        Self {
            reader: Box::pin(tokio::io::empty()),
            consumed: true,
        }
    }

    /// Whether any read (including one that hit end-of-stream) has completed.
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }
}

impl AsyncRead for Body {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let poll = this.reader.as_mut().poll_read(cx, buf);
        if poll.is_ready() {
            this.consumed = true;
        }
        poll
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("consumed", &self.consumed)
            .finish_non_exhaustive()
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_reader(io::Cursor::new(bytes))
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Self::from_reader(io::Cursor::new(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from(text.into_bytes())
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from(text.as_bytes())
    }
}
