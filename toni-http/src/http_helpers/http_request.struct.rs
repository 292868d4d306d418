use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use super::{Body, FormCollection, Headers, Host, StringValues};
use crate::cancellation::CancellationSignal;
use crate::config::FormOptions;
use crate::error::FormError;
use crate::parsers::{is_form_content_type, parse_cookie_headers, parse_query, read_form};

/// A single inbound HTTP request, independent of the transport that produced
/// it.
///
/// Raw fields (method, scheme, host, path base, path, query string,
/// protocol, headers, content length, body) are filled in once by the
/// transport and stay mutable so middleware can rewrite them before handlers
/// run.
///
/// # Derived views
///
/// [`query`](Self::query), [`cookies`](Self::cookies) and
/// [`get_form`](Self::get_form) are computed lazily on first access and then
/// cached for the rest of the request. **Caches are never invalidated**:
/// changing the query string or the `Cookie` header after the matching view
/// has been read leaves the view as it was. Middleware that rewrites these
/// raw fields must run before anything reads the derived view.
///
/// # Body
///
/// The body is a single-pass stream. `get_form` reads it at most once; reading
/// it directly through [`body_mut`](Self::body_mut) or
/// [`take_body`](Self::take_body) makes a later `get_form` fail with
/// [`FormError::AlreadyConsumed`]. Nothing here retries or rewinds: a caller
/// that needs the bytes twice must [`set_body`](Self::set_body) a buffered
/// replacement first.
///
/// # Examples
///
/// ```
/// use toni_http::HttpRequest;
///
/// let mut req = HttpRequest::builder()
///     .method("GET")
///     .path("/search")
///     .query_string("?q=rust&page=2")
///     .header("Cookie", "theme=dark")
///     .build();
///
/// assert_eq!(req.query().get("q"), Some("rust"));
/// assert_eq!(req.cookies().get("theme"), Some("dark"));
///
/// // The cached view does not follow later rewrites.
/// req.set_query_string("?q=go");
/// assert_eq!(req.query().get("q"), Some("rust"));
/// ```
pub struct HttpRequest {
    method: String,
    scheme: String,
    host: Host,
    path_base: String,
    path: String,
    query_string: String,
    protocol: String,
    headers: Headers,
    content_length: Option<u64>,
    body: Mutex<Body>,
    cancellation: CancellationSignal,
    form_options: FormOptions,
    query: OnceLock<StringValues>,
    cookies: OnceLock<StringValues>,
    form: OnceCell<Arc<FormCollection>>,
}

impl HttpRequest {
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::new()
    }

    /// Get the HTTP method (GET, POST, PUT, DELETE, etc.).
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn set_method(&mut self, method: impl Into<String>) {
        self.method = method.into();
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn set_scheme(&mut self, scheme: impl Into<String>) {
        self.scheme = scheme.into();
    }

    /// `true` when the scheme is `https`. Recomputed on every call.
    pub fn is_secure(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("https")
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn set_host(&mut self, host: Host) {
        self.host = host;
    }

    /// Mount point of the application the request was routed to.
    pub fn path_base(&self) -> &str {
        &self.path_base
    }

    pub fn set_path_base(&mut self, path_base: impl Into<String>) {
        self.path_base = path_base.into();
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// The raw query string as it was set, with or without the leading `?`.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Replace the raw query string.
    ///
    /// Has no effect on [`query`](Self::query) once that view has been read.
    pub fn set_query_string(&mut self, query_string: impl Into<String>) {
        self.query_string = query_string.into();
    }

    /// Protocol string, e.g. `HTTP/1.1`.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn set_protocol(&mut self, protocol: impl Into<String>) {
        self.protocol = protocol.into();
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable header access.
    ///
    /// Editing `Cookie` here has no effect on [`cookies`](Self::cookies) once
    /// that view has been read.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Declared body length; `None` when unknown (e.g. chunked), which is
    /// distinct from `Some(0)`.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn set_content_length(&mut self, content_length: Option<u64>) {
        self.content_length = content_length;
    }

    /// Direct access to the body stream. Reading from it consumes the body.
    pub fn body_mut(&mut self) -> &mut Body {
        self.body.get_mut()
    }

    /// Swap in a new body, typically a buffering wrapper around the old one.
    pub fn set_body(&mut self, body: Body) {
        *self.body.get_mut() = body;
    }

    /// Take the body out, leaving an already-consumed placeholder behind.
    pub fn take_body(&mut self) -> Body {
        std::mem::replace(self.body.get_mut(), Body::drained())
    }

    pub fn cancellation(&self) -> &CancellationSignal {
        &self.cancellation
    }

    pub fn set_cancellation(&mut self, signal: CancellationSignal) {
        self.cancellation = signal;
    }

    pub fn form_options(&self) -> &FormOptions {
        &self.form_options
    }

    /// Parsed query string, computed on first call and cached.
    pub fn query(&self) -> &StringValues {
        self.query.get_or_init(|| parse_query(&self.query_string))
    }

    /// Parsed `Cookie` header lines, computed on first call and cached.
    pub fn cookies(&self) -> &StringValues {
        self.cookies
            .get_or_init(|| parse_cookie_headers(self.headers.get_all("cookie")))
    }

    /// Whether `Content-Type` names a form encoding `get_form` understands.
    pub fn has_form_content_type(&self) -> bool {
        is_form_content_type(self.headers.get("content-type"))
    }

    /// Read and parse the body as a form.
    ///
    /// The first successful call reads the body; every later call returns the
    /// same `Arc` without touching the stream. Concurrent callers on a shared
    /// request are serialized: one reads, the others wait for its result.
    ///
    /// Fails with [`FormError::UnsupportedMediaType`] (body untouched) when
    /// `Content-Type` is not a form encoding, and with
    /// [`FormError::Cancelled`] if the request's cancellation signal fires
    /// while reading. A failed read is not cached, but since the body has
    /// been partly consumed a retry reports [`FormError::AlreadyConsumed`].
    pub async fn get_form(&self) -> Result<Arc<FormCollection>, FormError> {
        if let Some(form) = self.form.get() {
            debug!("form served from cache");
            return Ok(Arc::clone(form));
        }

        let form = self
            .form
            .get_or_try_init(|| async {
                let mut body = self.body.lock().await;
                read_form(
                    &mut body,
                    self.headers.get("content-type"),
                    self.content_length,
                    &self.cancellation,
                    &self.form_options,
                )
                .await
                .map(Arc::new)
            })
            .await?;

        Ok(Arc::clone(form))
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("path_base", &self.path_base)
            .field("path", &self.path)
            .field("query_string", &self.query_string)
            .field("protocol", &self.protocol)
            .field("headers", &self.headers)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Populates an [`HttpRequest`] from transport data.
///
/// When no host is given the `Host` header is used, and when no content
/// length is given a well-formed `Content-Length` header is used.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    method: String,
    scheme: String,
    host: Option<Host>,
    path_base: String,
    path: String,
    query_string: String,
    protocol: String,
    headers: Headers,
    content_length: Option<u64>,
    body: Body,
    cancellation: CancellationSignal,
    form_options: FormOptions,
}

impl HttpRequestBuilder {
    pub fn new() -> Self {
        Self {
            method: "GET".to_string(),
            scheme: "http".to_string(),
            host: None,
            path_base: String::new(),
            path: "/".to_string(),
            query_string: String::new(),
            protocol: "HTTP/1.1".to_string(),
            headers: Headers::new(),
            content_length: None,
            body: Body::empty(),
            cancellation: CancellationSignal::new(),
            form_options: FormOptions::default(),
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn host(mut self, host: impl Into<Host>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn path_base(mut self, path_base: impl Into<String>) -> Self {
        self.path_base = path_base.into();
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn query_string(mut self, query_string: impl Into<String>) -> Self {
        self.query_string = query_string.into();
        self
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Append a header value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn content_length(mut self, content_length: u64) -> Self {
        self.content_length = Some(content_length);
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn cancellation(mut self, signal: CancellationSignal) -> Self {
        self.cancellation = signal;
        self
    }

    pub fn form_options(mut self, options: FormOptions) -> Self {
        self.form_options = options;
        self
    }

    pub fn build(self) -> HttpRequest {
        let host = self
            .host
            .or_else(|| self.headers.get("host").map(Host::parse))
            .unwrap_or_default();

        let content_length = self.content_length.or_else(|| {
            self.headers
                .get("content-length")
                .and_then(|value| value.trim().parse().ok())
        });

        HttpRequest {
            method: self.method,
            scheme: self.scheme,
            host,
            path_base: self.path_base,
            path: self.path,
            query_string: self.query_string,
            protocol: self.protocol,
            headers: self.headers,
            content_length,
            body: Mutex::new(self.body),
            cancellation: self.cancellation,
            form_options: self.form_options,
            query: OnceLock::new(),
            cookies: OnceLock::new(),
            form: OnceCell::new(),
        }
    }
}

impl Default for HttpRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, ReadBuf};

    /// Reader that counts how many times it was polled to completion.
    struct CountingReader {
        inner: std::io::Cursor<Vec<u8>>,
        reads: Arc<AtomicUsize>,
    }

    impl AsyncRead for CountingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Pin::new(&mut self.inner).poll_read(cx, buf)
        }
    }

    fn create_test_request() -> HttpRequest {
        HttpRequest::builder()
            .method("POST")
            .scheme("https")
            .path_base("/api")
            .path("/users/123")
            .query_string("page=1&tag=a&tag=b")
            .header("Host", "example.com:8443")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Cookie", "session=abc; theme=\"dark\"")
            .header("Content-Length", "21")
            .body("name=Ada&role=admin&x")
            .build()
    }

    #[test]
    fn test_identity_fields() {
        let req = create_test_request();

        assert_eq!(req.method(), "POST");
        assert_eq!(req.scheme(), "https");
        assert!(req.is_secure());
        assert_eq!(req.host().name(), "example.com");
        assert_eq!(req.host().port(), Some(8443));
        assert_eq!(req.path_base(), "/api");
        assert_eq!(req.path(), "/users/123");
        assert_eq!(req.protocol(), "HTTP/1.1");
        assert_eq!(req.content_length(), Some(21));
    }

    #[test]
    fn test_setters_rewrite_raw_fields() {
        let mut req = create_test_request();

        req.set_method("PUT");
        req.set_scheme("http");
        req.set_host(Host::parse("internal:80"));
        req.set_path_base("");
        req.set_path("/v2/users/123");
        req.set_protocol("HTTP/2");
        req.set_content_length(None);

        assert_eq!(req.method(), "PUT");
        assert!(!req.is_secure());
        assert_eq!(req.host().to_string(), "internal:80");
        assert_eq!(req.path(), "/v2/users/123");
        assert_eq!(req.protocol(), "HTTP/2");
        assert_eq!(req.content_length(), None);
    }

    #[test]
    fn test_builder_defaults() {
        let req = HttpRequest::builder().build();

        assert_eq!(req.method(), "GET");
        assert_eq!(req.scheme(), "http");
        assert_eq!(req.path(), "/");
        assert!(req.host().is_empty());
        assert!(req.headers().is_empty());
        assert_eq!(req.content_length(), None);
        assert!(req.query().is_empty());
        assert!(req.cookies().is_empty());
    }

    #[test]
    fn test_bad_content_length_header_is_ignored() {
        let req = HttpRequest::builder()
            .header("Content-Length", "-5")
            .build();

        assert_eq!(req.content_length(), None);
    }

    #[test]
    fn test_query_view() {
        let req = create_test_request();

        assert_eq!(req.query().get("page"), Some("1"));
        assert_eq!(req.query().get_all("tag"), ["a", "b"]);
    }

    #[test]
    fn test_query_cache_is_not_invalidated() {
        let mut req = create_test_request();
        assert_eq!(req.query().get("page"), Some("1"));

        req.set_query_string("page=2");

        assert_eq!(req.query_string(), "page=2");
        assert_eq!(req.query().get("page"), Some("1"));
    }

    #[test]
    fn test_query_reflects_rewrite_before_first_read() {
        let mut req = create_test_request();
        req.set_query_string("?page=9");

        assert_eq!(req.query().get("page"), Some("9"));
    }

    #[test]
    fn test_cookie_view_and_stale_cache() {
        let mut req = create_test_request();

        assert_eq!(req.cookies().get("session"), Some("abc"));
        assert_eq!(req.cookies().get("theme"), Some("dark"));

        req.headers_mut().set("Cookie", ["session=changed"]);
        assert_eq!(req.cookies().get("session"), Some("abc"));
    }

    #[test]
    fn test_cookie_header_lines_are_combined() {
        let req = HttpRequest::builder()
            .header("Cookie", "a=1")
            .header("cookie", "b=2; a=3")
            .build();

        assert_eq!(req.cookies().get("a"), Some("3"));
        assert_eq!(req.cookies().get("b"), Some("2"));
    }

    #[tokio::test]
    async fn test_get_form() {
        let req = create_test_request();
        assert!(req.has_form_content_type());

        let form = req.get_form().await.unwrap();
        assert_eq!(form.get("name"), Some("Ada"));
        assert_eq!(form.get("role"), Some("admin"));
        assert_eq!(form.get_all("x"), [""]);
    }

    #[tokio::test]
    async fn test_get_form_twice_reads_body_once() {
        let reads = Arc::new(AtomicUsize::new(0));
        let req = HttpRequest::builder()
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Body::from_reader(CountingReader {
                inner: std::io::Cursor::new(b"a=1".to_vec()),
                reads: reads.clone(),
            }))
            .build();

        let first = req.get_form().await.unwrap();
        let reads_after_first = reads.load(Ordering::SeqCst);
        let second = req.get_form().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reads.load(Ordering::SeqCst), reads_after_first);
    }

    #[tokio::test]
    async fn test_concurrent_get_form_shares_result() {
        let (mut client, server) = tokio::io::duplex(64);
        let req = HttpRequest::builder()
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Body::from_reader(server))
            .build();

        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            client.write_all(b"a=1&b=2").await.unwrap();
        });

        let (first, second) = tokio::join!(req.get_form(), req.get_form());
        writer.await.unwrap();

        let (first, second) = (first.unwrap(), second.unwrap());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.get("b"), Some("2"));
    }

    #[tokio::test]
    async fn test_unsupported_media_type_keeps_body() {
        let mut req = HttpRequest::builder()
            .header("Content-Type", "text/plain")
            .body("plain text")
            .build();

        let err = req.get_form().await.unwrap_err();
        assert!(matches!(err, FormError::UnsupportedMediaType(_)));

        let mut text = String::new();
        req.body_mut().read_to_string(&mut text).await.unwrap();
        assert_eq!(text, "plain text");
    }

    #[tokio::test]
    async fn test_direct_body_read_then_form_is_already_consumed() {
        let mut req = create_test_request();

        let mut sink = Vec::new();
        req.body_mut().read_to_end(&mut sink).await.unwrap();

        assert!(matches!(
            req.get_form().await,
            Err(FormError::AlreadyConsumed)
        ));
    }

    #[tokio::test]
    async fn test_take_body_leaves_consumed_placeholder() {
        let mut req = create_test_request();
        let body = req.take_body();

        assert!(!body.is_consumed());
        assert!(matches!(
            req.get_form().await,
            Err(FormError::AlreadyConsumed)
        ));
    }

    #[tokio::test]
    async fn test_set_body_replaces_stream_before_read() {
        let mut req = create_test_request();
        req.set_content_length(None);
        req.set_body(Body::from("replaced=yes"));

        let form = req.get_form().await.unwrap();
        assert_eq!(form.get("replaced"), Some("yes"));
    }

    #[tokio::test]
    async fn test_cancel_during_get_form() {
        let (mut client, server) = tokio::io::duplex(64);
        let signal = CancellationSignal::new();
        let req = HttpRequest::builder()
            .header("Content-Type", "multipart/form-data; boundary=b")
            .body(Body::from_reader(server))
            .cancellation(signal.clone())
            .build();

        client
            .write_all(b"--b\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\npartial")
            .await
            .unwrap();

        let trigger = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(Duration::from_secs(1), req.get_form())
            .await
            .expect("cancellation was not observed promptly");
        assert!(matches!(result, Err(FormError::Cancelled)));

        assert!(matches!(
            req.get_form().await,
            Err(FormError::AlreadyConsumed)
        ));
        drop(client);
    }

    #[test]
    fn test_debug_omits_body() {
        let req = create_test_request();
        let debug = format!("{req:?}");

        assert!(debug.contains("/users/123"));
        assert!(!debug.contains("name=Ada"));
    }
}
