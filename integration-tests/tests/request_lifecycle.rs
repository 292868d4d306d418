//! Test the request surface a transport adapter fills in and middleware edits
//!
//! Covers identity fields, header semantics and the cached query/cookie views.

use toni_http::{Headers, Host, HttpRequest};

fn create_adapter_request() -> HttpRequest {
    let headers: Headers = [
        ("Host", "shop.example.com"),
        ("Accept", "text/html"),
        ("accept", "application/json"),
        ("Cookie", "cart=42; lang=en"),
        ("Cookie", "lang=fr"),
    ]
    .into_iter()
    .collect();

    HttpRequest::builder()
        .method("GET")
        .scheme("HTTPS")
        .path_base("/store")
        .path("/items")
        .query_string("?category=books&tag=new&tag=sale&empty=&=orphan&bad=%zz")
        .protocol("HTTP/2")
        .headers(headers)
        .build()
}

#[test]
fn test_identity_from_adapter() {
    let req = create_adapter_request();

    assert_eq!(req.method(), "GET");
    assert!(req.is_secure());
    assert_eq!(req.host(), &Host::new("shop.example.com", None));
    assert_eq!(req.path_base(), "/store");
    assert_eq!(req.path(), "/items");
    assert_eq!(req.protocol(), "HTTP/2");
    assert_eq!(req.content_length(), None);
}

#[test]
fn test_headers_are_case_insensitive_and_multi_valued() {
    let mut req = create_adapter_request();

    assert_eq!(req.headers().get_all("ACCEPT"), ["text/html", "application/json"]);
    assert_eq!(req.headers().get("accept"), Some("text/html"));

    req.headers_mut().set("Accept", ["*/*"]);
    assert_eq!(req.headers().get_all("accept"), ["*/*"]);

    req.headers_mut().remove("accept");
    assert!(!req.headers().contains("Accept"));
    assert!(req.headers().get_all("accept").is_empty());
}

#[test]
fn test_query_skips_malformed_segments() {
    let req = create_adapter_request();
    let query = req.query();

    assert_eq!(query.get("category"), Some("books"));
    assert_eq!(query.get_all("tag"), ["new", "sale"]);
    assert_eq!(query.get("empty"), Some(""));
    assert!(!query.contains_key(""));
    assert!(!query.contains_key("bad"));
    assert_eq!(query.get_or("missing", "fallback"), "fallback");
}

#[test]
fn test_cookies_from_every_cookie_line() {
    let req = create_adapter_request();

    assert_eq!(req.cookies().get("cart"), Some("42"));
    assert_eq!(req.cookies().get("lang"), Some("fr"));
    assert_eq!(req.cookies().len(), 2);
}

#[test]
fn test_middleware_rewrite_before_and_after_first_read() {
    let mut req = create_adapter_request();

    // Rewrite before anything read the view: visible.
    req.set_query_string("category=games");
    assert_eq!(req.query().get("category"), Some("games"));

    // Rewrite after the view was read: the cache wins.
    req.set_query_string("category=music");
    assert_eq!(req.query().get("category"), Some("games"));

    assert_eq!(req.cookies().get("cart"), Some("42"));
    req.headers_mut().set("Cookie", ["cart=0"]);
    assert_eq!(req.cookies().get("cart"), Some("42"));
    assert_eq!(req.headers().get("cookie"), Some("cart=0"));
}

#[test]
fn test_host_header_with_port_and_ipv6() {
    let req = HttpRequest::builder().header("Host", "[::1]:8080").build();

    assert_eq!(req.host().name(), "[::1]");
    assert_eq!(req.host().port(), Some(8080));
    assert_eq!(req.host().to_string(), "[::1]:8080");
}
