//! HTTP response building module
//!
//! Provides builders for every status code the server emits, decoupled from
//! filesystem access.

use super::cache::FreshHeaders;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

/// Build 200 response carrying a file body and its cache headers
pub fn build_file_response(
    data: Bytes,
    content_type: &str,
    headers: &FreshHeaders,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(200)
        .header("Content-Type", content_type)
        .header("Last-Modified", &headers.last_modified)
        .header("Etag", &headers.etag);

    if let Some(expiry) = &headers.expiry {
        builder = builder
            .header("Expires", &expiry.expires)
            .header("Cache-Control", &expiry.cache_control);
    }

    builder.body(Full::new(data)).unwrap_or_else(|e| {
        log_build_error("200", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build 304 Not Modified response
///
/// Only `Content-Type` is sent; validators are not repeated.
pub fn build_304_response(content_type: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(304)
        .header("Content-Type", content_type)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 301 redirect response with a clickable fallback link
pub fn build_redirect_response(location: &str) -> Response<Full<Bytes>> {
    let body = format!(
        "Redirecting to <a href='{0}'>{0}</a>",
        escape_html(location)
    );

    Response::builder()
        .status(301)
        .header("Location", location)
        .header("Content-Type", "text/html")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 404 Not Found response echoing the requested URL
pub fn build_404_response(url: &str) -> Response<Full<Bytes>> {
    let body = format!(
        "<h1>Not Found</h1><p>The requested URL {} was not found on this server.</p>",
        escape_html(url)
    );

    Response::builder()
        .status(404)
        .header("Content-Type", "text/html")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(Full::new(Bytes::from("404 Not Found")))
        })
}

/// Build 500 response with a plain-text description of the failure
pub fn build_500_response(error: &impl std::fmt::Display) -> Response<Full<Bytes>> {
    Response::builder()
        .status(500)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from(format!(
            "500 Internal Server Error: {error}"
        ))))
        .unwrap_or_else(|e| {
            log_build_error("500", &e);
            Response::new(Full::new(Bytes::from("500 Internal Server Error")))
        })
}

/// Build generic HTML response
pub fn build_html_response(content: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(200)
        .header("Content-Type", "text/html")
        .body(Full::new(Bytes::from(content)))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Escape text for inclusion in HTML content or single/double-quoted attributes
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::cache::Expiry;
    use http_body_util::BodyExt;

    async fn body_string(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_redirect_response() {
        let resp = build_redirect_response("/docs/");
        assert_eq!(resp.status(), 301);
        assert_eq!(resp.headers()["location"], "/docs/");
        assert!(resp.headers().get("cache-control").is_none());
        assert_eq!(
            body_string(resp).await,
            "Redirecting to <a href='/docs/'>/docs/</a>"
        );
    }

    #[tokio::test]
    async fn test_404_escapes_url() {
        let resp = build_404_response("/<script>");
        assert_eq!(resp.status(), 404);
        assert_eq!(resp.headers()["content-type"], "text/html");
        let body = body_string(resp).await;
        assert!(body.contains("The requested URL /&lt;script&gt; was not found"));
    }

    #[tokio::test]
    async fn test_304_has_only_content_type() {
        let resp = build_304_response("text/css");
        assert_eq!(resp.status(), 304);
        assert_eq!(resp.headers().len(), 1);
        assert_eq!(resp.headers()["content-type"], "text/css");
        assert!(body_string(resp).await.is_empty());
    }

    #[test]
    fn test_file_response_headers() {
        let headers = FreshHeaders {
            last_modified: "Sun, 06 Nov 1994 08:49:37 GMT".to_string(),
            etag: "QMwiAbG7pSslOJgMvX/aqs1BIgE=".to_string(),
            expiry: Some(Expiry {
                expires: "Sun, 06 Nov 1994 08:50:37 GMT".to_string(),
                cache_control: "max-age=60".to_string(),
            }),
        };
        let resp = build_file_response(Bytes::from_static(b"body{}"), "text/css", &headers);
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["etag"], "QMwiAbG7pSslOJgMvX/aqs1BIgE=");
        assert_eq!(resp.headers()["last-modified"], "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(resp.headers()["expires"], "Sun, 06 Nov 1994 08:50:37 GMT");
        assert_eq!(resp.headers()["cache-control"], "max-age=60");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a&b"), "a&amp;b");
        assert_eq!(escape_html("it's \"x\""), "it&#39;s &quot;x&quot;");
        assert_eq!(escape_html("plain"), "plain");
    }
}
