//! Broken link reporting.
//!
//! Logs a `warn` event for every 404 that was reached by following a link,
//! so that stale links can be found and turned into redirect rules. Only
//! internal referers, and external referers without a query string (search
//! engines put the query in the referer), are reported.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::http::request::request_id;

pub async fn log_broken_links(req: Request<Body>, next: Next) -> Response {
    let referer = header_string(&req, header::REFERER);
    let domain = header_string(&req, header::HOST)
        .or_else(|| req.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default();
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let request_id = request_id(&req).to_owned();

    let response = next.run(req).await;
    if response.status() != StatusCode::NOT_FOUND {
        return response;
    }

    if let Some(referer) = referer {
        let is_internal = is_internal_referer(&domain, &referer);
        if is_internal || !referer.contains('?') {
            tracing::warn!(
                request_id = %request_id,
                domain = %domain,
                referer = %referer,
                path = %path,
                is_internal,
                "Broken link"
            );
        }
    }

    response
}

fn header_string(req: &Request<Body>, name: header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// True when `referer` is a page on `domain` itself.
pub fn is_internal_referer(domain: &str, referer: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    referer
        .strip_prefix("https://")
        .or_else(|| referer.strip_prefix("http://"))
        .and_then(|rest| rest.strip_prefix(domain))
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    use axum::{middleware::from_fn, routing::get, Router};
    use tower::ServiceExt;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn app() -> Router {
        Router::new()
            .route("/ok/", get(|| async { "fine" }))
            .fallback(|| async { (StatusCode::NOT_FOUND, "missing") })
            .layer(from_fn(log_broken_links))
    }

    /// Send `uri` with the given headers and return the status, body and
    /// everything logged while handling it.
    async fn send(uri: &str, headers: &[(&str, &str)]) -> (StatusCode, String, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut request = Request::builder().uri(uri).header("Host", "example.com");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap(), logs.contents())
    }

    #[tokio::test]
    async fn test_internal_referer_is_logged() {
        let (status, body, logs) = send(
            "/stale/?page=2",
            &[("Referer", "http://example.com/blog/?sort=new")],
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "missing");
        assert!(logs.contains("Broken link"));
        assert!(logs.contains("/stale/?page=2"));
        assert!(logs.contains("is_internal=true"));
    }

    #[tokio::test]
    async fn test_external_referer_without_query_is_logged() {
        let (_, _, logs) = send("/stale/", &[("Referer", "http://other.org/links/")]).await;
        assert!(logs.contains("Broken link"));
        assert!(logs.contains("is_internal=false"));
    }

    #[tokio::test]
    async fn test_external_referer_with_query_is_skipped() {
        let (status, _, logs) = send("/stale/", &[("Referer", "http://search.example/?q=stale")]).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!logs.contains("Broken link"));
    }

    #[tokio::test]
    async fn test_404_without_referer_is_skipped() {
        let (status, _, logs) = send("/stale/", &[]).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!logs.contains("Broken link"));
    }

    #[tokio::test]
    async fn test_success_passes_through_unlogged() {
        let (status, body, logs) = send("/ok/", &[("Referer", "http://example.com/")]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "fine");
        assert!(!logs.contains("Broken link"));
    }

    #[test]
    fn test_internal_referer() {
        assert!(is_internal_referer("example.com", "http://example.com/blog/"));
        assert!(is_internal_referer("example.com", "https://example.com/"));
        assert!(is_internal_referer("example.com:8000", "http://example.com:8000/a/?q=1"));
    }

    #[test]
    fn test_external_referer() {
        assert!(!is_internal_referer("example.com", "http://google.com/search?q=x"));
        assert!(!is_internal_referer("example.com", "http://example.com.evil.org/"));
        assert!(!is_internal_referer("example.com", "http://example.com"));
        assert!(!is_internal_referer("", "http://example.com/"));
        assert!(!is_internal_referer("example.com", "ftp://example.com/"));
    }
}
