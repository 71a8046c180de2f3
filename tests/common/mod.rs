//! Shared utilities for integration testing.

use std::net::SocketAddr;

use axum::{http::StatusCode, routing::get, Router};
use redirect_fallback::config::ProxyConfig;
use redirect_fallback::http::HttpServer;
use redirect_fallback::lifecycle::{self, Shutdown};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Start a pretend upstream application on an ephemeral port.
///
/// `/`, `/live/` and `/echo-host/` answer 200, `/boom/` answers 500 and
/// everything else 404.
pub async fn start_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/", get(|| async { "home" }))
        .route("/live/", get(|| async { "live page" }))
        .route("/boom/", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
        .route(
            "/echo-host/",
            get(|headers: axum::http::HeaderMap| async move {
                headers
                    .get("host")
                    .and_then(|h| h.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A running fallback server. Dropping it removes the rules directory;
/// call `shutdown.trigger()` to stop the server.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    _rules: TempDir,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Write `rules` to a fresh rules directory, compile them strictly and
/// serve them in front of `upstream`.
pub async fn start_server(upstream: Option<SocketAddr>, rules: &str) -> RunningServer {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("rules.csv"), rules).unwrap();

    let mut config = ProxyConfig::default();
    config.upstream.address = upstream.map(|addr| addr.to_string());
    config.redirects.directory = dir.path().to_path_buf();

    let table = lifecycle::prepare(&config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config, table);
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    RunningServer {
        addr,
        shutdown,
        _rules: dir,
    }
}

/// HTTP client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
