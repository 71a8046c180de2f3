//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (redirect fallback, broken links, timeouts,
//!   request ID, tracing)
//! - Forward requests to the upstream application
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri, Version,
    },
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::middleware::{log_broken_links, redirect_fallback};
use crate::http::request::request_id;
use crate::lifecycle::shutdown;
use crate::redirects::RuleTable;

/// Application state injected into the proxy handler.
#[derive(Clone)]
pub struct AppState {
    /// Where requests are forwarded. `None` answers every request with 404,
    /// leaving the rule table as the only source of responses.
    pub upstream: Option<Authority>,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server fronting an upstream application with redirect fallback.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and compiled
    /// rule table.
    pub fn new(config: ProxyConfig, table: Arc<RuleTable>) -> Self {
        let upstream = config
            .upstream
            .address
            .as_deref()
            .and_then(|address| address.parse::<Authority>().ok());

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState { upstream, client };
        let router = Self::build_router(&config, state, table);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers added later wrap the ones added earlier, so the redirect
    /// fallback sees the upstream response first and broken-link logging
    /// sees whatever the fallback produced.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState, table: Arc<RuleTable>) -> Router {
        let router = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(from_fn_with_state(table, redirect_fallback));

        let router = if config.observability.log_broken_links {
            router.layer(from_fn(log_broken_links))
        } else {
            router
        };

        router
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = self.config.upstream.address.as_deref().unwrap_or("none"),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Forward a request to the upstream application unchanged apart from the
/// request target.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let Some(upstream) = state.upstream.clone() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let request_id = request_id(&request).to_owned();
    let (mut parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(upstream);
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Cannot build upstream URI");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    parts.version = Version::HTTP_11;

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        uri = %parts.uri,
        "Forwarding request"
    );

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
