//! Redirect fallback middleware.
//!
//! Runs the inner service first. Only when it answers `404 Not Found` is
//! the rule table consulted; a match replaces the 404 with the rule's
//! redirect or `410 Gone`, a miss lets the original 404 through untouched.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::request::{absolute_uri, request_id};
use crate::redirects::RuleTable;

pub async fn redirect_fallback(
    State(table): State<Arc<RuleTable>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_owned();
    let absolute = absolute_uri(&req).unwrap_or_default();
    let request_id = request_id(&req).to_owned();

    let response = next.run(req).await;
    if response.status() != StatusCode::NOT_FOUND {
        return response;
    }

    match table.resolve(&path, &absolute) {
        Some(redirect) => {
            tracing::debug!(
                request_id = %request_id,
                path = %path,
                status = redirect.status.as_u16(),
                location = redirect.location.as_deref().unwrap_or(""),
                "Serving redirect for 404"
            );
            redirect.into_response()
        }
        None => response,
    }
}
