use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use std::sync::Arc;

use session_registry::SessionRegistry;

use crate::cookie::session_token_from_headers;

/// Middleware that lets only requests with a live session through.
///
/// The session record is stored in the request extensions for handlers to read.
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware::from_fn_with_state, routing::get, Router};
/// use session_registry_axum::{SessionRegistry, require_session};
///
/// fn protected(registry: Arc<SessionRegistry>) -> Router {
///     Router::new()
///         .route("/", get(|| async { "ok" }))
///         .layer(from_fn_with_state(registry.clone(), require_session))
///         .with_state(registry)
/// }
/// ```
pub async fn require_session(
    State(registry): State<Arc<SessionRegistry>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = match session_token_from_headers(req.headers(), &registry.config().cookie_name) {
        Ok(Some(token)) => token.to_string(),
        Ok(None) => return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match registry.lookup_by_token(&token).await {
        Ok(record) => {
            req.extensions_mut().insert(record);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!("Rejecting request without live session: {}", e);
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
    }
}
