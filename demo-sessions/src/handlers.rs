use axum::{
    Extension, Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use http::{HeaderMap, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use session_registry_axum::{
    CurrentSession, IntoResponseError, RegistryError, SessionRecord, SessionRegistry, UserId,
    prepare_logout_response, session_cookie_headers,
};

pub(crate) async fn index(
    State(registry): State<Arc<SessionRegistry>>,
    session: Option<CurrentSession>,
) -> Result<Response, (StatusCode, String)> {
    if let Some(session) = session {
        let body = if session.is_guest() {
            "Welcome back, guest".to_string()
        } else {
            format!("Welcome back, user {}", session.user_id)
        };
        return Ok(body.into_response());
    }

    // First visit: hand out a guest session
    let token = registry.create(UserId::GUEST).await.into_response_error()?;
    let record = registry
        .lookup_by_token(&token)
        .await
        .into_response_error()?;
    let headers = session_cookie_headers(&registry.emit_cookie(&record)).into_response_error()?;

    Ok((headers, "Welcome, guest").into_response())
}

pub(crate) async fn login(
    State(registry): State<Arc<SessionRegistry>>,
    Path(user_id): Path<i64>,
    CurrentSession(mut record): CurrentSession,
) -> Result<String, (StatusCode, String)> {
    let user_id = UserId::new(user_id);
    if user_id.is_guest() {
        return Err((StatusCode::BAD_REQUEST, "Reserved user id".to_string()));
    }

    match registry.bind(&mut record, user_id).await {
        Ok(()) => Ok(format!("Logged in as user {}", record.user_id)),
        Err(RegistryError::AlreadyBound { .. }) => Err((
            StatusCode::CONFLICT,
            format!("User {user_id} is already signed in elsewhere"),
        )),
        Err(e) => Err(e).into_response_error(),
    }
}

pub(crate) async fn logout(
    State(registry): State<Arc<SessionRegistry>>,
    headers: HeaderMap,
) -> Result<(HeaderMap, &'static str), (StatusCode, String)> {
    let headers = prepare_logout_response(&registry, &headers)
        .await
        .into_response_error()?;
    Ok((headers, "Logged out"))
}

pub(crate) async fn protected(Extension(record): Extension<SessionRecord>) -> String {
    format!(
        "Session for user {} valid until {}",
        record.user_id, record.expires_at
    )
}

#[derive(Serialize)]
pub(crate) struct Health {
    live_sessions: usize,
}

pub(crate) async fn health(State(registry): State<Arc<SessionRegistry>>) -> Json<Health> {
    Json(Health {
        live_sessions: registry.live_count().await,
    })
}
