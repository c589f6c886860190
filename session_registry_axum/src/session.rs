use axum::{
    RequestPartsExt,
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    response::{IntoResponse, Response},
};
use axum_extra::{TypedHeader, headers};
use http::{StatusCode, request::Parts};
use std::convert::Infallible;
use std::ops::Deref;
use std::sync::Arc;

use session_registry::{SessionRecord, SessionRegistry};

/// Rejection returned when a request carries no live session.
#[derive(Debug)]
pub struct SessionRejection;

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        tracing::debug!("Unauthorized");
        (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
    }
}

/// The live session of the caller, available as an Axum extractor
///
/// The registry is taken from the router state, so the state must provide an
/// `Arc<SessionRegistry>` through `FromRef`. Extraction fails with
/// [`SessionRejection`] when the session cookie is missing, unknown or expired.
/// Use `Option<CurrentSession>` for pages that also serve anonymous visitors.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{routing::get, Router};
/// use session_registry_axum::{CurrentSession, SessionRegistry};
///
/// async fn whoami(session: CurrentSession) -> String {
///     format!("user {}", session.user_id)
/// }
///
/// fn app(registry: Arc<SessionRegistry>) -> Router {
///     Router::new().route("/whoami", get(whoami)).with_state(registry)
/// }
/// ```
#[derive(Clone, Debug)]
pub struct CurrentSession(pub SessionRecord);

impl Deref for CurrentSession {
    type Target = SessionRecord;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    Arc<SessionRegistry>: FromRef<S>,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let registry = Arc::<SessionRegistry>::from_ref(state);
        let cookie_name = registry.config().cookie_name.as_str();

        let cookies: TypedHeader<headers::Cookie> = parts.extract().await.map_err(|_| {
            tracing::debug!("No cookies in request");
            SessionRejection
        })?;

        let token = cookies.get(cookie_name).ok_or_else(|| {
            tracing::debug!("Session cookie {:?} not present", cookie_name);
            SessionRejection
        })?;

        let record = registry.lookup_by_token(token).await.map_err(|e| {
            tracing::debug!("Session lookup failed: {}", e);
            SessionRejection
        })?;

        Ok(CurrentSession(record))
    }
}

impl<S> OptionalFromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    Arc<SessionRegistry>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let result: Result<Self, SessionRejection> =
            <CurrentSession as FromRequestParts<S>>::from_request_parts(parts, state).await;
        Ok(result.ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use http::{Request, header::COOKIE};
    use session_registry::{RegistryConfig, UserId};

    fn registry() -> Arc<SessionRegistry> {
        Arc::new(
            SessionRegistry::new(RegistryConfig::new("sid", "s3cret", Duration::minutes(30)))
                .unwrap(),
        )
    }

    fn parts_with_cookie(cookie: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_extracts_live_session() {
        let registry = registry();
        let token = registry.create(UserId::new(42)).await.unwrap();
        let mut parts = parts_with_cookie(Some(&format!("theme=dark; sid={token}")));

        let session =
            <CurrentSession as FromRequestParts<_>>::from_request_parts(&mut parts, &registry)
                .await
                .unwrap();

        assert_eq!(session.token, token);
        assert_eq!(session.user_id, UserId::new(42));
    }

    #[tokio::test]
    async fn test_rejects_missing_cookie() {
        let registry = registry();
        let mut parts = parts_with_cookie(None);

        let result =
            <CurrentSession as FromRequestParts<_>>::from_request_parts(&mut parts, &registry)
                .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_rejects_unknown_token() {
        let registry = registry();
        let mut parts = parts_with_cookie(Some("sid=not-a-session"));

        let result =
            <CurrentSession as FromRequestParts<_>>::from_request_parts(&mut parts, &registry)
                .await;

        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_optional_extractor_yields_none() {
        let registry = registry();
        let mut parts = parts_with_cookie(Some("sid=deleted"));

        let result = <CurrentSession as OptionalFromRequestParts<_>>::from_request_parts(
            &mut parts, &registry,
        )
        .await
        .unwrap();

        assert!(result.is_none());
    }
}
