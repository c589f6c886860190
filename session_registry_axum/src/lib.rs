//! session_registry_axum - Cookie transport for session_registry in axum apps
//!
//! Reads the session token out of the request `Cookie` header, turns a
//! [`CookieSpec`](session_registry::CookieSpec) into a `Set-Cookie` header and
//! exposes the current session as an extractor or a middleware.

mod cookie;
mod error;
mod middleware;
mod session;

pub use cookie::{
    header_set_cookie, prepare_logout_response, session_cookie_headers,
    session_token_from_headers,
};
pub use error::{CookieError, IntoResponseError};
pub use middleware::require_session;
pub use session::{CurrentSession, SessionRejection};

// Re-export the core types hosts need alongside the transport
pub use session_registry::{
    CookieSpec, RegistryConfig, RegistryError, SessionRecord, SessionRegistry, UserId,
};
