//! session_registry - In-process session table for request-handling servers
//!
//! A [`SessionRegistry`] issues opaque tokens, answers expiry-aware lookups by
//! token or by user, enforces one live session per authenticated user through
//! [`SessionRegistry::bind`], and drops expired sessions on lookup or from a
//! background sweeper. Reading and writing the cookie itself is left to the
//! host; the registry only describes it as a [`CookieSpec`].

mod config;
mod errors;
mod registry;
mod token;
mod types;

pub use config::{DEFAULT_COOKIE_NAME, DEFAULT_TTL_SECONDS, RegistryConfig};
pub use errors::RegistryError;
pub use registry::{SessionRegistry, spawn_expiry_sweeper};
pub use token::generate_token;
pub use types::{CookieSpec, SessionRecord, UserId};
