use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No live session matches the requested token or user.
    #[error("Session not found")]
    NotFound,

    /// The user already owns a live session, identified by `token`.
    #[error("User already bound to another session")]
    AlreadyBound { token: String },

    #[error("Invalid registry config: {0}")]
    InvalidConfig(String),

    #[error("Crypto error: {0}")]
    Crypto(String),
}
