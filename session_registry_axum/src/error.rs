use http::StatusCode;
use session_registry::RegistryError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum CookieError {
    #[error("Invalid cookie header: {0}")]
    InvalidHeader(String),

    #[error("Cookie error: {0}")]
    Cookie(String),
}

/// Helper trait for converting errors to a standard response error format
pub trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;
}

impl<T> IntoResponseError<T> for Result<T, RegistryError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| {
            let status = match e {
                RegistryError::NotFound => StatusCode::UNAUTHORIZED,
                RegistryError::AlreadyBound { .. } => StatusCode::CONFLICT,
                RegistryError::InvalidConfig(_) | RegistryError::Crypto(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (status, e.to_string())
        })
    }
}

impl<T> IntoResponseError<T> for Result<T, CookieError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| {
            let status = match e {
                CookieError::InvalidHeader(_) => StatusCode::BAD_REQUEST,
                CookieError::Cookie(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, e.to_string())
        })
    }
}
