use chrono::Utc;
use http::header::{COOKIE, HeaderMap, SET_COOKIE};

use session_registry::{CookieSpec, SessionRegistry};

use crate::error::CookieError;

/// Append a `Set-Cookie` header built from `cookie`.
///
/// `Max-Age` counts the seconds left until `cookie.expires`, never below zero,
/// so an expiry in the past tells the browser to drop the cookie.
pub fn header_set_cookie<'a>(
    headers: &'a mut HeaderMap,
    cookie: &CookieSpec,
) -> Result<&'a HeaderMap, CookieError> {
    let max_age = (cookie.expires - Utc::now()).num_seconds().max(0);
    let expires = cookie.expires.format("%a, %d %b %Y %H:%M:%S GMT");
    let value = format!(
        "{}={}; SameSite=Lax; Secure; HttpOnly; Path=/; Max-Age={max_age}; Expires={expires}",
        cookie.name, cookie.value
    );

    headers.append(
        SET_COOKIE,
        value
            .parse()
            .map_err(|_| CookieError::Cookie("Failed to parse cookie".to_string()))?,
    );
    Ok(headers)
}

/// Headers carrying just the `Set-Cookie` for `cookie`.
pub fn session_cookie_headers(cookie: &CookieSpec) -> Result<HeaderMap, CookieError> {
    let mut headers = HeaderMap::new();
    header_set_cookie(&mut headers, cookie)?;
    Ok(headers)
}

/// Find the value of `cookie_name` in the request `Cookie` header.
///
/// # Returns
/// * `Ok(None)` - No cookie header, or the named cookie is absent
/// * `Err(CookieError::InvalidHeader)` - The header is not visible ASCII
pub fn session_token_from_headers<'a>(
    headers: &'a HeaderMap,
    cookie_name: &str,
) -> Result<Option<&'a str>, CookieError> {
    let Some(cookie_header) = headers.get(COOKIE) else {
        tracing::debug!("No cookie header found");
        return Ok(None);
    };

    let cookie_str = cookie_header.to_str().map_err(|e| {
        tracing::error!("Invalid cookie header: {}", e);
        CookieError::InvalidHeader("Invalid cookie header".to_string())
    })?;

    // Base64 tokens may contain '=', so only split on the first one
    let token = cookie_str.split(';').map(|s| s.trim()).find_map(|s| {
        let mut parts = s.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some(k), Some(v)) if k == cookie_name && !v.is_empty() => Some(v),
            _ => None,
        }
    });

    if token.is_none() {
        tracing::debug!("No session cookie '{}' found in cookies", cookie_name);
    }

    Ok(token)
}

/// Delete the session named by the request cookies and return headers that clear the cookie.
pub async fn prepare_logout_response(
    registry: &SessionRegistry,
    request_headers: &HeaderMap,
) -> Result<HeaderMap, CookieError> {
    let cookie_name = registry.config().cookie_name.as_str();
    if let Some(token) = session_token_from_headers(request_headers, cookie_name)? {
        registry.delete(token).await;
    }
    session_cookie_headers(&registry.expired_cookie())
}
