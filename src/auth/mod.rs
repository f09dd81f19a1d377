//! PSK guard for the admin routes.
//!
//! Accepts the key as `x-api-key`, as a bearer token, or as the password of
//! HTTP Basic credentials so a browser can prompt for it. Comparison is
//! constant-time.

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

const BASIC_CHALLENGE: &str = r#"Basic realm="admin""#;

/// Middleware body; `expected_psk` of `None` disables the check.
pub async fn psk_auth_layer(expected_psk: Option<String>, request: Request, next: Next) -> Response {
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    match provided_key(request.headers()) {
        Some(key) if constant_time_compare(&key, &expected) => next.run(request).await,
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request with wrong key");
            unauthorized_response("Invalid API key")
        }
        None => unauthorized_response("Missing API key"),
    }
}

/// Key supplied by the caller, in order of precedence.
fn provided_key(headers: &HeaderMap) -> Option<String> {
    if let Some(key) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(key.to_string());
    }
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?;
    if let Some(token) = authorization.strip_prefix("Bearer ") {
        return Some(token.to_string());
    }
    authorization.strip_prefix("Basic ").and_then(basic_password)
}

/// Password half of `user:password`; the user name is ignored.
fn basic_password(encoded: &str) -> Option<String> {
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    credentials
        .split_once(':')
        .map(|(_, password)| password.to_string())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn unauthorized_response(message: &str) -> Response {
    let mut response = AppError::Unauthorized(message.to_string()).into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(BASIC_CHALLENGE));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(name, value.parse().unwrap());
        map
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
        assert!(!constant_time_compare("short", "much-longer-key"));
        assert!(constant_time_compare("", ""));
    }

    #[test]
    fn test_key_sources() {
        let api_key = headers(header::HeaderName::from_static(API_KEY_HEADER), "k1");
        assert_eq!(provided_key(&api_key).as_deref(), Some("k1"));

        let bearer = headers(header::AUTHORIZATION, "Bearer k2");
        assert_eq!(provided_key(&bearer).as_deref(), Some("k2"));

        let basic = format!("Basic {}", STANDARD.encode("admin:k3"));
        assert_eq!(provided_key(&headers(header::AUTHORIZATION, &basic)).as_deref(), Some("k3"));

        assert!(provided_key(&headers(header::AUTHORIZATION, "Basic !!!")).is_none());
        assert!(provided_key(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_unauthorized_challenge() {
        let response = unauthorized_response("Missing API key");
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], BASIC_CHALLENGE);
    }
}
