//! PSK-based authentication module.
//!
//! Two keys: the API key opens the `/api` surface, the admin key also opens
//! administrator operations. Either key passes the middleware.
//! Implements constant-time comparison to mitigate timing attacks.

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::config::Config;
use crate::errors::AppError;
use crate::AppState;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Keys accepted by the `/api` middleware.
#[derive(Debug, Clone, Default)]
pub struct AuthKeys {
    pub api: Option<String>,
    pub admin: Option<String>,
}

impl AuthKeys {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api: config.api_psk.clone(),
            admin: config.admin_psk.clone(),
        }
    }

    fn accepts(&self, provided: &str) -> bool {
        [self.api.as_deref(), self.admin.as_deref()]
            .into_iter()
            .flatten()
            .any(|expected| constant_time_compare(provided, expected))
    }
}

/// PSK authentication layer function that takes the configured keys as a parameter.
pub async fn psk_auth_layer(keys: AuthKeys, request: Request, next: Next) -> Response {
    // If no key is configured, allow all requests (dev mode)
    if keys.api.is_none() && keys.admin.is_none() {
        return next.run(request).await;
    }

    match presented_key(request.headers()) {
        Some(provided) if keys.accepts(provided) => next.run(request).await,
        Some(_) => AppError::Unauthorized("Invalid API key".to_string()).into_response(),
        None => AppError::Unauthorized("Missing or invalid API key".to_string()).into_response(),
    }
}

/// Extractor guarding administrator operations.
///
/// Passes when no admin key is configured; otherwise the request must carry
/// the admin key, and a different (already authenticated) key gets 403.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_psk.as_deref() else {
            return Ok(RequireAdmin);
        };

        match presented_key(&parts.headers) {
            Some(provided) if constant_time_compare(provided, expected) => Ok(RequireAdmin),
            Some(_) => {
                tracing::debug!(path = %parts.uri.path(), "Admin operation refused");
                Err(AppError::Forbidden(
                    "Administrator privileges required".to_string(),
                ))
            }
            None => Err(AppError::Unauthorized(
                "Missing or invalid API key".to_string(),
            )),
        }
    }
}

/// Key from the `x-api-key` header, falling back to a bearer token.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-key"));
    }

    #[test]
    fn test_constant_time_compare_empty() {
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("", "not-empty"));
    }

    #[test]
    fn test_presented_key_prefers_header_over_bearer() {
        let mut headers = HeaderMap::new();
        assert_eq!(presented_key(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-bearer"));
        assert_eq!(presented_key(&headers), Some("from-bearer"));

        headers.insert(API_KEY_HEADER, HeaderValue::from_static("from-header"));
        assert_eq!(presented_key(&headers), Some("from-header"));
    }

    #[test]
    fn test_either_key_is_accepted() {
        let keys = AuthKeys {
            api: Some("api-key".to_string()),
            admin: Some("admin-key".to_string()),
        };
        assert!(keys.accepts("api-key"));
        assert!(keys.accepts("admin-key"));
        assert!(!keys.accepts("other"));

        let admin_only = AuthKeys {
            api: None,
            admin: Some("admin-key".to_string()),
        };
        assert!(admin_only.accepts("admin-key"));
        assert!(!admin_only.accepts("api-key"));
    }
}
