//! Static bearer-token authentication.

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Header checked in addition to `Authorization` and `X-API-Key`.
pub const DEFAULT_TOKEN_HEADER: &str = "authorizationtoken";

/// Authenticator that validates requests against a configured token.
///
/// The token is accepted from, in order:
/// - `Authorization: Bearer <token>`
/// - the configured token header (`AuthorizationToken` by default), with or
///   without the `Bearer ` prefix
/// - `X-API-Key: <token>`
pub struct ApiKeyAuthenticator {
    expected_key: String,
    token_header: String,
}

impl ApiKeyAuthenticator {
    pub fn new(api_key: String) -> Self {
        Self::with_token_header(api_key, DEFAULT_TOKEN_HEADER)
    }

    pub fn with_token_header(api_key: String, token_header: &str) -> Self {
        Self {
            expected_key: api_key,
            token_header: token_header.to_ascii_lowercase(),
        }
    }

    fn extract_key<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        if let Some(key) = request.header("authorization").and_then(strip_bearer) {
            return Some(key);
        }

        if let Some(value) = request.header(&self.token_header) {
            return Some(strip_bearer(value).unwrap_or(value));
        }

        request.header("x-api-key")
    }
}

fn strip_bearer(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided_key = self
            .extract_key(request)
            .ok_or(AuthError::NotAuthenticated)?;

        if constant_time_eq(provided_key.as_bytes(), self.expected_key.as_bytes()) {
            Ok(Identity {
                user_id: "api_key_user".to_string(),
                method: "api_key".to_string(),
                claims: std::collections::HashMap::new(),
            })
        } else {
            Err(AuthError::InvalidCredentials("Invalid API key".to_string()))
        }
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

/// Constant-time byte comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
