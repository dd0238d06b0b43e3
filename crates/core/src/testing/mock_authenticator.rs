//! Mock authenticator for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthError, AuthRequest, Authenticator, Identity};

/// Authenticator accepting one bearer token, with scriptable outages.
///
/// The token is read from `Authorization: Bearer <token>`; the user id of the
/// resulting identity is `user`.
#[derive(Debug, Clone)]
pub struct MockAuthenticator {
    token: String,
    calls: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
    delay: Duration,
}

impl MockAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            calls: Arc::new(AtomicUsize::new(0)),
            unavailable: Arc::new(AtomicBool::new(false)),
            delay: Duration::ZERO,
        }
    }

    /// Answer every call after `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make the Authorizer unreachable (or reachable again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::ServiceUnavailable("mock outage".to_string()));
        }

        let token = request
            .header("authorization")
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AuthError::NotAuthenticated)?;

        if token == self.token {
            Ok(Identity {
                user_id: "user".to_string(),
                method: "mock".to_string(),
                claims: HashMap::new(),
            })
        } else {
            Err(AuthError::InvalidCredentials("token mismatch".to_string()))
        }
    }

    fn method_name(&self) -> &'static str {
        "mock"
    }
}
