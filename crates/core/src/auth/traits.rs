use async_trait::async_trait;
use thiserror::Error;

use super::types::{AuthRequest, Identity};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Authorizer unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl AuthError {
    /// True when the Authorizer answered and said no.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::InvalidCredentials(_))
    }

    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::InvalidCredentials(_) => "invalid_credentials",
            Self::ServiceUnavailable(_) => "unavailable",
            Self::ConfigurationError(_) => "configuration",
        }
    }
}

/// The Authorizer capability: `Verify(credential) -> allow | deny`.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Verify the credential carried by the request.
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    /// Name of this authentication method
    fn method_name(&self) -> &'static str;
}
