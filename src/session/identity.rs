//! Identity collaborator used to authenticate session calls

use crate::error::Result;
use async_trait::async_trait;

/// Authenticated user as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub access_token: String,
}

/// External identity service.
///
/// Token acquisition is the implementor's business; the session client only
/// calls `login` before creating a session and reads the access token when
/// building each request.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Make sure a user is signed in
    async fn login(&self) -> Result<()>;

    /// Currently signed-in user, if any
    async fn get_user(&self) -> Result<Option<AuthUser>>;
}

/// Identity backed by a fixed bearer token
#[derive(Debug, Clone, Default)]
pub struct StaticTokenIdentity {
    token: Option<String>,
}

impl StaticTokenIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Read the token from an environment variable; empty values count as unset
    pub fn from_env(var: &str) -> Self {
        let token = std::env::var(var).ok().filter(|t| !t.trim().is_empty());
        if token.is_none() {
            tracing::debug!("No access token found in {}", var);
        }
        Self { token }
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenIdentity {
    async fn login(&self) -> Result<()> {
        Ok(())
    }

    async fn get_user(&self) -> Result<Option<AuthUser>> {
        Ok(self.token.as_ref().map(|token| AuthUser {
            access_token: token.clone(),
        }))
    }
}
