//! Access-token providers used to sign backend requests.

use async_trait::async_trait;

use crate::types::TransportError;

/// Supplies the OAuth2 bearer token attached to every request.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current access token.
    async fn access_token(&self) -> Result<String, TransportError>;
}

/// A fixed, caller-supplied token.
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    /// Wrap an already-minted token.
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, TransportError> {
        if self.token.is_empty() {
            return Err(TransportError::Credential("access token is empty".into()));
        }
        Ok(self.token.clone())
    }
}
