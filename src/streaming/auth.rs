//! Authentication token providers
//!
//! The transport asks its provider for a token on every connection attempt,
//! so rotating credentials are picked up on reconnect.

/// Error type returned by token providers
pub type TokenError = Box<dyn std::error::Error + Send + Sync>;

/// Supplies a bearer token, or `None` when the host runs without auth
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Result<Option<String>, TokenError>;
}

/// A fixed token, or none at all
#[derive(Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// No authentication
    pub fn none() -> Self {
        Self(None)
    }
}

impl From<Option<String>> for StaticToken {
    fn from(token: Option<String>) -> Self {
        Self(token)
    }
}

// Never print the token itself
impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = if self.0.is_some() { "<redacted>" } else { "None" };
        f.debug_tuple("StaticToken").field(&shown).finish()
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Result<Option<String>, TokenError> {
        Ok(self.0.clone())
    }
}

impl<F> TokenProvider for F
where
    F: Fn() -> Result<Option<String>, TokenError> + Send + Sync,
{
    fn token(&self) -> Result<Option<String>, TokenError> {
        self()
    }
}
