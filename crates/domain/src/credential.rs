//! Bearer credential types.
//!
//! A [`Credential`] is the access/refresh token pair issued by the backend,
//! tagged with the [`CredentialTier`] chosen at login. The tier decides which
//! backing store persists the pair and never changes across refreshes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Storage key holding the access token in either tier.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Storage key holding the refresh token in either tier.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// How long a credential survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialTier {
    /// Persisted across restarts ("remember me").
    Durable,
    /// Lives only as long as the current session.
    #[default]
    Ephemeral,
}

impl CredentialTier {
    /// Picks the tier for a login form's "remember me" choice.
    #[must_use]
    pub const fn from_remember_me(remember_me: bool) -> Self {
        if remember_me {
            Self::Durable
        } else {
            Self::Ephemeral
        }
    }

    /// Returns the other tier.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Durable => Self::Ephemeral,
            Self::Ephemeral => Self::Durable,
        }
    }

    /// Returns the tier as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Durable => "durable",
            Self::Ephemeral => "ephemeral",
        }
    }
}

impl fmt::Display for CredentialTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialTier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "durable" => Ok(Self::Durable),
            "ephemeral" => Ok(Self::Ephemeral),
            other => Err(DomainError::UnknownTier(other.to_string())),
        }
    }
}

/// Token pair returned by the login and refresh endpoints.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Short-lived bearer token.
    pub access_token: String,
    /// Long-lived token used to obtain a new pair.
    pub refresh_token: String,
}

impl TokenPair {
    /// Creates a token pair.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &token_preview(&self.access_token))
            .field("refresh_token", &token_preview(&self.refresh_token))
            .finish()
    }
}

/// The active bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Bearer token attached to outbound requests.
    pub access_token: String,
    /// Token used for renewal. Absent when only the access token was restored.
    pub refresh_token: Option<String>,
    /// Persistence tier, fixed at creation.
    pub tier: CredentialTier,
}

impl Credential {
    /// Creates a credential from a freshly issued token pair.
    #[must_use]
    pub fn from_pair(pair: TokenPair, tier: CredentialTier) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: Some(pair.refresh_token),
            tier,
        }
    }

    /// Creates a credential that carries no refresh token.
    #[must_use]
    pub fn access_only(access_token: impl Into<String>, tier: CredentialTier) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            tier,
        }
    }

    /// Builds the successor credential after a renewal.
    ///
    /// The tier is carried over unchanged.
    #[must_use]
    pub fn renewed(&self, pair: TokenPair) -> Self {
        Self::from_pair(pair, self.tier)
    }

    /// Returns true if a renewal can be attempted.
    #[must_use]
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Formats the `Authorization` header value.
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &token_preview(&self.access_token))
            .field(
                "refresh_token",
                &self.refresh_token.as_deref().map(token_preview),
            )
            .field("tier", &self.tier)
            .finish()
    }
}

/// Get a preview of a token (first 8 chars + ...), safe for logs.
#[must_use]
pub fn token_preview(token: &str) -> String {
    if token.len() > 12 {
        let end = token
            .char_indices()
            .nth(8)
            .map_or(token.len(), |(idx, _)| idx);
        format!("{}...", &token[..end])
    } else {
        token.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tier_from_remember_me() {
        assert_eq!(CredentialTier::from_remember_me(true), CredentialTier::Durable);
        assert_eq!(
            CredentialTier::from_remember_me(false),
            CredentialTier::Ephemeral
        );
        assert_eq!(CredentialTier::Durable.other(), CredentialTier::Ephemeral);
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!(
            "Durable".parse::<CredentialTier>().unwrap(),
            CredentialTier::Durable
        );
        assert!("forever".parse::<CredentialTier>().is_err());
    }

    #[test]
    fn test_renewed_keeps_tier() {
        let durable = Credential::from_pair(TokenPair::new("T1", "R1"), CredentialTier::Durable);
        let next = durable.renewed(TokenPair::new("T2", "R2"));
        assert_eq!(next.tier, CredentialTier::Durable);
        assert_eq!(next.access_token, "T2");
        assert_eq!(next.refresh_token.as_deref(), Some("R2"));

        let ephemeral = Credential::access_only("T1", CredentialTier::Ephemeral);
        assert!(!ephemeral.can_refresh());
        assert_eq!(
            ephemeral.renewed(TokenPair::new("T2", "R2")).tier,
            CredentialTier::Ephemeral
        );
    }

    #[test]
    fn test_token_pair_wire_format() {
        let pair: TokenPair =
            serde_json::from_str(r#"{"accessToken":"T2","refreshToken":"R2"}"#).unwrap();
        assert_eq!(pair, TokenPair::new("T2", "R2"));
    }

    #[test]
    fn test_debug_hides_tokens() {
        let credential = Credential::from_pair(
            TokenPair::new("eyJhbGciOiJIUzI1NiJ9.secret", "refresh-secret-value"),
            CredentialTier::Durable,
        );
        let debug = format!("{credential:?}");
        assert!(!debug.contains("secret-value"));
        assert!(debug.contains("eyJhbGci..."));
        assert_eq!(token_preview("short"), "short");
    }
}
