//! # Auth Errors

use thiserror::Error;

/// Failures in credential handling. Messages are operator-facing; the API
/// layer maps these to generic 401/500 responses so nothing here reaches a
/// client verbatim.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Password hashing failed (parameter or RNG failure).
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// A stored PHC hash string could not be parsed.
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),

    /// OAuth provider configuration is missing or invalid.
    #[error("oauth configuration error: {0}")]
    OAuthConfig(String),

    /// The state parameter did not match a pending authorization.
    #[error("unknown or expired oauth state")]
    OAuthState,

    /// The code-for-token exchange failed at the provider.
    #[error("oauth token exchange failed: {0}")]
    OAuthExchange(String),

    /// The userinfo endpoint rejected the access token or returned an
    /// unusable document.
    #[error("oauth userinfo fetch failed: {0}")]
    OAuthUserInfo(String),
}
