//! # Opaque Tokens
//!
//! Session and password-reset tokens are 32 bytes from the OS RNG,
//! hex-encoded — opaque capability strings with no embedded claims.
//! [`SecretString`] wraps any secret that lives in memory longer than a
//! single expression: comparison is constant-time and the value is
//! excluded from `Debug` output and zeroed on drop.

use rand_core::{OsRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Token length in bytes before hex encoding.
const TOKEN_BYTES: usize = 32;

/// Generate a fresh opaque token: 32 random bytes, hex-encoded (64
/// characters).
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// A secret held in memory: redacted `Debug`, constant-time comparison,
/// zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the secret. Callers must not log or serialize the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Constant-time equality against a candidate value.
    ///
    /// Length differences still short-circuit inside `ct_eq`'s contract
    /// (the lengths themselves are not secret for hex tokens of fixed
    /// size).
    pub fn verify(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString(****)")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn secret_verify_matches_exactly() {
        let secret = SecretString::new("abc123");
        assert!(secret.verify("abc123"));
        assert!(!secret.verify("abc124"));
        assert!(!secret.verify("abc12"));
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = SecretString::new("super-secret-value");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("super-secret-value"));
        assert_eq!(rendered, "SecretString(****)");
    }
}
