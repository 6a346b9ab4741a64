//! # kudos-auth — Credential Handling
//!
//! Everything that touches a secret lives here:
//!
//! - [`password`] — Argon2id hashing and verification (PHC strings).
//! - [`token`] — opaque session/reset token generation and the
//!   [`SecretString`] wrapper (constant-time comparison, redacting
//!   `Debug`, zeroized on drop).
//! - [`oauth`] — the OAuth 2.0 authorization-code flow with PKCE. The
//!   provider is endpoint configuration: Google's endpoints directly, or
//!   an AWS Cognito hosted domain federating Google — same code path.
//!
//! Session and reset token *storage* is the API layer's concern; this
//! crate only mints and compares the material.

pub mod error;
pub mod oauth;
pub mod password;
pub mod token;

pub use error::AuthError;
pub use oauth::{OAuthProvider, OAuthUserInfo, PendingAuthorization};
pub use password::{hash_password, verify_password};
pub use token::{generate_token, SecretString};
