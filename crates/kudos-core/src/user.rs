//! # User Records
//!
//! The user account row and its credential linkage. A user may carry a
//! local password hash, an external identity (OAuth provider + subject),
//! or both. Accounts are never hard-deleted — deactivation clears
//! `is_active` and the row stays for referential integrity of cards,
//! likes, and comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{EmailAddress, UserId};

/// Maximum display name length in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 64;

/// Linkage to an external OAuth identity.
///
/// `provider` is the issuer label (e.g. `"google"`, `"cognito"`), and
/// `subject` is the provider's stable user identifier. The pair is unique
/// across users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalIdentity {
    pub provider: String,
    pub subject: String,
}

/// A user account row.
///
/// Point counters:
///
/// - `weekly_points` — the spending budget. Debited by card grants and
///   likes, restored by the weekly reset. Never negative.
/// - `weekly_points_received` / `total_points_received` — leaderboard
///   accumulators credited when the user receives cards or their cards
///   are liked. The weekly counter is zeroed by the reset; the total
///   counter only ever grows (modulo like-refund reversal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub email: EmailAddress,
    pub display_name: String,
    pub weekly_points: u32,
    pub weekly_points_received: u64,
    pub total_points_received: u64,
    pub is_admin: bool,
    pub is_active: bool,
    /// Argon2id PHC string. Absent for OAuth-only accounts. Never leaves
    /// the process: skipped on serialization, defaulted on deserialization.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub external_identity: Option<ExternalIdentity>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Validate a display name: trimmed, non-empty, at most 64 characters.
pub fn validate_display_name(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidDisplayName("empty".to_string()));
    }
    if trimmed.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(ValidationError::InvalidDisplayName("over 64 characters".to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> UserRecord {
        UserRecord {
            id: UserId::new(),
            email: EmailAddress::new("taro@example.com").unwrap(),
            display_name: "Taro".to_string(),
            weekly_points: 140,
            weekly_points_received: 0,
            total_points_received: 0,
            is_admin: false,
            is_active: true,
            password_hash: Some("$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string()),
            external_identity: None,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn password_hash_never_serializes() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn display_name_trims() {
        assert_eq!(validate_display_name("  Hanako  ").unwrap(), "Hanako");
    }

    #[test]
    fn display_name_rejects_empty_and_long() {
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"x".repeat(65)).is_err());
    }
}
