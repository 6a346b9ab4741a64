//! # Identifier Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the kudos stack.
//! Each identifier is a distinct type — you cannot pass a [`CardId`] where
//! a [`UserId`] is expected.
//!
//! ## Validation
//!
//! UUID-based identifiers are always valid by construction. The one
//! string-based identifier here, [`EmailAddress`], validates its format at
//! construction time and deserializes through the same constructor so an
//! invalid address is rejected at the JSON boundary, not silently stored.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Implement the full UUID-identifier surface for a newtype: random
/// construction, conversion to and from [`Uuid`], `Display`, and `FromStr`.
macro_rules! uuid_id {
    ($(#[$doc:meta])* $ty:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $ty(Uuid);

        impl $ty {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $ty {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// A unique identifier for a user account.
    UserId
);
uuid_id!(
    /// A unique identifier for a thanks card.
    CardId
);
uuid_id!(
    /// A unique identifier for a like on a card.
    LikeId
);
uuid_id!(
    /// A unique identifier for an emoji reaction on a card.
    ReactionId
);
uuid_id!(
    /// A unique identifier for a comment on a card.
    CommentId
);
uuid_id!(
    /// A unique identifier for a team.
    TeamId
);
uuid_id!(
    /// A unique identifier for a department node in the organization tree.
    DepartmentId
);
uuid_id!(
    /// A unique identifier for a server-side notification row.
    NotificationId
);

// ---------------------------------------------------------------------------
// EmailAddress (validated at construction)
// ---------------------------------------------------------------------------

/// A normalized email address.
///
/// # Validation
///
/// - Trimmed and lowercased at construction.
/// - Must contain exactly one `@` with a non-empty local part and a
///   domain part containing at least one `.`.
/// - Must not contain whitespace and must not exceed 254 characters.
///
/// This is deliberately not a full RFC 5321 parser — the service only needs
/// to reject obviously malformed input before it reaches the users table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EmailAddress(String);

impl<'de> Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl EmailAddress {
    /// Create an email address, normalizing case and validating shape.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEmail`] when the input is empty,
    /// over-long, contains whitespace, or is not `local@domain.tld`-shaped.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let normalized = value.into().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ValidationError::InvalidEmail("empty".to_string()));
        }
        if normalized.len() > 254 {
            return Err(ValidationError::InvalidEmail("over 254 characters".to_string()));
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidEmail(normalized));
        }
        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(ValidationError::InvalidEmail(normalized));
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
            return Err(ValidationError::InvalidEmail(normalized));
        }
        Ok(Self(normalized))
    }

    /// Access the normalized address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_roundtrips_through_string() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ids_are_distinct_types() {
        // Compile-time property; this test just documents it.
        let user = UserId::new();
        let card = CardId::from_uuid(*user.as_uuid());
        assert_eq!(user.as_uuid(), card.as_uuid());
    }

    #[test]
    fn email_normalizes_case_and_whitespace() {
        let email = EmailAddress::new("  Taro.Yamada@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "taro.yamada@example.com");
    }

    #[test]
    fn email_rejects_missing_at() {
        assert!(EmailAddress::new("not-an-address").is_err());
    }

    #[test]
    fn email_rejects_empty_local_part() {
        assert!(EmailAddress::new("@example.com").is_err());
    }

    #[test]
    fn email_rejects_domain_without_dot() {
        assert!(EmailAddress::new("user@localhost").is_err());
    }

    #[test]
    fn email_rejects_inner_whitespace() {
        assert!(EmailAddress::new("a b@example.com").is_err());
    }

    #[test]
    fn email_rejects_over_254_chars() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(EmailAddress::new(long).is_err());
    }

    #[test]
    fn email_deserialize_validates() {
        let ok: Result<EmailAddress, _> = serde_json::from_str("\"user@example.com\"");
        assert!(ok.is_ok());
        let bad: Result<EmailAddress, _> = serde_json::from_str("\"nope\"");
        assert!(bad.is_err());
    }
}
