//! # Organizational Grouping
//!
//! Teams, departments, and their membership rows. These exist for
//! recipient resolution and filtering; the only rule beyond referential
//! integrity is that teams accumulate received points when they are card
//! recipients (see `kudos-ledger`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{DepartmentId, TeamId, UserId};

/// Maximum team or department name length in characters.
pub const MAX_GROUP_NAME_CHARS: usize = 80;

/// A named team of users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: TeamId,
    pub name: String,
    pub description: Option<String>,
    /// Leaderboard accumulators, credited when the team is a card
    /// recipient or one of its cards is liked.
    pub weekly_points_received: u64,
    pub total_points_received: u64,
    pub created_at: DateTime<Utc>,
}

/// Membership of a user in a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMemberRecord {
    pub team_id: TeamId,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
}

/// A department node. Departments form a tree via `parent_id`; the root
/// nodes have no parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentRecord {
    pub id: DepartmentId,
    pub name: String,
    pub parent_id: Option<DepartmentId>,
    pub created_at: DateTime<Utc>,
}

/// Membership of a user in a department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDepartmentRecord {
    pub user_id: UserId,
    pub department_id: DepartmentId,
}

/// Validate a team or department name: trimmed, non-empty, at most 80
/// characters.
pub fn validate_group_name(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidGroupName("empty".to_string()));
    }
    if trimmed.chars().count() > MAX_GROUP_NAME_CHARS {
        return Err(ValidationError::InvalidGroupName("over 80 characters".to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_name_trims() {
        assert_eq!(validate_group_name(" Platform ").unwrap(), "Platform");
    }

    #[test]
    fn group_name_rejects_empty_and_long() {
        assert!(validate_group_name("").is_err());
        assert!(validate_group_name(&"x".repeat(MAX_GROUP_NAME_CHARS + 1)).is_err());
    }
}
