// User - editing actor with an ordered trust role
//
// Trust gates moderation: new users queue their edits, trusted users and
// admins apply immediately, guests and banned users cannot edit at all.
// Five approved edits promote a new user to trusted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Approved-edit count at which a new user becomes trusted.
pub const PROMOTION_THRESHOLD: i64 = 5;

// ============================================================================
// USER ROLE
// ============================================================================

/// Ordered trust level. The derive order matters: Guest < New < Trusted < Admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UserRole {
    Guest,
    New,
    Trusted,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Guest => "GUEST",
            UserRole::New => "NEW_USER",
            UserRole::Trusted => "TRUSTED_USER",
            UserRole::Admin => "ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<UserRole> {
        match value {
            "GUEST" => Some(UserRole::Guest),
            "NEW_USER" => Some(UserRole::New),
            "TRUSTED_USER" => Some(UserRole::Trusted),
            "ADMIN" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

// ============================================================================
// USER
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub role: UserRole,
    pub approved_edits_count: i64,
    pub is_banned: bool,
    pub banned_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(display_name: &str, role: UserRole) -> Self {
        User {
            id: uuid::Uuid::new_v4().to_string(),
            display_name: display_name.to_string(),
            role,
            approved_edits_count: 0,
            is_banned: false,
            banned_reason: None,
            created_at: Utc::now(),
        }
    }

    /// Whether this user may submit edits at all. Bans suppress editing
    /// regardless of role.
    pub fn can_edit(&self) -> bool {
        self.role >= UserRole::New && !self.is_banned
    }

    /// New users' edits queue for moderation instead of applying directly.
    pub fn needs_moderation(&self) -> bool {
        self.role == UserRole::New
    }

    /// Trusted users and admins skip the moderation queue.
    pub fn auto_approves(&self) -> bool {
        self.role >= UserRole::Trusted
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(UserRole::Guest < UserRole::New);
        assert!(UserRole::New < UserRole::Trusted);
        assert!(UserRole::Trusted < UserRole::Admin);
    }

    #[test]
    fn test_role_round_trip() {
        for role in [
            UserRole::Guest,
            UserRole::New,
            UserRole::Trusted,
            UserRole::Admin,
        ] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_edit_gates() {
        let guest = User::new("g", UserRole::Guest);
        assert!(!guest.can_edit());

        let new_user = User::new("n", UserRole::New);
        assert!(new_user.can_edit());
        assert!(new_user.needs_moderation());
        assert!(!new_user.auto_approves());

        let trusted = User::new("t", UserRole::Trusted);
        assert!(trusted.auto_approves());
        assert!(!trusted.is_admin());

        let mut admin = User::new("a", UserRole::Admin);
        assert!(admin.auto_approves());
        assert!(admin.is_admin());

        // Ban overrides role
        admin.is_banned = true;
        assert!(!admin.can_edit());
    }
}
