//! Account profile and team member records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{MemberStatus, UserId, UserRole};

/// Profile of the signed-in user (`GET /auth/profile/`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company_name: String,
    /// Missing roles are treated as the default developer role.
    #[serde(default)]
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Admin privileges derive from the role alone.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Full name when set, username otherwise.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Fields of the own profile that may be changed (`PATCH /auth/profile/`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

/// Team member as listed on the user management page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedUser {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
}

const fn default_true() -> bool {
    true
}

/// Admin-side edit of a team member (`PATCH /auth/users/{id}/`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

/// Invite a new team member (`POST /auth/users/invite/`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub role: UserRole,
}

/// Invite acknowledgement carrying the set-password link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteResponse {
    #[serde(default)]
    pub detail: String,
    pub invite_url: String,
    /// Set when the invite email could not be delivered.
    #[serde(default)]
    pub warning: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn profile_json(role: Option<&str>) -> serde_json::Value {
        let mut value = serde_json::json!({
            "id": 1,
            "username": "e2etest_1",
            "email": "e2etest_1@example.com",
            "company_name": "Acme",
            "created_at": "2025-01-02T03:04:05Z",
            "updated_at": "2025-01-02T03:04:05.123456Z"
        });
        if let Some(role) = role {
            value["role"] = serde_json::Value::from(role);
        }
        value
    }

    #[test]
    fn test_missing_role_is_developer() {
        let user: User = serde_json::from_value(profile_json(None)).unwrap();
        assert_eq!(user.role, UserRole::Developer);
        assert!(!user.is_admin());
    }

    #[test]
    fn test_admin_role() {
        let user: User = serde_json::from_value(profile_json(Some("admin"))).unwrap();
        assert!(user.is_admin());
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut user: User = serde_json::from_value(profile_json(None)).unwrap();
        assert_eq!(user.display_name(), "e2etest_1");

        user.first_name = "Ada".to_string();
        user.last_name = "Lovelace".to_string();
        assert_eq!(user.display_name(), "Ada Lovelace");
    }

    #[test]
    fn test_member_patch_skips_unset_fields() {
        let patch = MemberPatch {
            role: Some(UserRole::Admin),
            ..MemberPatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({"role": "admin"})
        );
    }
}
