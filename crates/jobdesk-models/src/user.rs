//! User accounts and roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::profile::Profile;

/// Unique identifier for a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account role. Immutable after registration; no endpoint mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Company,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Company => "company",
            Role::Student => "student",
        }
    }

    /// Parse from the wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "company" => Some(Role::Company),
            "student" => Some(Role::Student),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered account.
///
/// The password hash is persisted but never serialized into API responses;
/// handlers return [`User::public`] views instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,

    /// Stored lowercased; uniqueness is enforced at the storage layer.
    pub email: String,

    /// Argon2id hash, never the plaintext.
    pub password_hash: String,

    pub role: Role,

    pub profile: Profile,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new user with a fresh ID and current timestamps.
    /// The email is normalized to lowercase here so every lookup key agrees.
    pub fn new(email: &str, password_hash: String, role: Role, profile: Profile) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email: normalize_email(email),
            password_hash,
            role,
            profile,
            created_at: now,
            updated_at: now,
        }
    }

    /// View safe to serialize in responses (no password hash).
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            email: self.email.clone(),
            role: self.role,
            profile: self.profile.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Short summary attached to job listings and applicant views.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.profile.display_name().to_string(),
            role: self.role,
        }
    }
}

/// Lowercase and trim an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User view with the password hash stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal identity summary (job detail, applicant lists).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::StudentProfile;

    fn student_profile() -> Profile {
        Profile::Student(StudentProfile {
            name: "Dana".to_string(),
            skills: vec!["rust".to_string()],
            resume_url: None,
        })
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::parse("company"), Some(Role::Company));
        assert_eq!(Role::parse("student"), Some(Role::Student));
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(
            serde_json::to_string(&Role::Company).unwrap(),
            "\"company\""
        );
    }

    #[test]
    fn test_email_normalized_on_construction() {
        let user = User::new(
            "  Dana@Example.COM ",
            "hash".to_string(),
            Role::Student,
            student_profile(),
        );
        assert_eq!(user.email, "dana@example.com");
    }

    #[test]
    fn test_public_view_has_no_hash() {
        let user = User::new(
            "dana@example.com",
            "secret-hash".to_string(),
            Role::Student,
            student_profile(),
        );
        let json = serde_json::to_value(user.public()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "dana@example.com");
    }
}
