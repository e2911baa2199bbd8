//! Role-shaped user profiles.
//!
//! The upstream data kept profiles as a schema-free blob interpreted by role.
//! Here the blob is a tagged union keyed by the account's [`Role`]: writes are
//! validated against the role-specific shape instead of accepting arbitrary
//! fields.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::user::Role;

/// Errors raised when parsing or merging a profile payload.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile does not match the {0} shape: {1}")]
    ShapeMismatch(Role, String),

    #[error("profile payload must be a JSON object")]
    NotAnObject,
}

/// Company-facing profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompanyProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Student-facing profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StudentProfile {
    pub name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
}

/// Profile union, discriminated by the owning user's role rather than a
/// self-describing tag (the role is already stored next to it).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Profile {
    Company(CompanyProfile),
    Student(StudentProfile),
}

impl Profile {
    /// Parse a raw JSON payload against the shape required by `role`.
    pub fn from_role_value(role: Role, value: JsonValue) -> Result<Self, ProfileError> {
        if !value.is_object() {
            return Err(ProfileError::NotAnObject);
        }
        match role {
            Role::Company => serde_json::from_value::<CompanyProfile>(value)
                .map(Profile::Company)
                .map_err(|e| ProfileError::ShapeMismatch(role, e.to_string())),
            Role::Student => serde_json::from_value::<StudentProfile>(value)
                .map(Profile::Student)
                .map_err(|e| ProfileError::ShapeMismatch(role, e.to_string())),
        }
    }

    /// Shallow-merge `patch` into this profile and re-validate the result.
    ///
    /// New fields overwrite, untouched fields persist. The merged object must
    /// still match the role's shape, so a patch cannot smuggle foreign fields
    /// into the stored document.
    pub fn merged_with(&self, role: Role, patch: &JsonValue) -> Result<Self, ProfileError> {
        let patch_map = patch.as_object().ok_or(ProfileError::NotAnObject)?;

        let mut base = match serde_json::to_value(self) {
            Ok(JsonValue::Object(map)) => map,
            _ => return Err(ProfileError::NotAnObject),
        };
        for (key, value) in patch_map {
            base.insert(key.clone(), value.clone());
        }

        Self::from_role_value(role, JsonValue::Object(base))
    }

    /// Display name for summaries regardless of the role shape.
    pub fn display_name(&self) -> &str {
        match self {
            Profile::Company(p) => &p.name,
            Profile::Student(p) => &p.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_company_profile_parses() {
        let profile = Profile::from_role_value(
            Role::Company,
            json!({"name": "Acme", "industry": "Tooling", "website": "https://acme.io"}),
        )
        .unwrap();
        assert_eq!(profile.display_name(), "Acme");
        assert!(matches!(profile, Profile::Company(_)));
    }

    #[test]
    fn test_student_profile_rejects_company_fields() {
        let err = Profile::from_role_value(
            Role::Student,
            json!({"name": "Dana", "industry": "Tooling"}),
        )
        .unwrap_err();
        assert!(matches!(err, ProfileError::ShapeMismatch(Role::Student, _)));
    }

    #[test]
    fn test_profile_requires_object() {
        let err = Profile::from_role_value(Role::Student, json!("just a string")).unwrap_err();
        assert!(matches!(err, ProfileError::NotAnObject));
    }

    #[test]
    fn test_merge_overwrites_and_preserves() {
        let base = Profile::Student(StudentProfile {
            name: "Dana".to_string(),
            skills: vec!["rust".to_string()],
            resume_url: Some("https://cv.example/dana".to_string()),
        });

        let merged = base
            .merged_with(Role::Student, &json!({"skills": ["rust", "sql"]}))
            .unwrap();

        match merged {
            Profile::Student(p) => {
                assert_eq!(p.name, "Dana");
                assert_eq!(p.skills, vec!["rust", "sql"]);
                assert_eq!(p.resume_url.as_deref(), Some("https://cv.example/dana"));
            }
            _ => panic!("merged profile changed shape"),
        }
    }

    #[test]
    fn test_merge_rejects_unknown_fields() {
        let base = Profile::Company(CompanyProfile {
            name: "Acme".to_string(),
            industry: None,
            website: None,
        });
        let err = base
            .merged_with(Role::Company, &json!({"favoriteColor": "mauve"}))
            .unwrap_err();
        assert!(matches!(err, ProfileError::ShapeMismatch(Role::Company, _)));
    }
}
