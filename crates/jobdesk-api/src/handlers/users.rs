//! User registration, login, and profile handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

use jobdesk_firestore::CreateUserOutcome;
use jobdesk_models::{Profile, PublicUser, Role, User, UserId};

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::password::{hash_password, verify_password};
use crate::state::AppState;

/// Registration payload. All fields are required; they are optional here so
/// absence maps to a 400 with a useful message rather than a body-rejection.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: Option<String>,
    pub role: Option<String>,
    /// Role-shaped profile fields beyond the name.
    #[serde(default)]
    pub profile: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterBatchRequest {
    pub users: Option<Vec<RegisterRequest>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub user_id: UserId,
}

fn require<T>(value: Option<T>, field: &str) -> ApiResult<T> {
    value.ok_or_else(|| ApiError::validation(format!("Missing required field: {}", field)))
}

fn validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a registration payload and build the account it describes.
fn build_user(req: &RegisterRequest) -> ApiResult<User> {
    req.validate()
        .map_err(|e| ApiError::validation(validation_message(&e)))?;

    let name = require(req.name.clone(), "name")?;
    let email = require(req.email.clone(), "email")?;
    let password = require(req.password.clone(), "password")?;
    let role_str = require(req.role.clone(), "role")?;

    let role = Role::parse(&role_str)
        .ok_or_else(|| ApiError::validation("role must be \"company\" or \"student\""))?;

    // The name rides inside the role-shaped profile object.
    let mut profile_json = match &req.profile {
        Some(JsonValue::Object(map)) => map.clone(),
        Some(_) => return Err(ApiError::validation("profile must be a JSON object")),
        None => serde_json::Map::new(),
    };
    profile_json.insert("name".to_string(), JsonValue::String(name));

    let profile = Profile::from_role_value(role, JsonValue::Object(profile_json))
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let password_hash = hash_password(&password)?;
    Ok(User::new(&email, password_hash, role, profile))
}

/// POST /users/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<PublicUser>)> {
    let user = build_user(&req)?;

    match state.users.create(&user).await? {
        CreateUserOutcome::Created => Ok((StatusCode::CREATED, Json(user.public()))),
        CreateUserOutcome::EmailTaken => {
            Err(ApiError::conflict("Email is already registered"))
        }
    }
}

/// First email appearing more than once. Emails are already normalized by
/// construction, so casing differences still collide.
fn duplicate_email(users: &[User]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    users
        .iter()
        .find(|u| !seen.insert(u.email.as_str()))
        .map(|u| u.email.as_str())
}

/// POST /users/multipleregister
///
/// All payloads are validated up front, including duplicate emails within
/// the batch itself, then written as one atomic batch; either every account
/// is created or none are.
pub async fn register_batch(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterBatchRequest>,
) -> ApiResult<(StatusCode, Json<Vec<PublicUser>>)> {
    let requests = require(req.users, "users")?;
    if requests.is_empty() {
        return Err(ApiError::validation("users must not be empty"));
    }

    let mut users = Vec::with_capacity(requests.len());
    let mut errors = Vec::new();
    for (i, item) in requests.iter().enumerate() {
        match build_user(item) {
            Ok(user) => users.push(user),
            Err(e) => errors.push(format!("users[{}]: {}", i, e)),
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors.join("; ")));
    }

    if let Some(email) = duplicate_email(&users) {
        return Err(ApiError::validation(format!(
            "Duplicate email in batch: {}",
            email
        )));
    }

    match state.users.create_batch(&users).await? {
        CreateUserOutcome::Created => Ok((
            StatusCode::CREATED,
            Json(users.iter().map(User::public).collect()),
        )),
        CreateUserOutcome::EmailTaken => {
            Err(ApiError::conflict("One or more emails are already registered"))
        }
    }
}

/// POST /users/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let email = require(req.email, "email")?;
    let password = require(req.password, "password")?;

    // Unknown email and wrong password are indistinguishable to the caller.
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&password, &user.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.tokens.issue(&user.id, user.role)?;

    Ok(Json(LoginResponse {
        token,
        role: user.role,
        user_id: user.id,
    }))
}

/// GET /users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<PublicUser>>> {
    let users = state.users.list().await?;
    Ok(Json(users.iter().map(User::public).collect()))
}

/// GET /users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PublicUser>> {
    let user = state
        .users
        .get(&UserId::from_string(id))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user.public()))
}

/// PATCH /users/:id
///
/// Shallow-merges the payload into the stored profile; the merged result must
/// still match the user's role shape.
pub async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<JsonValue>,
) -> ApiResult<Json<PublicUser>> {
    let mut user = state
        .users
        .get(&UserId::from_string(id))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    user.profile = user
        .profile
        .merged_with(user.role, &patch)
        .map_err(|e| ApiError::validation(e.to_string()))?;
    user.updated_at = chrono::Utc::now();

    state.users.update_profile(&user).await?;
    Ok(Json(user.public()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: JsonValue) -> RegisterRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_build_user_happy_path() {
        let user = build_user(&request(json!({
            "name": "Acme",
            "email": "hr@acme.io",
            "password": "hunter2hunter2",
            "role": "company",
            "profile": {"industry": "Tooling"}
        })))
        .unwrap();

        assert_eq!(user.email, "hr@acme.io");
        assert_eq!(user.role, Role::Company);
        assert_eq!(user.profile.display_name(), "Acme");
        assert_ne!(user.password_hash, "hunter2hunter2");
    }

    #[test]
    fn test_build_user_rejects_missing_fields() {
        let err = build_user(&request(json!({
            "email": "hr@acme.io",
            "password": "hunter2hunter2",
            "role": "company"
        })))
        .unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_build_user_rejects_bad_role() {
        let err = build_user(&request(json!({
            "name": "Dana",
            "email": "dana@example.com",
            "password": "hunter2hunter2",
            "role": "admin"
        })))
        .unwrap_err();
        assert!(err.to_string().contains("role"));
    }

    #[test]
    fn test_build_user_rejects_invalid_email() {
        let err = build_user(&request(json!({
            "name": "Dana",
            "email": "not-an-email",
            "password": "hunter2hunter2",
            "role": "student"
        })))
        .unwrap_err();
        assert!(err.to_string().contains("email"));
    }

    #[test]
    fn test_duplicate_email_detection_is_case_insensitive() {
        let a = build_user(&request(json!({
            "name": "Dana",
            "email": "Dana@Example.com",
            "password": "hunter2hunter2",
            "role": "student"
        })))
        .unwrap();
        let b = build_user(&request(json!({
            "name": "Other Dana",
            "email": "dana@example.com",
            "password": "hunter2hunter2",
            "role": "student"
        })))
        .unwrap();
        let c = build_user(&request(json!({
            "name": "Sam",
            "email": "sam@example.com",
            "password": "hunter2hunter2",
            "role": "student"
        })))
        .unwrap();

        assert_eq!(duplicate_email(&[a.clone(), b]), Some("dana@example.com"));
        assert_eq!(duplicate_email(&[a, c]), None);
    }

    #[test]
    fn test_build_user_rejects_profile_shape_mismatch() {
        let err = build_user(&request(json!({
            "name": "Dana",
            "email": "dana@example.com",
            "password": "hunter2hunter2",
            "role": "student",
            "profile": {"industry": "Tooling"}
        })))
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
