//! Bearer token authentication and role gating.
//!
//! Tokens are HS256-signed with the shared secret from [`crate::ApiConfig`]
//! and carry the user's identity and role. Handlers declare their access
//! level through extractors: [`AuthUser`] for any authenticated user,
//! [`CompanyUser`] / [`StudentUser`] for role-restricted routes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use jobdesk_models::{Role, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// Claims embedded in an auth token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// User role ("company" or "student")
    pub role: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

/// Issues and verifies auth tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_hours: u64,
}

impl TokenService {
    pub fn new(secret: &str, expiry_hours: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        }
    }

    /// Issue a signed token for a user.
    pub fn issue(&self, user_id: &UserId, role: Role) -> Result<String, ApiError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.as_str().to_string(),
            role: role.as_str().to_string(),
            iat: now,
            exp: now + (self.expiry_hours as i64) * 3600,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("failed to sign token: {}", e)))
    }

    /// Verify a token and return its claims. Expired or tampered tokens fail.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| ApiError::unauthenticated(format!("Invalid token: {}", e)))
    }
}

/// Authenticated user extracted from the Authorization header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub role: Role,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthenticated("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthenticated("Invalid Authorization header format"))?;

        let claims = state.tokens.verify(token)?;

        let role = Role::parse(&claims.role)
            .ok_or_else(|| ApiError::unauthenticated("Token carries an unknown role"))?;

        Ok(AuthUser {
            id: UserId::from_string(claims.sub),
            role,
        })
    }
}

/// Authenticated user that must be a company.
#[derive(Debug, Clone)]
pub struct CompanyUser(pub AuthUser);

#[axum::async_trait]
impl FromRequestParts<AppState> for CompanyUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Company {
            return Err(ApiError::forbidden("Company account required"));
        }
        Ok(CompanyUser(user))
    }
}

/// Authenticated user that must be a student.
#[derive(Debug, Clone)]
pub struct StudentUser(pub AuthUser);

#[axum::async_trait]
impl FromRequestParts<AppState> for StudentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Student {
            return Err(ApiError::forbidden("Student account required"));
        }
        Ok(StudentUser(user))
    }
}
