//! JWT claims, role model and request guards.
//!
//! Every token carries an explicit role claim; environment-configured admin
//! accounts and database users mint tokens through the same path, so route
//! guards only ever look at the claims. Tokens are accepted from either an
//! `Authorization: Bearer` header or a plain `token` header.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Authorization tier. Stored on the user row for database accounts and
/// embedded in every token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Employee,
    StockAdmin,
    MainAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Employee => "employee",
            Self::StockAdmin => "stock_admin",
            Self::MainAdmin => "main_admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Self::Customer),
            "employee" => Some(Self::Employee),
            "stock_admin" => Some(Self::StockAdmin),
            "main_admin" => Some(Self::MainAdmin),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id, or `"env"` for bootstrap admins that exist only in config.
    pub sub: String,
    pub role: Role,
    pub exp: i64,
}

/// Customer/employee sessions are long-lived; admin tokens expire in two days.
const USER_TOKEN_DAYS: i64 = 30;
const ADMIN_TOKEN_DAYS: i64 = 2;

pub fn issue_user_token(secret: &str, user_id: Uuid, role: Role) -> Result<String, ApiError> {
    issue(secret, user_id.to_string(), role, Duration::days(USER_TOKEN_DAYS))
}

pub fn issue_admin_token(secret: &str, sub: String, role: Role) -> Result<String, ApiError> {
    issue(secret, sub, role, Duration::days(ADMIN_TOKEN_DAYS))
}

fn issue(secret: &str, sub: String, role: Role, ttl: Duration) -> Result<String, ApiError> {
    let claims = Claims {
        sub,
        role,
        exp: (Utc::now() + ttl).timestamp(),
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized("Invalid token".into()))
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    bcrypt::verify(password, hash)
        .map_err(|e| ApiError::Internal(format!("failed to verify password: {e}")))
}

fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(bearer) = value.strip_prefix("Bearer ") {
                return Some(bearer);
            }
        }
    }
    headers.get("token").and_then(|v| v.to_str().ok())
}

fn claims_from_parts(parts: &Parts, state: &AppState) -> Result<Claims, ApiError> {
    let token = token_from_headers(&parts.headers)
        .ok_or_else(|| ApiError::Unauthorized("Token missing".into()))?;
    verify_token(&state.config.jwt_secret, token)
}

/// Any authenticated database user. The subject must be a user id, so
/// bootstrap admin tokens are rejected here.
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let claims = claims_from_parts(parts, &state)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::Unauthorized("Invalid token".into()))?;
        Ok(AuthUser {
            user_id,
            role: claims.role,
        })
    }
}

/// Guard for routes restricted to the main administrator.
pub struct MainAdmin(pub Claims);

/// Guard for routes restricted to the stock administrator.
pub struct StockAdmin(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for MainAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let claims = claims_from_parts(parts, &state)?;
        if claims.role != Role::MainAdmin {
            return Err(ApiError::Forbidden("Unauthorized role".into()));
        }
        Ok(MainAdmin(claims))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for StockAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let claims = claims_from_parts(parts, &state)?;
        if claims.role != Role::StockAdmin {
            return Err(ApiError::Forbidden("Unauthorized role".into()));
        }
        Ok(StockAdmin(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_role() {
        let token = issue_admin_token("secret", "env".into(), Role::StockAdmin).unwrap();
        let claims = verify_token("secret", &token).unwrap();
        assert_eq!(claims.role, Role::StockAdmin);
        assert_eq!(claims.sub, "env");
    }

    #[test]
    fn token_rejects_wrong_secret() {
        let token = issue_admin_token("secret", "env".into(), Role::MainAdmin).unwrap();
        assert!(verify_token("other", &token).is_err());
    }

    #[test]
    fn user_token_subject_is_the_user_id() {
        let id = Uuid::new_v4();
        let token = issue_user_token("secret", id, Role::Customer).unwrap();
        let claims = verify_token("secret", &token).unwrap();
        assert_eq!(Uuid::parse_str(&claims.sub).unwrap(), id);
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn role_strings_round_trip() {
        for role in [Role::Customer, Role::Employee, Role::StockAdmin, Role::MainAdmin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }
}
