//! Registration, login, admin login and the OTP password-reset flow.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::Reply;
use crate::auth::{self, Role};
use crate::domain::otp;
use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/admin", post(admin_login))
        .route("/forgot-password/send-otp", post(send_otp))
        .route("/forgot-password/verify-otp", post(verify_otp))
        .route("/forgot-password/reset", post(reset_password))
}

/// The admin console posts to `/api/admin/login`; it is the same handler as
/// `/api/user/admin`.
pub fn admin_router() -> Router<AppState> {
    Router::new().route("/login", post(admin_login))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    pub name: String,
    #[validate(email(message = "Enter a valid email"))]
    pub email: String,
    #[validate(length(min = 8, message = "Enter a strong password"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<Reply<TokenResponse>>, ApiError> {
    req.validate()?;
    let email = req.email.to_lowercase();

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(&state.db)
        .await?;
    if exists {
        return Err(ApiError::Conflict("User already exists".into()));
    }

    let password_hash = auth::hash_password(&req.password)?;
    let user: User = sqlx::query_as(
        "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, 'customer') RETURNING *",
    )
    .bind(&req.name)
    .bind(&email)
    .bind(&password_hash)
    .fetch_one(&state.db)
    .await?;

    let mailer = state.mailer.clone();
    let (welcome_email, welcome_name) = (user.email.clone(), user.name.clone());
    tokio::spawn(async move {
        if let Err(err) = mailer.send_welcome(&welcome_email, &welcome_name).await {
            tracing::warn!("welcome email failed: {err}");
        }
    });

    let token = auth::issue_user_token(&state.config.jwt_secret, user.id, Role::Customer)?;
    Ok(Reply::data(TokenResponse { token }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Reply<TokenResponse>>, ApiError> {
    let user: User = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(req.email.to_lowercase())
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User doesn't exist"))?;

    if !auth::verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let role = Role::parse(&user.role).unwrap_or(Role::Customer);
    let token = auth::issue_user_token(&state.config.jwt_secret, user.id, role)?;
    Ok(Reply::data(TokenResponse { token }))
}

#[derive(Debug, Serialize)]
pub struct AdminTokenResponse {
    pub token: String,
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Bootstrap admin credentials are checked first; otherwise an employee
/// account may log in to the employee dashboard. Customers are rejected.
async fn admin_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Reply<AdminTokenResponse>>, ApiError> {
    let cfg = &state.config;

    let env_role = if req.email == cfg.main_admin.email && req.password == cfg.main_admin.password {
        Some(Role::MainAdmin)
    } else if req.email == cfg.stock_admin.email && req.password == cfg.stock_admin.password {
        Some(Role::StockAdmin)
    } else {
        None
    };

    if let Some(role) = env_role {
        let token = auth::issue_admin_token(&cfg.jwt_secret, "env".into(), role)?;
        return Ok(Reply::data(AdminTokenResponse {
            token,
            role: role.as_str(),
            name: None,
        }));
    }

    let user: User = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(req.email.to_lowercase())
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !auth::verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized("Invalid password".into()));
    }
    if Role::parse(&user.role) != Some(Role::Employee) {
        return Err(ApiError::Forbidden("Unauthorized role".into()));
    }

    let token = auth::issue_admin_token(&cfg.jwt_secret, user.id.to_string(), Role::Employee)?;
    Ok(Reply::data(AdminTokenResponse {
        token,
        role: Role::Employee.as_str(),
        name: Some(user.name),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub email: String,
}

async fn send_otp(
    State(state): State<AppState>,
    Json(req): Json<SendOtpRequest>,
) -> Result<Json<Reply<()>>, ApiError> {
    let user: User = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(req.email.to_lowercase())
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Email not found"))?;

    let code = otp::generate_code();
    let expires = otp::expiry_from(chrono::Utc::now());
    sqlx::query("UPDATE users SET otp_code = $2, otp_expires = $3, updated_at = NOW() WHERE id = $1")
        .bind(user.id)
        .bind(&code)
        .bind(expires)
        .execute(&state.db)
        .await?;

    state
        .mailer
        .send_otp(&user.email, &user.name, &code)
        .await
        .map_err(|err| ApiError::Internal(format!("failed to send OTP email: {err}")))?;

    Ok(Reply::message("OTP sent to email"))
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<Reply<()>>, ApiError> {
    let user = user_by_email(&state, &req.email).await?;
    if !otp::verify(
        user.otp_code.as_deref(),
        user.otp_expires,
        &req.otp,
        chrono::Utc::now(),
    ) {
        return Err(ApiError::bad_request("Invalid or expired OTP"));
    }
    Ok(Reply::message("OTP verified"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    #[validate(length(min = 8, message = "Enter a strong password"))]
    pub new_password: String,
}

async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<Reply<()>>, ApiError> {
    req.validate()?;
    let user = user_by_email(&state, &req.email).await?;
    if !otp::verify(
        user.otp_code.as_deref(),
        user.otp_expires,
        &req.otp,
        chrono::Utc::now(),
    ) {
        return Err(ApiError::bad_request("Invalid or expired OTP"));
    }

    let password_hash = auth::hash_password(&req.new_password)?;
    sqlx::query(
        "UPDATE users SET password_hash = $2, otp_code = NULL, otp_expires = NULL, updated_at = NOW() WHERE id = $1",
    )
    .bind(user.id)
    .bind(&password_hash)
    .execute(&state.db)
    .await?;

    Ok(Reply::message("Password reset successful"))
}

async fn user_by_email(state: &AppState, email: &str) -> Result<User, ApiError> {
    sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email.to_lowercase())
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Email not found"))
}
