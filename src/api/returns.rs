//! Return/refund requests: one per order, owner-mutable while pending.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::Reply;
use crate::auth::{AuthUser, MainAdmin};
use crate::domain::returns::ReturnStatus;
use crate::error::ApiError;
use crate::models::ReturnRequest;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/request", post(request_return))
        .route("/user/update", put(update_user_return))
        .route("/user/delete/:id", delete(delete_user_return))
        .route("/user", get(user_returns))
        .route("/update", put(update_return_status))
        .route("/", get(all_returns))
}

#[derive(Debug, Deserialize)]
pub struct RequestReturnBody {
    pub order_number: String,
    pub reason: String,
}

async fn request_return(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<RequestReturnBody>,
) -> Result<Json<Reply<ReturnRequest>>, ApiError> {
    if req.reason.trim().is_empty() {
        return Err(ApiError::bad_request("A reason is required"));
    }

    let owns_order: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM orders WHERE order_number = $1 AND user_id = $2)",
    )
    .bind(&req.order_number)
    .bind(user.user_id)
    .fetch_one(&state.db)
    .await?;
    if !owns_order {
        return Err(ApiError::not_found("Invalid order ID or access denied"));
    }

    // The unique index on order_number decides the duplicate race, not a
    // read-then-write check.
    let created: Option<ReturnRequest> = sqlx::query_as(
        "INSERT INTO returns (order_number, user_id, reason) VALUES ($1, $2, $3) \
         ON CONFLICT (order_number) DO NOTHING RETURNING *",
    )
    .bind(&req.order_number)
    .bind(user.user_id)
    .bind(req.reason.trim())
    .fetch_optional(&state.db)
    .await?;

    match created {
        Some(request) => Ok(Reply::with("Return requested", request)),
        None => Err(ApiError::Conflict("Return request already exists".into())),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserReturnBody {
    pub return_id: Uuid,
    pub reason: String,
}

async fn update_user_return(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<UpdateUserReturnBody>,
) -> Result<Json<Reply<ReturnRequest>>, ApiError> {
    let existing = owned_pending_return(&state, req.return_id, user.user_id).await?;

    let updated: ReturnRequest =
        sqlx::query_as("UPDATE returns SET reason = $2 WHERE id = $1 RETURNING *")
            .bind(existing.id)
            .bind(req.reason.trim())
            .fetch_one(&state.db)
            .await?;

    Ok(Reply::with("Return reason updated", updated))
}

async fn delete_user_return(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Reply<()>>, ApiError> {
    let existing = owned_pending_return(&state, id, user.user_id).await?;

    sqlx::query("DELETE FROM returns WHERE id = $1")
        .bind(existing.id)
        .execute(&state.db)
        .await?;

    Ok(Reply::message("Return request deleted"))
}

async fn user_returns(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Reply<Vec<ReturnRequest>>>, ApiError> {
    let returns: Vec<ReturnRequest> =
        sqlx::query_as("SELECT * FROM returns WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user.user_id)
            .fetch_all(&state.db)
            .await?;
    Ok(Reply::data(returns))
}

#[derive(Debug, Deserialize)]
pub struct UpdateReturnStatusBody {
    pub return_id: Uuid,
    pub status: String,
}

async fn update_return_status(
    State(state): State<AppState>,
    _admin: MainAdmin,
    Json(req): Json<UpdateReturnStatusBody>,
) -> Result<Json<Reply<ReturnRequest>>, ApiError> {
    let status = ReturnStatus::parse(&req.status)
        .ok_or_else(|| ApiError::bad_request("Unknown return status"))?;

    let updated: ReturnRequest =
        sqlx::query_as("UPDATE returns SET status = $2 WHERE id = $1 RETURNING *")
            .bind(req.return_id)
            .bind(status.as_str())
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Return not found"))?;

    Ok(Reply::with("Status updated", updated))
}

async fn all_returns(
    State(state): State<AppState>,
    _admin: MainAdmin,
) -> Result<Json<Reply<Vec<ReturnRequest>>>, ApiError> {
    let returns: Vec<ReturnRequest> =
        sqlx::query_as("SELECT * FROM returns ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;
    Ok(Reply::data(returns))
}

/// Owner check first (403 on someone else's request), then the
/// pending-only guard (400 once reviewed).
async fn owned_pending_return(
    state: &AppState,
    id: Uuid,
    user_id: Uuid,
) -> Result<ReturnRequest, ApiError> {
    let request: ReturnRequest = sqlx::query_as("SELECT * FROM returns WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Access denied".into()))?;

    if request.user_id != user_id {
        return Err(ApiError::Forbidden("Access denied".into()));
    }
    let status = ReturnStatus::parse(&request.status).unwrap_or_default();
    if !status.is_mutable() {
        return Err(ApiError::bad_request("Cannot update non-pending requests"));
    }
    Ok(request)
}
