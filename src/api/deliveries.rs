//! Delivery records for the stock console, with confirmation emails.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::Reply;
use crate::error::ApiError;
use crate::models::Delivery;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_deliveries).post(add_delivery))
        .route(
            "/:id",
            get(get_delivery).put(update_delivery).delete(delete_delivery),
        )
        .route("/:id/resend-email", post(resend_email))
}

async fn list_deliveries(
    State(state): State<AppState>,
) -> Result<Json<Reply<Vec<Delivery>>>, ApiError> {
    let deliveries: Vec<Delivery> =
        sqlx::query_as("SELECT * FROM deliveries ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;
    Ok(Reply::data(deliveries))
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeliveryPayload {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[validate(email(message = "Email is required for delivery notifications"))]
    pub email: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zipcode: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeliveryCreated {
    pub delivery: Delivery,
    pub email_sent: bool,
}

async fn add_delivery(
    State(state): State<AppState>,
    Json(req): Json<DeliveryPayload>,
) -> Result<Json<Reply<DeliveryCreated>>, ApiError> {
    req.validate()?;

    let delivery: Delivery = sqlx::query_as(
        "INSERT INTO deliveries (first_name, last_name, email, street, city, state, zipcode, country, phone) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.email)
    .bind(&req.street)
    .bind(&req.city)
    .bind(&req.state)
    .bind(&req.zipcode)
    .bind(&req.country)
    .bind(&req.phone)
    .fetch_one(&state.db)
    .await?;

    let email_sent = match state.mailer.send_delivery_confirmation(&delivery).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!("delivery confirmation email failed: {err}");
            false
        }
    };

    Ok(Reply::data(DeliveryCreated {
        delivery,
        email_sent,
    }))
}

async fn get_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reply<Delivery>>, ApiError> {
    let delivery = find_delivery(&state, id).await?;
    Ok(Reply::data(delivery))
}

async fn update_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<DeliveryPayload>,
) -> Result<Json<Reply<Delivery>>, ApiError> {
    req.validate()?;

    let delivery: Delivery = sqlx::query_as(
        "UPDATE deliveries SET first_name = $2, last_name = $3, email = $4, street = $5, \
         city = $6, state = $7, zipcode = $8, country = $9, phone = $10 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.email)
    .bind(&req.street)
    .bind(&req.city)
    .bind(&req.state)
    .bind(&req.zipcode)
    .bind(&req.country)
    .bind(&req.phone)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Delivery not found"))?;

    Ok(Reply::with("Delivery updated", delivery))
}

async fn delete_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reply<()>>, ApiError> {
    let result = sqlx::query("DELETE FROM deliveries WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Delivery not found"));
    }
    Ok(Reply::message("Delivery deleted successfully"))
}

async fn resend_email(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reply<()>>, ApiError> {
    let delivery = find_delivery(&state, id).await?;
    state
        .mailer
        .send_delivery_confirmation(&delivery)
        .await
        .map_err(|err| ApiError::Internal(format!("failed to resend confirmation email: {err}")))?;
    Ok(Reply::message("Confirmation email resent successfully"))
}

async fn find_delivery(state: &AppState, id: Uuid) -> Result<Delivery, ApiError> {
    sqlx::query_as("SELECT * FROM deliveries WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Delivery not found"))
}
