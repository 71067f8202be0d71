//! Per-user cart endpoints backed by the `users.cart` jsonb column.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::Reply;
use crate::auth::AuthUser;
use crate::domain::cart::Cart;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/get", post(get_cart))
        .route("/add", post(add_to_cart))
        .route("/update", post(update_cart))
}

async fn load_cart(state: &AppState, user_id: Uuid) -> Result<Cart, ApiError> {
    let value: serde_json::Value = sqlx::query_scalar("SELECT cart FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    serde_json::from_value(value).map_err(|e| ApiError::Internal(format!("corrupt cart data: {e}")))
}

async fn store_cart(state: &AppState, user_id: Uuid, cart: &Cart) -> Result<(), ApiError> {
    let value = serde_json::to_value(cart)
        .map_err(|e| ApiError::Internal(format!("failed to serialize cart: {e}")))?;
    sqlx::query("UPDATE users SET cart = $2, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .bind(value)
        .execute(&state.db)
        .await?;
    Ok(())
}

async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Reply<Cart>>, ApiError> {
    let cart = load_cart(&state, user.user_id).await?;
    Ok(Reply::data(cart))
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub item_id: Uuid,
    pub size: String,
}

async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<AddToCartRequest>,
) -> Result<Json<Reply<Cart>>, ApiError> {
    let mut cart = load_cart(&state, user.user_id).await?;
    cart.add(&req.item_id.to_string(), &req.size);
    store_cart(&state, user.user_id, &cart).await?;
    Ok(Reply::with("Added to cart", cart))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub item_id: Uuid,
    pub size: String,
    pub quantity: u32,
}

async fn update_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<UpdateCartRequest>,
) -> Result<Json<Reply<Cart>>, ApiError> {
    let mut cart = load_cart(&state, user.user_id).await?;
    cart.set(&req.item_id.to_string(), &req.size, req.quantity);
    store_cart(&state, user.user_id, &cart).await?;
    Ok(Reply::with("Cart updated", cart))
}
