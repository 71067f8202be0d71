//! Gateway webhook endpoints.
//!
//! Payment success is only ever asserted here, against a verified signature.
//! Every event id lands in the `webhook_events` ledger first; a replayed id
//! is acknowledged without touching stock again.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use crate::api::orders::{apply_stock_decrements, clear_cart, notify_fulfillment, user_contact};
use crate::api::Reply;
use crate::domain::order::LineItem;
use crate::error::ApiError;
use crate::events::{self, DomainEvent};
use crate::models::Order;
use crate::payments::{razorpay, stripe};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stripe", post(stripe_webhook))
        .route("/razorpay", post(razorpay_webhook))
}

async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Reply<()>>, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing signature".into()))?;
    stripe::verify_signature(
        &state.config.stripe.webhook_secret,
        signature,
        &body,
        Utc::now().timestamp(),
        stripe::SIGNATURE_TOLERANCE_SECS,
    )
    .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let event: stripe::StripeEvent = serde_json::from_slice(&body)
        .map_err(|_| ApiError::bad_request("Malformed event payload"))?;

    if !record_event(&state, "stripe", &event.id).await? {
        return Ok(Reply::message("Event already processed"));
    }

    let session_id = event.data.object["id"].as_str().unwrap_or_default();
    let order_number = event.data.object["client_reference_id"]
        .as_str()
        .unwrap_or_default();

    match event.kind.as_str() {
        "checkout.session.completed" => {
            fulfill(&state, "stripe", order_number, session_id).await?;
        }
        "checkout.session.expired" => {
            discard_pending(&state, order_number, session_id).await?;
        }
        other => tracing::debug!("ignoring stripe event {other}"),
    }
    Ok(Reply::message("ok"))
}

async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Reply<()>>, ApiError> {
    let signature = headers
        .get("x-razorpay-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing signature".into()))?;
    razorpay::verify_signature(&state.config.razorpay.webhook_secret, signature, &body)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let event_id = headers
        .get("x-razorpay-event-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("Missing event id"))?;

    let event: razorpay::RazorpayEvent = serde_json::from_slice(&body)
        .map_err(|_| ApiError::bad_request("Malformed event payload"))?;

    if !record_event(&state, "razorpay", event_id).await? {
        return Ok(Reply::message("Event already processed"));
    }

    let gateway_ref = event.order_ref().unwrap_or_default();
    match event.event.as_str() {
        "payment.captured" => {
            fulfill(&state, "razorpay", "", gateway_ref).await?;
        }
        "payment.failed" => {
            discard_pending(&state, "", gateway_ref).await?;
        }
        other => tracing::debug!("ignoring razorpay event {other}"),
    }
    Ok(Reply::message("ok"))
}

/// Inserts the event id into the ledger. Returns false when the id was
/// already recorded.
async fn record_event(state: &AppState, gateway: &str, event_id: &str) -> Result<bool, ApiError> {
    let result = sqlx::query(
        "INSERT INTO webhook_events (gateway, event_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(gateway)
    .bind(event_id)
    .execute(&state.db)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Marks the order paid exactly once and applies the same transactional
/// fulfillment as COD placement. A missing or already-paid order is
/// acknowledged without effect.
async fn fulfill(
    state: &AppState,
    gateway: &str,
    order_number: &str,
    gateway_ref: &str,
) -> Result<(), ApiError> {
    let Some(order) = find_order(state, order_number, gateway_ref).await? else {
        tracing::warn!("{gateway} webhook for unknown order {order_number}/{gateway_ref}");
        return Ok(());
    };

    let mut tx = state.db.begin().await?;
    let claimed: Option<(uuid::Uuid,)> = sqlx::query_as(
        "UPDATE orders SET paid = TRUE, updated_at = NOW() WHERE id = $1 AND paid = FALSE RETURNING id",
    )
    .bind(order.id)
    .fetch_optional(&mut *tx)
    .await?;
    if claimed.is_none() {
        return Ok(());
    }

    let items: Vec<LineItem> = serde_json::from_value(order.items.clone())
        .map_err(|e| ApiError::Internal(format!("corrupt order snapshot: {e}")))?;
    let low_stock = apply_stock_decrements(&mut tx, &items).await?;
    clear_cart(&mut tx, order.user_id).await?;
    let (name, email) = user_contact(&mut tx, order.user_id).await?;
    tx.commit().await?;

    events::publish(
        &state.nats,
        DomainEvent::OrderPaid {
            order_number: order.order_number.clone(),
            gateway: gateway.into(),
        },
    )
    .await;
    notify_fulfillment(state, email, name, order.order_number, low_stock);
    Ok(())
}

/// Removes a pending order whose checkout failed or expired. Paid orders are
/// never deleted here.
async fn discard_pending(
    state: &AppState,
    order_number: &str,
    gateway_ref: &str,
) -> Result<(), ApiError> {
    sqlx::query(
        "DELETE FROM orders WHERE (order_number = $1 OR gateway_ref = $2) AND paid = FALSE",
    )
    .bind(order_number)
    .bind(gateway_ref)
    .execute(&state.db)
    .await?;
    Ok(())
}

async fn find_order(
    state: &AppState,
    order_number: &str,
    gateway_ref: &str,
) -> Result<Option<Order>, ApiError> {
    let order: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE order_number = $1 OR gateway_ref = $2")
            .bind(order_number)
            .bind(gateway_ref)
            .fetch_optional(&state.db)
            .await?;
    Ok(order)
}
