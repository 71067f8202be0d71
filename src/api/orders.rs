//! Order placement, gateway checkout and the admin order views.
//!
//! Placement and fulfillment run as one transaction: order write, stock
//! decrement (floored at zero) and cart clear either all land or none do.
//! Notifications go out after commit on detached tasks.

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::api::Reply;
use crate::auth::{AuthUser, StockAdmin};
use crate::domain::is_low_stock;
use crate::domain::order::{generate_order_number, Address, LineItem, OrderStatus, PaymentMethod};
use crate::error::ApiError;
use crate::events::{self, DomainEvent};
use crate::models::Order;
use crate::payments::stripe::CheckoutLine;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/place", post(place_order))
        .route("/stripe", post(place_order_stripe))
        .route("/razorpay", post(place_order_razorpay))
        .route("/payment-status/:order_number", get(payment_status))
        .route("/userorders", post(user_orders))
        .route("/update/:order_number", put(update_order))
        .route("/list", get(all_orders))
        .route("/status", post(update_status))
        .route("/delete", post(delete_order))
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<LineItem>,
    pub address: Address,
    /// Order total in minor currency units, delivery charge included.
    pub amount: i64,
}

#[derive(Debug, Serialize)]
pub struct PlacedOrder {
    pub order_number: String,
}

pub(crate) struct LowStockProduct {
    pub id: Uuid,
    pub name: String,
    pub quantity: i32,
}

async fn place_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<Json<Reply<PlacedOrder>>, ApiError> {
    if req.items.is_empty() {
        return Err(ApiError::bad_request("Order must contain at least one item"));
    }

    let order_number = generate_order_number();
    let mut tx = state.db.begin().await?;

    insert_order(
        &mut tx,
        &order_number,
        user.user_id,
        &req,
        PaymentMethod::Cod,
    )
    .await?;
    let low_stock = apply_stock_decrements(&mut tx, &req.items).await?;
    clear_cart(&mut tx, user.user_id).await?;
    let (name, email) = user_contact(&mut tx, user.user_id).await?;

    tx.commit().await?;

    events::publish(
        &state.nats,
        DomainEvent::OrderPlaced {
            order_number: order_number.clone(),
            user_id: user.user_id,
            amount: req.amount,
            payment_method: PaymentMethod::Cod.as_str().into(),
        },
    )
    .await;
    notify_fulfillment(&state, email, name, order_number.clone(), low_stock);

    Ok(Reply::with("Order Placed", PlacedOrder { order_number }))
}

#[derive(Debug, Serialize)]
pub struct StripeCheckout {
    pub session_url: String,
}

async fn place_order_stripe(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<Json<Reply<StripeCheckout>>, ApiError> {
    if req.items.is_empty() {
        return Err(ApiError::bad_request("Order must contain at least one item"));
    }

    let order_number = generate_order_number();
    let mut tx = state.db.begin().await?;
    insert_order(
        &mut tx,
        &order_number,
        user.user_id,
        &req,
        PaymentMethod::Stripe,
    )
    .await?;
    tx.commit().await?;

    let mut lines: Vec<CheckoutLine> = req
        .items
        .iter()
        .map(|item| CheckoutLine {
            name: item.name.clone(),
            unit_amount: item.price,
            quantity: item.quantity,
        })
        .collect();
    lines.push(CheckoutLine {
        name: "Delivery Charges".into(),
        unit_amount: state.config.delivery_charge,
        quantity: 1,
    });

    let app_url = &state.config.app_url;
    let session = state
        .stripe
        .create_checkout_session(
            &order_number,
            &lines,
            &state.config.currency,
            &format!("{app_url}/verify?success=true&orderId={order_number}"),
            &format!("{app_url}/verify?success=false&orderId={order_number}"),
        )
        .await?;

    sqlx::query("UPDATE orders SET gateway_ref = $2 WHERE order_number = $1")
        .bind(&order_number)
        .bind(&session.id)
        .execute(&state.db)
        .await?;

    Ok(Reply::data(StripeCheckout {
        session_url: session.url,
    }))
}

async fn place_order_razorpay(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<Json<Reply<crate::payments::razorpay::RazorpayOrder>>, ApiError> {
    if req.items.is_empty() {
        return Err(ApiError::bad_request("Order must contain at least one item"));
    }

    let order_number = generate_order_number();
    let mut tx = state.db.begin().await?;
    insert_order(
        &mut tx,
        &order_number,
        user.user_id,
        &req,
        PaymentMethod::Razorpay,
    )
    .await?;
    tx.commit().await?;

    let gateway_order = state
        .razorpay
        .create_order(
            req.amount,
            &state.config.currency.to_uppercase(),
            &order_number,
        )
        .await?;

    sqlx::query("UPDATE orders SET gateway_ref = $2 WHERE order_number = $1")
        .bind(&order_number)
        .bind(&gateway_order.id)
        .execute(&state.db)
        .await?;

    Ok(Reply::data(gateway_order))
}

#[derive(Debug, Serialize)]
pub struct PaymentStatus {
    pub paid: bool,
    pub status: String,
}

/// Lets the storefront's redirect page poll until the webhook confirms
/// payment.
async fn payment_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_number): Path<String>,
) -> Result<Json<Reply<PaymentStatus>>, ApiError> {
    let row: (bool, String) = sqlx::query_as(
        "SELECT paid, status FROM orders WHERE order_number = $1 AND user_id = $2",
    )
    .bind(&order_number)
    .bind(user.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Order not found"))?;

    Ok(Reply::data(PaymentStatus {
        paid: row.0,
        status: row.1,
    }))
}

async fn all_orders(
    State(state): State<AppState>,
    _admin: StockAdmin,
) -> Result<Json<Reply<Vec<Order>>>, ApiError> {
    let orders: Vec<Order> = sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await?;
    Ok(Reply::data(orders))
}

async fn user_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Reply<Vec<Order>>>, ApiError> {
    let orders: Vec<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user.user_id)
            .fetch_all(&state.db)
            .await?;
    Ok(Reply::data(orders))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub order_number: String,
    pub status: String,
}

async fn update_status(
    State(state): State<AppState>,
    _admin: StockAdmin,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Reply<()>>, ApiError> {
    let status = OrderStatus::parse(&req.status)
        .ok_or_else(|| ApiError::bad_request("Unknown order status"))?;
    let result = sqlx::query(
        "UPDATE orders SET status = $2, updated_at = NOW() WHERE order_number = $1",
    )
    .bind(&req.order_number)
    .bind(status.as_str())
    .execute(&state.db)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Order not found"));
    }
    Ok(Reply::message("Status Updated"))
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub delivery_status: Option<String>,
}

async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_number): Path<String>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<Reply<Order>>, ApiError> {
    let address = req
        .address
        .map(|a| serde_json::to_value(a))
        .transpose()
        .map_err(|e| ApiError::Internal(format!("failed to serialize address: {e}")))?;

    let order: Order = sqlx::query_as(
        "UPDATE orders SET address = COALESCE($3, address), \
         delivery_status = COALESCE($4, delivery_status), updated_at = NOW() \
         WHERE order_number = $1 AND user_id = $2 RETURNING *",
    )
    .bind(&order_number)
    .bind(user.user_id)
    .bind(address)
    .bind(req.delivery_status)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Order not found"))?;

    Ok(Reply::with("Order updated", order))
}

#[derive(Debug, Deserialize)]
pub struct DeleteOrderRequest {
    pub order_number: String,
}

async fn delete_order(
    State(state): State<AppState>,
    _admin: StockAdmin,
    Json(req): Json<DeleteOrderRequest>,
) -> Result<Json<Reply<()>>, ApiError> {
    let result = sqlx::query("DELETE FROM orders WHERE order_number = $1")
        .bind(&req.order_number)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Order not found"));
    }
    Ok(Reply::message("Order deleted successfully"))
}

async fn insert_order(
    tx: &mut Transaction<'_, Postgres>,
    order_number: &str,
    user_id: Uuid,
    req: &PlaceOrderRequest,
    method: PaymentMethod,
) -> Result<(), ApiError> {
    let items = serde_json::to_value(&req.items)
        .map_err(|e| ApiError::Internal(format!("failed to serialize items: {e}")))?;
    let address = serde_json::to_value(&req.address)
        .map_err(|e| ApiError::Internal(format!("failed to serialize address: {e}")))?;

    sqlx::query(
        "INSERT INTO orders (order_number, user_id, items, address, amount, payment_method, paid) \
         VALUES ($1, $2, $3, $4, $5, $6, FALSE)",
    )
    .bind(order_number)
    .bind(user_id)
    .bind(items)
    .bind(address)
    .bind(req.amount)
    .bind(method.as_str())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Decrements stock for every line, flooring at zero, and reports products
/// that ended at or below the restock threshold. Unknown product ids are
/// skipped so an order snapshot can outlive a deleted product.
pub(crate) async fn apply_stock_decrements(
    tx: &mut Transaction<'_, Postgres>,
    items: &[LineItem],
) -> Result<Vec<LowStockProduct>, ApiError> {
    let mut low_stock = Vec::new();
    for item in items {
        let row: Option<(String, i32)> = sqlx::query_as(
            "UPDATE products SET quantity = GREATEST(quantity - $2, 0), updated_at = NOW() \
             WHERE id = $1 RETURNING name, quantity",
        )
        .bind(item.product_id)
        .bind(item.quantity as i32)
        .fetch_optional(&mut **tx)
        .await?;

        if let Some((name, quantity)) = row {
            if is_low_stock(quantity) {
                low_stock.push(LowStockProduct {
                    id: item.product_id,
                    name,
                    quantity,
                });
            }
        }
    }
    Ok(low_stock)
}

pub(crate) async fn clear_cart(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<(), ApiError> {
    sqlx::query("UPDATE users SET cart = '{}', updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub(crate) async fn user_contact(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<(String, String), ApiError> {
    let row: (String, String) = sqlx::query_as("SELECT name, email FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;
    Ok(row)
}

/// Post-commit notifications: confirmation to the customer, restock alerts
/// to the admin address, low-stock events to NATS. Detached so the mail
/// provider's latency never holds the response.
pub(crate) fn notify_fulfillment(
    state: &AppState,
    email: String,
    name: String,
    order_number: String,
    low_stock: Vec<LowStockProduct>,
) {
    let mailer = state.mailer.clone();
    let nats = state.nats.clone();
    tokio::spawn(async move {
        if let Err(err) = mailer
            .send_order_confirmation(&email, &name, &order_number)
            .await
        {
            tracing::warn!("order confirmation email failed: {err}");
        }
        for product in &low_stock {
            if let Err(err) = mailer.send_low_stock(&product.name, product.quantity).await {
                tracing::warn!("low stock email failed: {err}");
            }
            events::publish(
                &nats,
                DomainEvent::LowStock {
                    product_id: product.id,
                    name: product.name.clone(),
                    quantity: product.quantity,
                },
            )
            .await;
        }
    });
}
