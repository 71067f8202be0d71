//! HTTP surface: per-resource routers and the shared response envelope.

pub mod cart;
pub mod deliveries;
pub mod departments;
pub mod employees;
pub mod orders;
pub mod products;
pub mod returns;
pub mod users;
pub mod webhooks;

use axum::{routing::get, Json, Router};
use serde::Serialize;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::state::AppState;

/// Response envelope: `{ success, message?, data? }`.
#[derive(Debug, Serialize)]
pub struct Reply<T = ()> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl Reply<()> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: None,
        })
    }
}

impl<T: Serialize> Reply<T> {
    pub fn data(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data: Some(data),
        })
    }

    pub fn with(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "API Working" }))
        .route("/health", get(health))
        .nest("/api/user", users::router())
        .nest("/api/admin", users::admin_router())
        .nest("/api/product", products::router())
        .nest("/api/cart", cart::router())
        .nest("/api/order", orders::router())
        .nest("/api/webhooks", webhooks::router())
        .nest("/api/deliverys", deliveries::router())
        .nest("/api/employee", employees::router())
        .nest("/api/department", departments::router())
        .nest("/api/return", returns::router())
        .nest_service("/uploads", ServeDir::new(&state.config.uploads_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "backoffice" }))
}
