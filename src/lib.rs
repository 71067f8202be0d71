//! Storefront back office service.
//!
//! A payments/order REST API covering products, carts, orders, deliveries,
//! employees, departments and return requests, with role-gated JWT
//! authentication, SMTP notifications and hosted-checkout payments confirmed
//! by signed gateway webhooks.

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod mailer;
pub mod models;
pub mod payments;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use state::AppState;
