//! Shared application state.

use std::sync::Arc;

use crate::config::Config;
use crate::mailer::Mailer;
use crate::payments::{razorpay::RazorpayClient, stripe::StripeClient};

/// State cloned into every handler. All fields are cheap to clone: the pool,
/// NATS client and gateway clients are handles, the config is
/// reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub mailer: Mailer,
    pub nats: Option<async_nats::Client>,
    pub stripe: StripeClient,
    pub razorpay: RazorpayClient,
    pub config: Arc<Config>,
}
