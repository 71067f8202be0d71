//! Service entry point: load config, connect, migrate, serve.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backoffice::api;
use backoffice::config::Config;
use backoffice::mailer::Mailer;
use backoffice::payments::{razorpay::RazorpayClient, stripe::StripeClient};
use backoffice::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    tokio::fs::create_dir_all(&config.uploads_dir).await?;

    let mailer = Mailer::from_config(&config.smtp, &config.app_url)?;
    let nats = match &config.nats_url {
        Some(url) => Some(async_nats::connect(url.as_str()).await?),
        None => None,
    };
    let stripe = StripeClient::new(config.stripe.secret_key.clone());
    let razorpay = RazorpayClient::new(
        config.razorpay.key_id.clone(),
        config.razorpay.key_secret.clone(),
    );

    let port = config.port;
    let state = AppState {
        db,
        mailer,
        nats,
        stripe,
        razorpay,
        config: Arc::new(config),
    };

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("backoffice listening on 0.0.0.0:{port}");
    axum::serve(listener, app).await?;
    Ok(())
}
