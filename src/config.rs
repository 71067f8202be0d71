//! Environment-driven configuration.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("environment variable {0} has an invalid value")]
    Invalid(&'static str),
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Credentials for one of the bootstrap admin accounts configured in the
/// environment rather than the database.
#[derive(Clone)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    /// Sender mailbox, e.g. `"Life Threads" <noreply@example.com>`.
    pub from: String,
    /// Address receiving low-stock notifications.
    pub notify_email: String,
}

#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
}

#[derive(Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub main_admin: AdminCredentials,
    pub stock_admin: AdminCredentials,
    pub smtp: SmtpConfig,
    pub stripe: StripeConfig,
    pub razorpay: RazorpayConfig,
    pub nats_url: Option<String>,
    pub uploads_dir: PathBuf,
    /// Base URL of the storefront, used for checkout redirect URLs.
    pub app_url: String,
    pub currency: String,
    /// Flat delivery charge in minor currency units.
    pub delivery_charge: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = optional("PORT")
            .map(|v| v.parse().map_err(|_| ConfigError::Invalid("PORT")))
            .transpose()?
            .unwrap_or(8083);

        let delivery_charge = optional("DELIVERY_CHARGE")
            .map(|v| v.parse().map_err(|_| ConfigError::Invalid("DELIVERY_CHARGE")))
            .transpose()?
            .unwrap_or(45_000);

        Ok(Self {
            port,
            database_url: require("DATABASE_URL")?,
            jwt_secret: require("JWT_SECRET")?,
            main_admin: AdminCredentials {
                email: require("ADMIN_EMAIL")?,
                password: require("ADMIN_PASSWORD")?,
            },
            stock_admin: AdminCredentials {
                email: require("STOCK_ADMIN_EMAIL")?,
                password: require("STOCK_ADMIN_PASSWORD")?,
            },
            smtp: SmtpConfig {
                host: require("SMTP_HOST")?,
                username: require("SMTP_USERNAME")?,
                password: require("SMTP_PASSWORD")?,
                from: require("SMTP_FROM")?,
                notify_email: require("ADMIN_NOTIFY_EMAIL")?,
            },
            stripe: StripeConfig {
                secret_key: require("STRIPE_SECRET_KEY")?,
                webhook_secret: require("STRIPE_WEBHOOK_SECRET")?,
            },
            razorpay: RazorpayConfig {
                key_id: require("RAZORPAY_KEY_ID")?,
                key_secret: require("RAZORPAY_KEY_SECRET")?,
                webhook_secret: require("RAZORPAY_WEBHOOK_SECRET")?,
            },
            nats_url: optional("NATS_URL"),
            uploads_dir: optional("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public/uploads")),
            app_url: optional("APP_URL").unwrap_or_else(|| "http://localhost:5173".into()),
            currency: optional("CURRENCY").unwrap_or_else(|| "lkr".into()),
            delivery_charge,
        })
    }
}
