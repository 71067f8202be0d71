//! SMTP notifications.
//!
//! One transport is built at startup and shared through [`crate::state::AppState`].
//! Sends are best-effort: callers either log failures or report them in the
//! response envelope, but a failed email never rolls back the write that
//! triggered it.

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::SmtpConfig;
use crate::models::Delivery;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("invalid mailbox address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    notify: Mailbox,
    app_url: String,
}

impl Mailer {
    pub fn from_config(smtp: &SmtpConfig, app_url: &str) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)?
            .credentials(Credentials::new(
                smtp.username.clone(),
                smtp.password.clone(),
            ))
            .build();
        Ok(Self {
            transport,
            from: smtp.from.parse()?,
            notify: smtp.notify_email.parse()?,
            app_url: app_url.to_string(),
        })
    }

    async fn send(&self, to: Mailbox, subject: &str, html: String) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)?;
        self.transport.send(message).await?;
        Ok(())
    }

    pub async fn send_welcome(&self, email: &str, name: &str) -> Result<(), MailError> {
        let html = format!(
            "<h2>Welcome to Life Threads, {name}!</h2>\
             <p>We're excited to have you on board. You can now log in and \
             explore the latest in style and trends.</p>\
             <p>&ndash; The Life Threads Team</p>"
        );
        self.send(email.parse()?, "Welcome to Life Threads", html)
            .await
    }

    pub async fn send_otp(&self, email: &str, name: &str, code: &str) -> Result<(), MailError> {
        let html = format!(
            "<p>Hello <strong>{name}</strong>,</p>\
             <p>Please use the following code to verify your account:</p>\
             <h2 style=\"letter-spacing:3px\">{code}</h2>\
             <p>This code will expire in 10 minutes.</p>"
        );
        self.send(email.parse()?, "Your one-time code", html).await
    }

    pub async fn send_order_confirmation(
        &self,
        email: &str,
        name: &str,
        order_number: &str,
    ) -> Result<(), MailError> {
        let html = format!(
            "<h2>Thank you for your order, {name}!</h2>\
             <p>Your order has been placed successfully and is being processed.</p>\
             <p><strong>Order ID:</strong> {order_number}</p>\
             <p><a href=\"{}/orders\">Track your order</a></p>",
            self.app_url
        );
        self.send(
            email.parse()?,
            &format!("Your Order Confirmation - {order_number}"),
            html,
        )
        .await
    }

    /// Restock notification sent to the configured admin address.
    pub async fn send_low_stock(&self, product_name: &str, quantity: i32) -> Result<(), MailError> {
        let html = format!(
            "<h2>Low Stock Alert</h2>\
             <p><strong>Product:</strong> {product_name}</p>\
             <p><strong>Current quantity:</strong> {quantity}</p>\
             <p>Please restock this item as soon as possible.</p>"
        );
        self.send(
            self.notify.clone(),
            &format!("Low Stock Alert: {product_name}"),
            html,
        )
        .await
    }

    pub async fn send_delivery_confirmation(&self, delivery: &Delivery) -> Result<(), MailError> {
        let html = format!(
            "<h2>Delivery Confirmation</h2>\
             <p>Hello {first} {last},</p>\
             <p>We have received your delivery information and are processing \
             your request.</p>\
             <p>{street}<br>{city}, {state} {zipcode}<br>{country}</p>\
             <p>Phone: {phone}</p>",
            first = delivery.first_name,
            last = delivery.last_name,
            street = delivery.street,
            city = delivery.city,
            state = delivery.state,
            zipcode = delivery.zipcode,
            country = delivery.country,
            phone = delivery.phone.as_deref().unwrap_or("Not provided"),
        );
        self.send(
            delivery.email.parse()?,
            "Your Delivery Information Has Been Received",
            html,
        )
        .await
    }
}
