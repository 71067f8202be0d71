//! Razorpay orders and webhook verification.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::payments::{verify_hmac_hex, SignatureError};

const API_BASE: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    /// Minor currency units.
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// Gateway order payload, returned to the storefront so its checkout widget
/// can open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayEvent {
    pub event: String,
    pub payload: serde_json::Value,
}

impl RazorpayEvent {
    /// Gateway order id carried by payment events.
    pub fn order_ref(&self) -> Option<&str> {
        self.payload["payment"]["entity"]["order_id"].as_str()
    }
}

#[derive(Clone)]
pub struct RazorpayClient {
    http: reqwest::Client,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }

    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<RazorpayOrder, ApiError> {
        let response = self
            .http
            .post(format!("{API_BASE}/orders"))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateOrderBody {
                amount,
                currency,
                receipt,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Gateway(format!(
                "razorpay order creation failed ({status}): {body}"
            )));
        }
        Ok(response.json().await?)
    }
}

/// Verifies the `X-Razorpay-Signature` header: hex HMAC-SHA256 of the raw
/// body under the webhook secret.
pub fn verify_signature(
    secret: &str,
    signature_hex: &str,
    payload: &[u8],
) -> Result<(), SignatureError> {
    verify_hmac_hex(secret, payload, signature_hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::sign_hmac_hex;

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"event":"payment.captured"}"#;
        let sig = sign_hmac_hex("rzp_secret", body);
        assert_eq!(verify_signature("rzp_secret", &sig, body), Ok(()));
    }

    #[test]
    fn rejects_tampered_body() {
        let sig = sign_hmac_hex("rzp_secret", br#"{"event":"payment.captured"}"#);
        assert_eq!(
            verify_signature("rzp_secret", &sig, br#"{"event":"payment.failed"}"#),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn event_exposes_gateway_order_id() {
        let event: RazorpayEvent = serde_json::from_str(
            r#"{
                "event": "payment.captured",
                "payload": { "payment": { "entity": { "order_id": "order_abc123" } } }
            }"#,
        )
        .unwrap();
        assert_eq!(event.order_ref(), Some("order_abc123"));
    }
}
