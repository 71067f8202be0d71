//! Stripe hosted checkout and webhook verification.
//!
//! Checkout sessions are created with the order number as
//! `client_reference_id` so the webhook can find the pending order without
//! trusting anything the storefront reports.

use serde::Deserialize;

use crate::error::ApiError;
use crate::payments::{verify_hmac_hex, SignatureError};

const API_BASE: &str = "https://api.stripe.com/v1";

/// Allowed clock skew for webhook timestamps, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub struct CheckoutLine {
    pub name: String,
    /// Minor currency units.
    pub unit_amount: i64,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
        }
    }

    /// Opens a hosted checkout session. Stripe's API takes form-encoded
    /// bodies with indexed keys for repeated structures.
    pub async fn create_checkout_session(
        &self,
        order_number: &str,
        lines: &[CheckoutLine],
        currency: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, ApiError> {
        let mut params: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("client_reference_id".into(), order_number.into()),
            ("success_url".into(), success_url.into()),
            ("cancel_url".into(), cancel_url.into()),
        ];
        for (i, line) in lines.iter().enumerate() {
            params.push((
                format!("line_items[{i}][price_data][currency]"),
                currency.into(),
            ));
            params.push((
                format!("line_items[{i}][price_data][product_data][name]"),
                line.name.clone(),
            ));
            params.push((
                format!("line_items[{i}][price_data][unit_amount]"),
                line.unit_amount.to_string(),
            ));
            params.push((format!("line_items[{i}][quantity]"), line.quantity.to_string()));
        }

        let response = self
            .http
            .post(format!("{API_BASE}/checkout/sessions"))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Gateway(format!(
                "stripe checkout session failed ({status}): {body}"
            )));
        }
        Ok(response.json().await?)
    }
}

/// Verifies a `Stripe-Signature` header (`t=<ts>,v1=<hex>,...`) against the
/// raw request body. The signed payload is `"<ts>.<body>"`; the timestamp
/// must be within `tolerance_secs` of `now_unix`.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now_unix: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }
    if (now_unix - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::StaleTimestamp);
    }

    let mut signed_payload = timestamp.to_string().into_bytes();
    signed_payload.push(b'.');
    signed_payload.extend_from_slice(payload);

    for signature in signatures {
        if verify_hmac_hex(secret, &signed_payload, signature).is_ok() {
            return Ok(());
        }
    }
    Err(SignatureError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::sign_hmac_hex;

    fn signed_header(secret: &str, ts: i64, body: &[u8]) -> String {
        let mut payload = ts.to_string().into_bytes();
        payload.push(b'.');
        payload.extend_from_slice(body);
        format!("t={ts},v1={}", sign_hmac_hex(secret, &payload))
    }

    #[test]
    fn accepts_valid_signature() {
        let header = signed_header("whsec_test", 1_700_000_000, b"{\"id\":\"evt_1\"}");
        assert_eq!(
            verify_signature("whsec_test", &header, b"{\"id\":\"evt_1\"}", 1_700_000_010, 300),
            Ok(())
        );
    }

    #[test]
    fn rejects_tampered_body() {
        let header = signed_header("whsec_test", 1_700_000_000, b"{\"id\":\"evt_1\"}");
        assert_eq!(
            verify_signature("whsec_test", &header, b"{\"id\":\"evt_2\"}", 1_700_000_010, 300),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let header = signed_header("whsec_test", 1_700_000_000, b"{}");
        assert_eq!(
            verify_signature("whsec_test", &header, b"{}", 1_700_000_000 + 301, 300),
            Err(SignatureError::StaleTimestamp)
        );
    }

    #[test]
    fn rejects_missing_timestamp() {
        assert_eq!(
            verify_signature("whsec_test", "v1=abcdef", b"{}", 0, 300),
            Err(SignatureError::MalformedHeader)
        );
    }
}
