//! Payment gateway clients and webhook signature verification.

pub mod razorpay;
pub mod stripe;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature header")]
    MalformedHeader,

    #[error("signature mismatch")]
    InvalidSignature,

    #[error("timestamp outside tolerance")]
    StaleTimestamp,
}

/// Verifies a hex-encoded HMAC-SHA256 over `data`. Comparison is
/// constant-time via the `Mac` verifier.
pub(crate) fn verify_hmac_hex(
    secret: &str,
    data: &[u8],
    signature_hex: &str,
) -> Result<(), SignatureError> {
    let signature = hex::decode(signature_hex).map_err(|_| SignatureError::MalformedHeader)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidSignature)?;
    mac.update(data);
    mac.verify_slice(&signature)
        .map_err(|_| SignatureError::InvalidSignature)
}

#[cfg(test)]
pub(crate) fn sign_hmac_hex(secret: &str, data: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_round_trip() {
        let sig = sign_hmac_hex("whsec_test", b"payload");
        assert_eq!(verify_hmac_hex("whsec_test", b"payload", &sig), Ok(()));
    }

    #[test]
    fn hmac_rejects_tampered_payload() {
        let sig = sign_hmac_hex("whsec_test", b"payload");
        assert_eq!(
            verify_hmac_hex("whsec_test", b"payload2", &sig),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn hmac_rejects_wrong_secret() {
        let sig = sign_hmac_hex("whsec_test", b"payload");
        assert_eq!(
            verify_hmac_hex("whsec_other", b"payload", &sig),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn hmac_rejects_non_hex_signature() {
        assert_eq!(
            verify_hmac_hex("whsec_test", b"payload", "zz-not-hex"),
            Err(SignatureError::MalformedHeader)
        );
    }
}
