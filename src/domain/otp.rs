//! One-time codes for the password-reset flow.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Codes stay valid for ten minutes.
pub const OTP_TTL_MINUTES: i64 = 10;

/// Six-digit numeric code.
pub fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    code.to_string()
}

pub fn expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(OTP_TTL_MINUTES)
}

/// Exact code match and unexpired. Missing fields (e.g. after a reset cleared
/// them) never verify.
pub fn verify(
    stored_code: Option<&str>,
    stored_expiry: Option<DateTime<Utc>>,
    submitted: &str,
    now: DateTime<Utc>,
) -> bool {
    match (stored_code, stored_expiry) {
        (Some(code), Some(expiry)) => code == submitted && now < expiry,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_six_digits() {
        for _ in 0..32 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn verify_requires_exact_match_within_window() {
        let now = Utc::now();
        let expiry = expiry_from(now);
        assert!(verify(Some("123456"), Some(expiry), "123456", now));
        assert!(!verify(Some("123456"), Some(expiry), "654321", now));
    }

    #[test]
    fn verify_fails_after_expiry() {
        let now = Utc::now();
        let expiry = expiry_from(now);
        let later = now + Duration::minutes(OTP_TTL_MINUTES + 1);
        assert!(!verify(Some("123456"), Some(expiry), "123456", later));
    }

    #[test]
    fn verify_fails_when_cleared() {
        let now = Utc::now();
        assert!(!verify(None, None, "123456", now));
    }
}
