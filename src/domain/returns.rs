//! Return request workflow.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Refunded,
}

impl ReturnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Refunded => "Refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "Approved" => Some(Self::Approved),
            "Rejected" => Some(Self::Rejected),
            "Refunded" => Some(Self::Refunded),
            _ => None,
        }
    }

    /// The owning user may edit or delete a request only while it is pending.
    pub fn is_mutable(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_is_mutable() {
        assert!(ReturnStatus::Pending.is_mutable());
        assert!(!ReturnStatus::Approved.is_mutable());
        assert!(!ReturnStatus::Rejected.is_mutable());
        assert!(!ReturnStatus::Refunded.is_mutable());
    }

    #[test]
    fn status_round_trip() {
        for s in [
            ReturnStatus::Pending,
            ReturnStatus::Approved,
            ReturnStatus::Rejected,
            ReturnStatus::Refunded,
        ] {
            assert_eq!(ReturnStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(ReturnStatus::parse("Lost"), None);
    }
}
