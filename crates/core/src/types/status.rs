//! Status enums reported by the payment processor.
//!
//! Both enums keep an `Other` catch-all: the processor adds states over time
//! and an unrecognised one must read as "not terminal yet", not as a parse error.

use serde::{Deserialize, Serialize};

/// Whether money has been collected for a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    NoPaymentRequired,
    #[serde(other)]
    Other,
}

impl PaymentStatus {
    /// Returns `true` once funds are captured.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Paid)
    }
}

/// Lifecycle state of a hosted checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Open,
    Complete,
    Expired,
    #[serde(other)]
    Other,
}

impl SessionStatus {
    /// Returns `true` if the session can no longer be paid.
    #[must_use]
    pub const fn is_expired(self) -> bool {
        matches!(self, Self::Expired)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_wire_names() {
        let paid: PaymentStatus = serde_json::from_str("\"paid\"").unwrap();
        assert!(paid.is_paid());

        let free: PaymentStatus = serde_json::from_str("\"no_payment_required\"").unwrap();
        assert_eq!(free, PaymentStatus::NoPaymentRequired);
    }

    #[test]
    fn test_unknown_values_fall_back_to_other() {
        let status: PaymentStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(status, PaymentStatus::Other);
        assert!(!status.is_paid());

        let session: SessionStatus = serde_json::from_str("\"initiated\"").unwrap();
        assert_eq!(session, SessionStatus::Other);
        assert!(!session.is_expired());
    }

    #[test]
    fn test_expired_session() {
        let session: SessionStatus = serde_json::from_str("\"expired\"").unwrap();
        assert!(session.is_expired());
    }
}
