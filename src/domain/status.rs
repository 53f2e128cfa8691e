//! Classification of gateway status strings.
//!
//! Payku reports lifecycle state as a free-form string and has used several
//! spellings per outcome across versions. Classification is case-insensitive
//! and everything outside the two known sets is `Unrecognized`, which the
//! processor treats as an explicit no-op so unknown future states can never
//! destabilize membership state.

/// Status strings that indicate a successful payment/subscription.
const SUCCESS_STATES: &[&str] = &["active", "approved", "authorized", "success", "paid"];

/// Status strings that indicate failure or termination.
const FAILURE_STATES: &[&str] = &["failed", "rejected", "cancelled", "canceled", "expired"];

/// Outcome class of a gateway status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Failure,
    Unrecognized,
}

impl StatusClass {
    /// Classifies a raw status string. `None` and empty classify as
    /// `Unrecognized`.
    pub fn classify(status: Option<&str>) -> Self {
        let Some(status) = status else {
            return StatusClass::Unrecognized;
        };
        let normalized = status.trim().to_ascii_lowercase();
        if SUCCESS_STATES.contains(&normalized.as_str()) {
            StatusClass::Success
        } else if FAILURE_STATES.contains(&normalized.as_str()) {
            StatusClass::Failure
        } else {
            StatusClass::Unrecognized
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_states_classify_as_success() {
        for s in ["active", "approved", "authorized", "success", "paid"] {
            assert_eq!(StatusClass::classify(Some(s)), StatusClass::Success, "{s}");
        }
    }

    #[test]
    fn failure_states_classify_as_failure() {
        for s in ["failed", "rejected", "cancelled", "canceled", "expired"] {
            assert_eq!(StatusClass::classify(Some(s)), StatusClass::Failure, "{s}");
        }
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(StatusClass::classify(Some("SUCCESS")), StatusClass::Success);
        assert_eq!(StatusClass::classify(Some("  Paid ")), StatusClass::Success);
        assert_eq!(StatusClass::classify(Some("Cancelled")), StatusClass::Failure);
    }

    #[test]
    fn unknown_status_is_unrecognized() {
        assert_eq!(StatusClass::classify(Some("queued")), StatusClass::Unrecognized);
        assert_eq!(StatusClass::classify(Some("")), StatusClass::Unrecognized);
        assert_eq!(StatusClass::classify(None), StatusClass::Unrecognized);
    }
}
