//! Compliance (CSP) review payloads.

use serde::Deserialize;

use crate::{error::AppError, models::status::KycStatus};

/// Decision recorded by a compliance reviewer.
///
/// ```json
/// { "decision": "declined", "reason": "Tax id does not match IRS records" }
/// ```
#[derive(Debug, Deserialize)]
pub struct ReviewKycRequest {
    pub decision: KycStatus,
    pub reason: Option<String>,
}

impl ReviewKycRequest {
    pub fn validate(self) -> Result<Self, AppError> {
        if !self.decision.is_review_decision() {
            return Err(AppError::invalid(format!(
                "`{}` is not a review decision",
                self.decision
            )));
        }
        Ok(self)
    }

    /// Body of the note recorded alongside the decision.
    pub fn note_body(&self) -> String {
        match self.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(reason) => format!("KYC {}: {reason}", self.decision),
            None => format!("KYC {}", self.decision),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn review(decision: KycStatus, reason: Option<&str>) -> ReviewKycRequest {
        ReviewKycRequest {
            decision,
            reason: reason.map(str::to_string),
        }
    }

    #[rstest]
    #[case(KycStatus::Approved, true)]
    #[case(KycStatus::Declined, true)]
    #[case(KycStatus::Review, true)]
    #[case(KycStatus::Submitted, false)]
    #[case(KycStatus::NotStarted, false)]
    fn only_decisions_are_accepted(#[case] decision: KycStatus, #[case] valid: bool) {
        assert_eq!(review(decision, None).validate().is_ok(), valid);
    }

    #[rstest]
    #[case(Some("address mismatch"), "KYC declined: address mismatch")]
    #[case(Some("   "), "KYC declined")]
    #[case(None, "KYC declined")]
    fn note_body_includes_reason(#[case] reason: Option<&str>, #[case] expected: &str) {
        assert_eq!(review(KycStatus::Declined, reason).note_body(), expected);
    }
}
