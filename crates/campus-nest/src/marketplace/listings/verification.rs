//! Paid verification track: `None | rejected -> pending -> verified | rejected`.
//!
//! Transitions operate on a listing copy; the service persists the result with
//! a compare-and-swap on the previous status so two concurrent completions
//! cannot both apply.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::domain::{ExecutiveVisit, Listing, Verification, VerificationStatus, VisitChecklist};
use crate::auth::Principal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("only the listing owner can request verification")]
    NotOwner,
    #[error("only admins or executives can complete verification")]
    NotStaff,
    #[error("listing must be approved before verification")]
    NotApproved,
    #[error("verification already pending")]
    AlreadyPending,
    #[error("listing already verified")]
    AlreadyVerified,
    #[error("verification is not pending (current: {})", .current.map(VerificationStatus::label).unwrap_or("none"))]
    NotPending { current: Option<VerificationStatus> },
    #[error("payment reference is required")]
    MissingPaymentReference,
}

/// Payment captured before entering the pending state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationPayment {
    pub fee: u32,
    pub payment_id: String,
}

/// Executive report submitted with `complete-verification`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitReport {
    #[serde(default)]
    pub checklist: VisitChecklist,
    pub approve: bool,
    #[serde(default)]
    pub visited_at: Option<DateTime<Utc>>,
}

/// Owner enters the pending state after paying the fee.
pub fn begin(
    listing: &mut Listing,
    principal: &Principal,
    payment: VerificationPayment,
    at: DateTime<Utc>,
) -> Result<(), VerificationError> {
    if !principal.owns(&listing.owner) {
        return Err(VerificationError::NotOwner);
    }
    if !listing.approval.is_approved() {
        return Err(VerificationError::NotApproved);
    }
    match listing.verification_status() {
        Some(VerificationStatus::Pending) => return Err(VerificationError::AlreadyPending),
        Some(VerificationStatus::Verified) => return Err(VerificationError::AlreadyVerified),
        Some(VerificationStatus::Rejected) | None => {}
    }

    let payment_id = payment.payment_id.trim();
    if payment_id.is_empty() {
        return Err(VerificationError::MissingPaymentReference);
    }

    listing.verification = Some(Verification {
        status: VerificationStatus::Pending,
        fee: payment.fee,
        payment_id: payment_id.to_string(),
        paid_at: at,
        visit: None,
    });
    Ok(())
}

/// Staff record the visit and settle a pending verification.
pub fn complete(
    listing: &mut Listing,
    principal: &Principal,
    report: VisitReport,
    at: DateTime<Utc>,
) -> Result<VerificationStatus, VerificationError> {
    if !principal.is_staff() {
        return Err(VerificationError::NotStaff);
    }

    let current = listing.verification_status();
    let verification = match listing.verification.as_mut() {
        Some(verification) if verification.status == VerificationStatus::Pending => verification,
        _ => return Err(VerificationError::NotPending { current }),
    };

    let status = if report.approve {
        VerificationStatus::Verified
    } else {
        VerificationStatus::Rejected
    };

    verification.status = status;
    verification.visit = Some(ExecutiveVisit {
        visited_at: report.visited_at.unwrap_or(at),
        executive: principal.user_id.clone(),
        checklist: report.checklist,
        decided_at: at,
        decided_by: principal.user_id.clone(),
    });

    Ok(status)
}
