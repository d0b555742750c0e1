use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    ApprovalMethod, ApprovalState, Listing, ListingDetails, ListingFilter, ListingId, ListingView,
};
use super::intake::{IntakeGuard, IntakeViolation};
use super::moderation::{ModerationEngine, ReviewOutcome};
use super::repository::{AdminNotice, AdminNotifier, ListingRepository};
use super::verification::{self, VerificationError, VerificationPayment, VisitReport};
use crate::auth::Principal;
use crate::config::MarketplaceConfig;
use crate::events::{EventBus, MarketplaceEvent};
use crate::marketplace::{RatingSummary, RepositoryError};

static LISTING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_listing_id() -> ListingId {
    let id = LISTING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ListingId(format!("prop-{id:06}"))
}

/// Service composing intake validation, the moderation gate, the approval and
/// verification transitions, and admin notifications.
pub struct ListingService<R, N> {
    guard: IntakeGuard,
    repository: Arc<R>,
    notifier: Arc<N>,
    moderation: ModerationEngine,
    events: EventBus,
    admin_email: String,
    verification_fee: u32,
}

/// Response to an owner submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub listing: ListingView,
    pub review: ReviewSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&ReviewOutcome> for ReviewSummary {
    fn from(outcome: &ReviewOutcome) -> Self {
        Self {
            outcome: outcome.label(),
            reason: outcome.reason().map(str::to_string),
        }
    }
}

impl<R, N> ListingService<R, N>
where
    R: ListingRepository + 'static,
    N: AdminNotifier + 'static,
{
    pub fn new(
        repository: Arc<R>,
        notifier: Arc<N>,
        moderation: ModerationEngine,
        events: EventBus,
        config: &MarketplaceConfig,
    ) -> Self {
        Self {
            guard: IntakeGuard,
            repository,
            notifier,
            moderation,
            events,
            admin_email: config.admin_email.clone(),
            verification_fee: config.verification_fee,
        }
    }

    /// Validate, review, and persist a new listing owned by the caller.
    pub async fn submit(
        &self,
        principal: &Principal,
        details: ListingDetails,
    ) -> Result<SubmissionReceipt, ListingServiceError> {
        let details = self.guard.sanitize(details)?;
        let outcome = self.moderation.assess(&details).await;
        let now = Utc::now();

        let approval = match &outcome {
            ReviewOutcome::AutoApproved(_) => ApprovalState::Approved {
                method: ApprovalMethod::Ai,
                by: None,
                at: now,
            },
            ReviewOutcome::ManualReview { .. } => ApprovalState::Pending,
        };

        let listing = Listing {
            id: next_listing_id(),
            owner: principal.user_id.clone(),
            details,
            approval,
            ai_review: outcome.review().cloned(),
            verification: None,
            rating: RatingSummary::default(),
            created_at: now,
        };

        let stored = self.repository.insert(listing)?;
        info!(
            listing_id = %stored.id,
            owner = %stored.owner,
            outcome = outcome.label(),
            "listing submitted"
        );

        let warning = match &outcome {
            ReviewOutcome::ManualReview { reason, .. } => {
                self.request_manual_review(&stored, "listing_pending_review", reason)
            }
            ReviewOutcome::AutoApproved(_) => None,
        };

        self.events.publish(MarketplaceEvent::ListingSubmitted {
            listing_id: stored.id.0.clone(),
            owner: stored.owner.clone(),
            approved: stored.is_public(),
        });

        Ok(SubmissionReceipt {
            listing: stored.view(),
            review: ReviewSummary::from(&outcome),
            warning,
        })
    }

    pub fn approve(
        &self,
        principal: &Principal,
        id: &ListingId,
    ) -> Result<Listing, ListingServiceError> {
        require_admin(principal)?;
        self.load(id)?;

        let approval = ApprovalState::Approved {
            method: ApprovalMethod::Manual,
            by: Some(principal.user_id.clone()),
            at: Utc::now(),
        };
        let listing = self.repository.set_approval(id, approval, None)?;
        info!(listing_id = %id, admin = %principal.user_id, "listing approved");

        self.events.publish(MarketplaceEvent::ListingApproved {
            listing_id: id.0.clone(),
            owner: listing.owner.clone(),
            method: "manual".to_string(),
        });
        Ok(listing)
    }

    pub fn reject(
        &self,
        principal: &Principal,
        id: &ListingId,
        reason: &str,
    ) -> Result<Listing, ListingServiceError> {
        require_admin(principal)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ListingServiceError::MissingReason);
        }
        self.load(id)?;

        let approval = ApprovalState::Rejected {
            reason: reason.to_string(),
            by: principal.user_id.clone(),
            at: Utc::now(),
        };
        let listing = self.repository.set_approval(id, approval, None)?;
        info!(listing_id = %id, admin = %principal.user_id, reason, "listing rejected");

        self.events.publish(MarketplaceEvent::ListingRejected {
            listing_id: id.0.clone(),
            owner: listing.owner.clone(),
            reason: reason.to_string(),
        });
        Ok(listing)
    }

    /// Re-run the automated review. A passing verdict approves the listing; any
    /// other outcome keeps the current approval and only refreshes `aiReview`.
    pub async fn rerun_review(
        &self,
        principal: &Principal,
        id: &ListingId,
    ) -> Result<SubmissionReceipt, ListingServiceError> {
        require_admin(principal)?;
        if !self.moderation.is_enabled() {
            return Err(ListingServiceError::ReviewerDisabled);
        }
        let listing = self.load(id)?;

        let outcome = self.moderation.assess(&listing.details).await;
        let approval = match &outcome {
            ReviewOutcome::AutoApproved(_) => ApprovalState::Approved {
                method: ApprovalMethod::Ai,
                by: None,
                at: Utc::now(),
            },
            ReviewOutcome::ManualReview { .. } => listing.approval.clone(),
        };

        let updated = self
            .repository
            .set_approval(id, approval, outcome.review().cloned())?;
        info!(listing_id = %id, outcome = outcome.label(), "listing re-reviewed");

        let warning = match &outcome {
            ReviewOutcome::AutoApproved(_) => {
                self.events.publish(MarketplaceEvent::ListingApproved {
                    listing_id: id.0.clone(),
                    owner: updated.owner.clone(),
                    method: "AI".to_string(),
                });
                None
            }
            ReviewOutcome::ManualReview { reason, .. } => {
                self.request_manual_review(&updated, "listing_rereview_failed", reason)
            }
        };

        Ok(SubmissionReceipt {
            listing: updated.view(),
            review: ReviewSummary::from(&outcome),
            warning,
        })
    }

    pub fn begin_verification(
        &self,
        principal: &Principal,
        id: &ListingId,
        payment_id: &str,
    ) -> Result<Listing, ListingServiceError> {
        let mut listing = self.load(id)?;
        let expected = listing.verification_status();

        verification::begin(
            &mut listing,
            principal,
            VerificationPayment {
                fee: self.verification_fee,
                payment_id: payment_id.to_string(),
            },
            Utc::now(),
        )?;

        let next = listing
            .verification
            .clone()
            .ok_or(ListingServiceError::Repository(RepositoryError::Stale))?;
        let stored = self.repository.swap_verification(id, expected, next)?;
        info!(listing_id = %id, owner = %principal.user_id, "verification requested");

        self.events.publish(MarketplaceEvent::VerificationRequested {
            listing_id: id.0.clone(),
            owner: stored.owner.clone(),
            payment_id: payment_id.trim().to_string(),
        });
        Ok(stored)
    }

    pub fn complete_verification(
        &self,
        principal: &Principal,
        id: &ListingId,
        report: VisitReport,
    ) -> Result<Listing, ListingServiceError> {
        if !principal.is_staff() {
            return Err(VerificationError::NotStaff.into());
        }
        let mut listing = self.load(id)?;
        let expected = listing.verification_status();

        let status = verification::complete(&mut listing, principal, report, Utc::now())?;
        let next = listing
            .verification
            .clone()
            .ok_or(ListingServiceError::Repository(RepositoryError::Stale))?;
        let stored = self.repository.swap_verification(id, expected, next)?;
        info!(
            listing_id = %id,
            executive = %principal.user_id,
            status = status.label(),
            "verification completed"
        );

        self.events.publish(MarketplaceEvent::VerificationCompleted {
            listing_id: id.0.clone(),
            owner: stored.owner.clone(),
            verified: stored.verification_status()
                == Some(super::domain::VerificationStatus::Verified),
        });
        Ok(stored)
    }

    /// Approved listings are visible to everyone; others only to their owner and staff.
    pub fn get(
        &self,
        principal: Option<&Principal>,
        id: &ListingId,
    ) -> Result<Listing, ListingServiceError> {
        let listing = self.load(id)?;
        let privileged =
            principal.is_some_and(|caller| caller.is_staff() || caller.owns(&listing.owner));
        if listing.is_public() || privileged {
            Ok(listing)
        } else {
            Err(ListingServiceError::NotFound)
        }
    }

    pub fn search(&self, filter: &ListingFilter) -> Result<Vec<Listing>, ListingServiceError> {
        Ok(self.repository.public(filter)?)
    }

    pub fn pending(
        &self,
        principal: &Principal,
        limit: usize,
    ) -> Result<Vec<Listing>, ListingServiceError> {
        require_admin(principal)?;
        Ok(self.repository.pending(limit)?)
    }

    fn load(&self, id: &ListingId) -> Result<Listing, ListingServiceError> {
        self.repository
            .fetch(id)?
            .ok_or(ListingServiceError::NotFound)
    }

    /// Email unavailability never fails the request; the failure is returned
    /// as a warning for the response body.
    fn request_manual_review(
        &self,
        listing: &Listing,
        template: &str,
        reason: &str,
    ) -> Option<String> {
        let mut details = BTreeMap::new();
        details.insert("title".to_string(), listing.details.title.clone());
        details.insert("owner".to_string(), listing.owner.0.clone());
        details.insert("location".to_string(), listing.details.location.clone());
        details.insert("reason".to_string(), reason.to_string());

        let notice = AdminNotice {
            template: template.to_string(),
            recipient: self.admin_email.clone(),
            listing_id: listing.id.clone(),
            details,
        };

        match self.notifier.notify(notice) {
            Ok(()) => None,
            Err(err) => {
                warn!(listing_id = %listing.id, error = %err, "admin notification failed");
                Some(format!("admin notification failed: {err}"))
            }
        }
    }
}

fn require_admin(principal: &Principal) -> Result<(), ListingServiceError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(ListingServiceError::Forbidden("admin role required"))
    }
}

/// Error raised by the listing service.
#[derive(Debug, thiserror::Error)]
pub enum ListingServiceError {
    #[error(transparent)]
    Intake(#[from] IntakeViolation),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("listing not found")]
    NotFound,
    #[error("a rejection reason is required")]
    MissingReason,
    #[error("automated review is not configured")]
    ReviewerDisabled,
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ListingServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => ListingServiceError::NotFound,
            other => ListingServiceError::Repository(other),
        }
    }
}
