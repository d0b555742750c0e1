use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{
    AiReview, ApprovalState, Listing, ListingFilter, ListingId, Verification, VerificationStatus,
};
use crate::marketplace::{RatingSummary, RepositoryError};

/// Listing storage. Every mutation is a targeted, single-document update so
/// concurrent writers to different sub-states do not overwrite each other.
pub trait ListingRepository: Send + Sync {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError>;
    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError>;
    /// Approved listings matching `filter`, newest first.
    fn public(&self, filter: &ListingFilter) -> Result<Vec<Listing>, RepositoryError>;
    /// Listings awaiting an approval decision, oldest first.
    fn pending(&self, limit: usize) -> Result<Vec<Listing>, RepositoryError>;
    /// Replace the approval state; `ai_review` replaces the stored review when present.
    fn set_approval(
        &self,
        id: &ListingId,
        approval: ApprovalState,
        ai_review: Option<AiReview>,
    ) -> Result<Listing, RepositoryError>;
    /// Compare-and-swap on the verification status. Fails with `Stale` when the
    /// stored status no longer equals `expected`.
    fn swap_verification(
        &self,
        id: &ListingId,
        expected: Option<VerificationStatus>,
        next: Verification,
    ) -> Result<Listing, RepositoryError>;
    /// Decrement a room type's availability when at least one unit is left.
    /// Returns the remaining count.
    fn reserve_room(&self, id: &ListingId, room_label: &str) -> Result<u32, RepositoryError>;
    fn release_room(&self, id: &ListingId, room_label: &str) -> Result<u32, RepositoryError>;
    fn set_rating(&self, id: &ListingId, rating: RatingSummary) -> Result<(), RepositoryError>;
}

/// Outbound notification hook for admins (e-mail adapter in production).
pub trait AdminNotifier: Send + Sync {
    fn notify(&self, notice: AdminNotice) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminNotice {
    pub template: String,
    pub recipient: String,
    pub listing_id: ListingId,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
