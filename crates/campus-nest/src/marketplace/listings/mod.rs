//! Property listings: owner intake with the automated review gate, admin
//! approval decisions, the paid verification track, and the public query path.

pub mod domain;
pub(crate) mod intake;
pub mod moderation;
pub mod repository;
pub mod router;
pub mod service;
pub mod verification;

#[cfg(test)]
mod tests;

pub use domain::{
    AiReview, ApprovalMethod, ApprovalState, ExecutiveVisit, GenderPolicy, GeoPoint, Listing,
    ListingDetails, ListingFilter, ListingId, ListingView, NearbyInstitution, NearbyPlace,
    NearbyPlaces, PropertyKind, Recommendation, RoomType, Verification, VerificationStatus,
    VisitChecklist,
};
pub use intake::IntakeViolation;
pub use moderation::{
    ContentReviewer, HttpContentReviewer, ModerationEngine, ModerationPolicy, ParseFailurePolicy,
    ReviewOutcome, ReviewRequest, ReviewerError,
};
pub use repository::{AdminNotice, AdminNotifier, ListingRepository, NotifyError};
pub use router::listing_router;
pub use service::{ListingService, ListingServiceError, ReviewSummary, SubmissionReceipt};
pub use verification::{VerificationError, VisitReport};
