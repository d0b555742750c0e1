use super::domain::{Review, ReviewWrite};
use crate::auth::UserId;
use crate::marketplace::{ItemRef, RatingSummary, RepositoryError};

/// Review storage. Implementations keep the per-item [`RatingSummary`] in step
/// with the review set inside the same critical section as the upsert.
pub trait ReviewRepository: Send + Sync {
    /// Insert or replace the review keyed by `(review.user, review.item)`.
    /// On replace the stored id and creation time are kept.
    fn upsert(&self, review: Review) -> Result<ReviewWrite, RepositoryError>;
    fn find(&self, user: &UserId, item: &ItemRef) -> Result<Option<Review>, RepositoryError>;
    /// Reviews for an item, newest first.
    fn for_item(&self, item: &ItemRef) -> Result<Vec<Review>, RepositoryError>;
    fn summary(&self, item: &ItemRef) -> Result<RatingSummary, RepositoryError>;
}
