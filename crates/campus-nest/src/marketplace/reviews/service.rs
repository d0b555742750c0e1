use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{ItemReviews, Review, ReviewId, ReviewReceipt, ReviewSubmission, UpsertOutcome};
use super::repository::ReviewRepository;
use crate::auth::Principal;
use crate::events::{EventBus, MarketplaceEvent};
use crate::marketplace::listings::{ListingId, ListingRepository};
use crate::marketplace::{ItemKind, ItemRef, RepositoryError};

static REVIEW_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_review_id() -> ReviewId {
    let id = REVIEW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReviewId(format!("rev-{id:06}"))
}

const MAX_COMMENT_CHARS: usize = 2_000;

pub struct ReviewService<V, L> {
    reviews: Arc<V>,
    listings: Arc<L>,
    events: EventBus,
}

impl<V, L> ReviewService<V, L>
where
    V: ReviewRepository + 'static,
    L: ListingRepository + 'static,
{
    pub fn new(reviews: Arc<V>, listings: Arc<L>, events: EventBus) -> Self {
        Self {
            reviews,
            listings,
            events,
        }
    }

    /// Create or replace the caller's review and refresh the item aggregate.
    /// Property aggregates are mirrored onto the listing.
    pub fn submit(
        &self,
        principal: &Principal,
        submission: ReviewSubmission,
    ) -> Result<ReviewReceipt, ReviewServiceError> {
        let rating = u8::try_from(submission.rating)
            .ok()
            .filter(|rating| (1..=5).contains(rating))
            .ok_or(ReviewServiceError::RatingOutOfRange(submission.rating))?;

        let item_id = submission.item_id.trim();
        if item_id.is_empty() {
            return Err(ReviewServiceError::Invalid("itemId is required"));
        }
        let comment = submission.comment.trim();
        if comment.chars().count() > MAX_COMMENT_CHARS {
            return Err(ReviewServiceError::Invalid("comment is too long"));
        }

        let item = ItemRef::new(submission.item_type, item_id);
        if item.item_type == ItemKind::Property {
            self.listings
                .fetch(&ListingId(item.item_id.clone()))?
                .ok_or(ReviewServiceError::ItemNotFound)?;
        }

        let now = Utc::now();
        let write = self.reviews.upsert(Review {
            id: next_review_id(),
            user: principal.user_id.clone(),
            user_name: principal.name.clone(),
            item: item.clone(),
            rating,
            comment: comment.to_string(),
            created_at: now,
            updated_at: now,
        })?;

        if item.item_type == ItemKind::Property {
            // Copy the latest aggregate, not this write's snapshot: a concurrent
            // review may have landed after our upsert.
            let listing_id = ListingId(item.item_id.clone());
            let mirrored = self
                .reviews
                .summary(&item)
                .and_then(|latest| self.listings.set_rating(&listing_id, latest));
            if let Err(err) = mirrored {
                warn!(item = %item, error = %err, "listing rating mirror failed");
            }
        }

        let updated = matches!(write.outcome, UpsertOutcome::Updated { .. });
        info!(
            item = %item,
            user = %principal.user_id,
            rating,
            updated,
            average = write.summary.average(),
            "review recorded"
        );
        self.events.publish(MarketplaceEvent::ReviewRecorded {
            item_id: item.item_id.clone(),
            user: principal.user_id.clone(),
            rating,
        });

        Ok(ReviewReceipt {
            rating: write.summary.average(),
            reviews: write.summary.count,
            updated,
            review: write.review,
        })
    }

    pub fn list(&self, item: ItemRef) -> Result<ItemReviews, ReviewServiceError> {
        let reviews = self.reviews.for_item(&item)?;
        let summary = self.reviews.summary(&item)?;
        Ok(ItemReviews {
            item,
            rating: summary.average(),
            count: summary.count,
            reviews,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error("rating must be between 1 and 5 (got {0})")]
    RatingOutOfRange(i64),
    #[error("{0}")]
    Invalid(&'static str),
    #[error("reviewed item not found")]
    ItemNotFound,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
