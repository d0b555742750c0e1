//! In-memory document store backing every repository trait.
//!
//! Each collection sits behind its own mutex; every trait method runs inside a
//! single critical section, which is what gives room reservation, the
//! verification compare-and-swap, and the review aggregate their atomicity.
//! Nothing is persisted across restarts.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::auth::UserId;
use crate::marketplace::bookings::{Booking, BookingId, BookingRepository};
use crate::marketplace::likes::{Like, LikeRepository};
use crate::marketplace::listings::{
    AiReview, ApprovalState, Listing, ListingFilter, ListingId, ListingRepository, Verification,
    VerificationStatus,
};
use crate::marketplace::reviews::{Review, ReviewRepository, ReviewWrite, UpsertOutcome};
use crate::marketplace::{ItemRef, RatingSummary, RepositoryError};

type UserItem = (UserId, ItemRef);

#[derive(Debug, Default)]
struct ReviewTable {
    reviews: HashMap<UserItem, Review>,
    summaries: HashMap<ItemRef, RatingSummary>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    listings: Mutex<BTreeMap<ListingId, Listing>>,
    bookings: Mutex<BTreeMap<BookingId, Booking>>,
    reviews: Mutex<ReviewTable>,
    likes: Mutex<BTreeMap<UserItem, Like>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Readiness probe: every collection lock can be taken.
    pub fn is_healthy(&self) -> bool {
        lock(&self.listings).is_ok()
            && lock(&self.bookings).is_ok()
            && lock(&self.reviews).is_ok()
            && lock(&self.likes).is_ok()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
}

impl ListingRepository for MemoryStore {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError> {
        let mut guard = lock(&self.listings)?;
        if guard.contains_key(&listing.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(listing.id.clone(), listing.clone());
        Ok(listing)
    }

    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        Ok(lock(&self.listings)?.get(id).cloned())
    }

    fn public(&self, filter: &ListingFilter) -> Result<Vec<Listing>, RepositoryError> {
        let guard = lock(&self.listings)?;
        let mut listings: Vec<Listing> = guard
            .values()
            .filter(|listing| listing.is_public() && filter.matches(listing))
            .cloned()
            .collect();
        listings.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(listings)
    }

    fn pending(&self, limit: usize) -> Result<Vec<Listing>, RepositoryError> {
        let guard = lock(&self.listings)?;
        let mut listings: Vec<Listing> = guard
            .values()
            .filter(|listing| listing.approval == ApprovalState::Pending)
            .cloned()
            .collect();
        listings.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        listings.truncate(limit);
        Ok(listings)
    }

    fn set_approval(
        &self,
        id: &ListingId,
        approval: ApprovalState,
        ai_review: Option<AiReview>,
    ) -> Result<Listing, RepositoryError> {
        let mut guard = lock(&self.listings)?;
        let listing = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        listing.approval = approval;
        if ai_review.is_some() {
            listing.ai_review = ai_review;
        }
        Ok(listing.clone())
    }

    fn swap_verification(
        &self,
        id: &ListingId,
        expected: Option<VerificationStatus>,
        next: Verification,
    ) -> Result<Listing, RepositoryError> {
        let mut guard = lock(&self.listings)?;
        let listing = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if listing.verification_status() != expected {
            return Err(RepositoryError::Stale);
        }
        listing.verification = Some(next);
        Ok(listing.clone())
    }

    fn reserve_room(&self, id: &ListingId, room_label: &str) -> Result<u32, RepositoryError> {
        let mut guard = lock(&self.listings)?;
        let listing = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        let room = listing
            .details
            .room_types
            .iter_mut()
            .find(|room| room.matches(room_label))
            .ok_or(RepositoryError::NotFound)?;
        if room.available == 0 {
            return Err(RepositoryError::Exhausted);
        }
        room.available -= 1;
        Ok(room.available)
    }

    fn release_room(&self, id: &ListingId, room_label: &str) -> Result<u32, RepositoryError> {
        let mut guard = lock(&self.listings)?;
        let listing = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        let room = listing
            .details
            .room_types
            .iter_mut()
            .find(|room| room.matches(room_label))
            .ok_or(RepositoryError::NotFound)?;
        room.available = room.available.saturating_add(1);
        Ok(room.available)
    }

    fn set_rating(&self, id: &ListingId, rating: RatingSummary) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.listings)?;
        let listing = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        listing.rating = rating;
        Ok(())
    }
}

impl BookingRepository for MemoryStore {
    fn insert(&self, booking: Booking) -> Result<Booking, RepositoryError> {
        let mut guard = lock(&self.bookings)?;
        if guard.contains_key(&booking.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(booking.id.clone(), booking.clone());
        Ok(booking)
    }

    fn fetch(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        Ok(lock(&self.bookings)?.get(id).cloned())
    }

    fn update(&self, booking: Booking) -> Result<Booking, RepositoryError> {
        let mut guard = lock(&self.bookings)?;
        let slot = guard.get_mut(&booking.id).ok_or(RepositoryError::NotFound)?;
        *slot = booking.clone();
        Ok(booking)
    }

    fn delete(&self, id: &BookingId) -> Result<Booking, RepositoryError> {
        lock(&self.bookings)?
            .remove(id)
            .ok_or(RepositoryError::NotFound)
    }
}

impl ReviewRepository for MemoryStore {
    fn upsert(&self, review: Review) -> Result<ReviewWrite, RepositoryError> {
        let mut guard = lock(&self.reviews)?;
        let table = &mut *guard;
        let key = (review.user.clone(), review.item.clone());
        let summary = table.summaries.entry(review.item.clone()).or_default();

        let (stored, outcome) = match table.reviews.get_mut(&key) {
            Some(existing) => {
                let previous_rating = existing.rating;
                summary.record_change(previous_rating, review.rating);
                existing.rating = review.rating;
                existing.comment = review.comment;
                existing.user_name = review.user_name;
                existing.updated_at = review.updated_at;
                (existing.clone(), UpsertOutcome::Updated { previous_rating })
            }
            None => {
                summary.record_new(review.rating);
                table.reviews.insert(key, review.clone());
                (review, UpsertOutcome::Inserted)
            }
        };

        Ok(ReviewWrite {
            review: stored,
            outcome,
            summary: *summary,
        })
    }

    fn find(&self, user: &UserId, item: &ItemRef) -> Result<Option<Review>, RepositoryError> {
        let guard = lock(&self.reviews)?;
        Ok(guard.reviews.get(&(user.clone(), item.clone())).cloned())
    }

    fn for_item(&self, item: &ItemRef) -> Result<Vec<Review>, RepositoryError> {
        let guard = lock(&self.reviews)?;
        let mut reviews: Vec<Review> = guard
            .reviews
            .values()
            .filter(|review| &review.item == item)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(reviews)
    }

    fn summary(&self, item: &ItemRef) -> Result<RatingSummary, RepositoryError> {
        let guard = lock(&self.reviews)?;
        Ok(guard.summaries.get(item).copied().unwrap_or_default())
    }
}

impl LikeRepository for MemoryStore {
    fn insert(&self, like: Like) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.likes)?;
        let key = (like.user.clone(), like.item.clone());
        if guard.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(key, like);
        Ok(())
    }

    fn remove(&self, user: &UserId, item: &ItemRef) -> Result<bool, RepositoryError> {
        let mut guard = lock(&self.likes)?;
        Ok(guard.remove(&(user.clone(), item.clone())).is_some())
    }

    fn exists(&self, user: &UserId, item: &ItemRef) -> Result<bool, RepositoryError> {
        let guard = lock(&self.likes)?;
        Ok(guard.contains_key(&(user.clone(), item.clone())))
    }

    fn count(&self, item: &ItemRef) -> Result<u64, RepositoryError> {
        let guard = lock(&self.likes)?;
        Ok(guard.keys().filter(|(_, liked)| liked == item).count() as u64)
    }
}
