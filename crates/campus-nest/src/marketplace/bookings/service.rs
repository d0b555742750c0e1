use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{Booking, BookingId, BookingRequest, BookingStatus, BookingUpdate, PaymentStatus};
use super::pricing::{self, CommissionPolicy, PricingError};
use super::repository::BookingRepository;
use crate::auth::Principal;
use crate::events::{EventBus, MarketplaceEvent};
use crate::marketplace::listings::{ListingId, ListingRepository};
use crate::marketplace::RepositoryError;

static BOOKING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_booking_id() -> BookingId {
    let id = BOOKING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BookingId(format!("bk-{id:06}"))
}

/// Booking lifecycle: pricing, room reservation, payment capture, and
/// cancellation. Listing availability is mutated only through the listing
/// repository's reservation primitives.
pub struct BookingService<B, L> {
    bookings: Arc<B>,
    listings: Arc<L>,
    commission: CommissionPolicy,
    events: EventBus,
}

impl<B, L> BookingService<B, L>
where
    B: BookingRepository + 'static,
    L: ListingRepository + 'static,
{
    pub fn new(
        bookings: Arc<B>,
        listings: Arc<L>,
        commission: CommissionPolicy,
        events: EventBus,
    ) -> Self {
        Self {
            bookings,
            listings,
            commission,
            events,
        }
    }

    pub fn create(
        &self,
        principal: &Principal,
        request: BookingRequest,
    ) -> Result<Booking, BookingServiceError> {
        if request.guests == 0 {
            return Err(BookingServiceError::Invalid(
                "guests must be at least 1".to_string(),
            ));
        }

        let listing = self
            .listings
            .fetch(&request.property_id)?
            .filter(|listing| listing.is_public())
            .ok_or(BookingServiceError::PropertyUnavailable)?;

        let room_type = request
            .room_type
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string);

        let base = pricing::base_price(&listing.details, room_type.as_deref())?;
        let room_type = room_type.map(|label| {
            listing
                .details
                .room(&label)
                .map_or(label, |room| room.label.clone())
        });
        let rate = self.commission.resolve_rate(request.commission_rate)?;
        let kit_price = request.kit.as_ref().map_or(0, |kit| kit.price);
        let quote = pricing::quote(base, rate, kit_price);

        if let Some(label) = room_type.as_deref() {
            match self.listings.reserve_room(&listing.id, label) {
                Ok(remaining) => {
                    info!(listing_id = %listing.id, room_type = label, remaining, "room reserved");
                }
                Err(RepositoryError::Exhausted) => {
                    return Err(BookingServiceError::SoldOut(label.to_string()));
                }
                Err(other) => return Err(other.into()),
            }
        }

        let now = Utc::now();
        let booking = Booking {
            id: next_booking_id(),
            user: principal.user_id.clone(),
            property_id: listing.id.clone(),
            property_title: listing.details.title.clone(),
            room_type: room_type.clone(),
            price: quote.base,
            commission_rate: quote.commission_rate,
            commission_amount: quote.commission_amount,
            kit: request.kit,
            total_amount: quote.total,
            guests: request.guests,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        };

        let stored = match self.bookings.insert(booking) {
            Ok(stored) => stored,
            Err(err) => {
                if let Some(label) = room_type.as_deref() {
                    self.release(&listing.id, label);
                }
                return Err(err.into());
            }
        };

        info!(
            booking_id = %stored.id,
            user = %stored.user,
            total = stored.total_amount,
            commission = stored.commission_amount,
            "booking created"
        );
        self.events.publish(MarketplaceEvent::BookingCreated {
            booking_id: stored.id.0.clone(),
            user: stored.user.clone(),
            total_amount: stored.total_amount,
        });
        Ok(stored)
    }

    /// Record a captured payment and confirm the booking.
    pub fn capture_payment(
        &self,
        principal: &Principal,
        id: &BookingId,
        payment_id: &str,
    ) -> Result<Booking, BookingServiceError> {
        let mut booking = self.load(id)?;
        if !principal.owns(&booking.user) {
            return Err(BookingServiceError::Forbidden(
                "only the booking owner can pay for it",
            ));
        }
        let payment_id = payment_id.trim();
        if payment_id.is_empty() {
            return Err(BookingServiceError::Invalid(
                "payment reference is required".to_string(),
            ));
        }
        if booking.status == BookingStatus::Cancelled {
            return Err(BookingServiceError::Conflict("booking is cancelled"));
        }
        if booking.is_paid() {
            return Err(BookingServiceError::Conflict("booking is already paid"));
        }

        let now = Utc::now();
        booking.payment_status = PaymentStatus::Paid;
        booking.status = BookingStatus::Confirmed;
        booking.payment_id = Some(payment_id.to_string());
        booking.paid_at = Some(now);
        booking.updated_at = now;

        let stored = self.bookings.update(booking)?;
        info!(booking_id = %stored.id, payment_id, "booking payment captured");
        self.events.publish(MarketplaceEvent::BookingConfirmed {
            booking_id: stored.id.0.clone(),
            user: stored.user.clone(),
        });
        Ok(stored)
    }

    pub fn update(
        &self,
        principal: &Principal,
        id: &BookingId,
        changes: BookingUpdate,
    ) -> Result<Booking, BookingServiceError> {
        let mut booking = self.load(id)?;
        let is_owner = principal.owns(&booking.user);
        if !is_owner && !principal.is_admin() {
            return Err(BookingServiceError::Forbidden(
                "only the booking owner or an admin can change it",
            ));
        }
        if changes.guests.is_none() && changes.status.is_none() {
            return Err(BookingServiceError::Invalid("no changes supplied".to_string()));
        }

        if let Some(guests) = changes.guests {
            if !is_owner {
                return Err(BookingServiceError::Forbidden(
                    "only the booking owner can change guests",
                ));
            }
            if booking.status != BookingStatus::Pending {
                return Err(BookingServiceError::Conflict(
                    "guests can only change while the booking is pending",
                ));
            }
            if guests == 0 {
                return Err(BookingServiceError::Invalid(
                    "guests must be at least 1".to_string(),
                ));
            }
            booking.guests = guests;
        }

        let previous_status = booking.status;
        if let Some(status) = changes.status {
            if !principal.is_admin() {
                return Err(BookingServiceError::Forbidden(
                    "only admins can change booking status",
                ));
            }
            if status == BookingStatus::Cancelled {
                return Err(BookingServiceError::Invalid(
                    "use DELETE to cancel a booking".to_string(),
                ));
            }
            if status == BookingStatus::Confirmed && !booking.is_paid() {
                return Err(BookingServiceError::Conflict(
                    "booking cannot be confirmed before payment is captured",
                ));
            }
            if status == BookingStatus::Pending && booking.is_paid() {
                return Err(BookingServiceError::Conflict(
                    "a paid booking cannot return to pending",
                ));
            }
            booking.status = status;
        }

        booking.updated_at = Utc::now();
        let stored = self.bookings.update(booking)?;
        info!(booking_id = %stored.id, status = stored.status.label(), "booking updated");

        if previous_status != BookingStatus::Confirmed && stored.status == BookingStatus::Confirmed
        {
            self.events.publish(MarketplaceEvent::BookingConfirmed {
                booking_id: stored.id.0.clone(),
                user: stored.user.clone(),
            });
        }
        Ok(stored)
    }

    /// Delete the booking and hand its reserved unit back to the room type.
    pub fn cancel(
        &self,
        principal: &Principal,
        id: &BookingId,
    ) -> Result<Booking, BookingServiceError> {
        let booking = self.load(id)?;
        if !principal.owns(&booking.user) && !principal.is_admin() {
            return Err(BookingServiceError::Forbidden(
                "only the booking owner or an admin can cancel it",
            ));
        }

        let mut removed = self.bookings.delete(id)?;
        if let Some(label) = removed.room_type.as_deref() {
            self.release(&removed.property_id, label);
        }
        removed.status = BookingStatus::Cancelled;
        removed.updated_at = Utc::now();

        info!(booking_id = %removed.id, cancelled_by = %principal.user_id, "booking cancelled");
        self.events.publish(MarketplaceEvent::BookingCancelled {
            booking_id: removed.id.0.clone(),
            user: removed.user.clone(),
        });
        Ok(removed)
    }

    pub fn get(&self, principal: &Principal, id: &BookingId) -> Result<Booking, BookingServiceError> {
        let booking = self.load(id)?;
        if principal.owns(&booking.user) || principal.is_admin() {
            Ok(booking)
        } else {
            Err(BookingServiceError::Forbidden(
                "only the booking owner or an admin can view it",
            ))
        }
    }

    fn load(&self, id: &BookingId) -> Result<Booking, BookingServiceError> {
        self.bookings.fetch(id)?.ok_or(BookingServiceError::NotFound)
    }

    fn release(&self, listing_id: &ListingId, label: &str) {
        match self.listings.release_room(listing_id, label) {
            Ok(available) => info!(listing_id = %listing_id, room_type = label, available, "room released"),
            Err(err) => warn!(listing_id = %listing_id, room_type = label, error = %err, "room release failed"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingServiceError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("booking not found")]
    NotFound,
    #[error("property not found or not available for booking")]
    PropertyUnavailable,
    #[error("room type '{0}' is sold out")]
    SoldOut(String),
    #[error("{0}")]
    Conflict(&'static str),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for BookingServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => BookingServiceError::NotFound,
            other => BookingServiceError::Repository(other),
        }
    }
}
