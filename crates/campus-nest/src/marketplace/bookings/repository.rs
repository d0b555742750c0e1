use super::domain::{Booking, BookingId};
use crate::marketplace::RepositoryError;

/// Booking storage. Room availability lives on the listing and is reserved
/// through [`ListingRepository::reserve_room`](crate::marketplace::listings::ListingRepository::reserve_room).
pub trait BookingRepository: Send + Sync {
    fn insert(&self, booking: Booking) -> Result<Booking, RepositoryError>;
    fn fetch(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError>;
    fn update(&self, booking: Booking) -> Result<Booking, RepositoryError>;
    /// Remove and return the booking.
    fn delete(&self, id: &BookingId) -> Result<Booking, RepositoryError>;
}
