//! Room bookings with commission pricing and reservation of room-type units.

pub mod domain;
pub mod pricing;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AddOnKit, Booking, BookingId, BookingRequest, BookingStatus, BookingUpdate, PaymentStatus,
};
pub use pricing::{CommissionPolicy, PriceQuote, PricingError};
pub use repository::BookingRepository;
pub use router::booking_router;
pub use service::{BookingService, BookingServiceError};
