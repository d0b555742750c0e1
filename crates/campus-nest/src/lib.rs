//! Listing lifecycle, booking, review, and like services for the Campus Nest
//! student accommodation marketplace.
//!
//! The HTTP surface is assembled from per-area routers (`listings`, `bookings`,
//! `reviews`, `likes`); storage and third-party boundaries sit behind traits so
//! the in-memory store and test doubles can stand in for real backends.

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod marketplace;
pub mod store;
pub mod telemetry;
