//! Per-user reviews of properties and messes with a running rating aggregate.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;


pub use domain::{
    ItemReviews, Review, ReviewId, ReviewReceipt, ReviewSubmission, ReviewWrite, UpsertOutcome,
};
pub use repository::ReviewRepository;
pub use router::review_router;
pub use service::{ReviewService, ReviewServiceError};
