//! Marketplace areas: listings (approval + verification), bookings, reviews, likes.

pub mod bookings;
pub mod likes;
pub mod listings;
pub mod reviews;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage failures shared by every repository trait in the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("no units left for room type")]
    Exhausted,
    #[error("record changed concurrently")]
    Stale,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Kinds of items students can review or like. Messes are meal-subscription
/// services, structurally parallel to property listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Property,
    Mess,
}

impl ItemKind {
    pub const fn label(self) -> &'static str {
        match self {
            ItemKind::Property => "property",
            ItemKind::Mess => "mess",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRef {
    pub item_type: ItemKind,
    pub item_id: String,
}

impl ItemRef {
    pub fn new(kind: ItemKind, id: impl Into<String>) -> Self {
        Self {
            item_type: kind,
            item_id: id.into(),
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.item_type.label(), self.item_id)
    }
}

/// Running rating aggregate. Maintained incrementally by the store so a
/// write never needs to re-read the full review set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub total_points: u64,
    pub count: u32,
}

impl RatingSummary {
    pub fn record_new(&mut self, rating: u8) {
        self.total_points += u64::from(rating);
        self.count += 1;
    }

    pub fn record_change(&mut self, previous: u8, current: u8) {
        self.total_points = self.total_points + u64::from(current) - u64::from(previous);
    }

    /// Arithmetic mean rounded to one decimal; zero without reviews.
    pub fn average(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        let mean = self.total_points as f64 / f64::from(self.count);
        ((mean * 10.0).round() / 10.0) as f32
    }
}
