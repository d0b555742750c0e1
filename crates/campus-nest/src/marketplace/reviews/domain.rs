use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::UserId;
use crate::marketplace::{ItemKind, ItemRef, RatingSummary};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub String);

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One user's review of one item. A second submission for the same item
/// replaces rating and comment in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub user: UserId,
    pub user_name: String,
    #[serde(flatten)]
    pub item: ItemRef,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert payload. The rating is taken wide so out-of-range values surface as
/// validation errors instead of deserialization failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    pub item_type: ItemKind,
    pub item_id: String,
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated { previous_rating: u8 },
}

/// Result of an upsert, including the aggregate after the write.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewWrite {
    pub review: Review,
    pub outcome: UpsertOutcome,
    pub summary: RatingSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReceipt {
    pub review: Review,
    pub updated: bool,
    pub rating: f32,
    pub reviews: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReviews {
    #[serde(flatten)]
    pub item: ItemRef,
    pub rating: f32,
    pub count: u32,
    pub reviews: Vec<Review>,
}
