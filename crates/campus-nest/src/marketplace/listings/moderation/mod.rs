//! Automated content review gate for new and re-reviewed listings.

mod client;
mod parser;
mod policy;

pub use client::HttpContentReviewer;
pub use parser::{parse_verdict, ParsedVerdict, VerdictParseError};
pub use policy::{ModerationPolicy, ParseFailurePolicy, ReviewOutcome, PARSE_FAILURE_ANALYSIS};

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use super::domain::{GenderPolicy, ListingDetails, RoomType};

/// Structured listing fields sent to the reviewer.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewRequest {
    pub title: String,
    pub description: String,
    pub kind: &'static str,
    pub gender: GenderPolicy,
    pub address: String,
    pub location: String,
    pub price: u32,
    pub deposit: u32,
    pub room_types: Vec<RoomType>,
    pub amenities: Vec<String>,
    pub rules: Vec<String>,
}

impl ReviewRequest {
    pub fn from_details(details: &ListingDetails) -> Self {
        Self {
            title: details.title.clone(),
            description: details.description.clone(),
            kind: details.kind.label(),
            gender: details.gender,
            address: details.address.clone(),
            location: details.location.clone(),
            price: details.price,
            deposit: details.deposit,
            room_types: details.room_types.clone(),
            amenities: details.amenities.clone(),
            rules: details.rules.clone(),
        }
    }

    /// User prompt describing the listing in plain text.
    pub fn prompt(&self) -> String {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "Review this student accommodation listing.");
        let _ = writeln!(prompt, "Title: {}", self.title);
        let _ = writeln!(prompt, "Type: {} ({:?} occupants)", self.kind, self.gender);
        let _ = writeln!(prompt, "Location: {} / {}", self.location, self.address);
        let _ = writeln!(
            prompt,
            "Monthly rent: INR {} | Deposit: INR {}",
            self.price, self.deposit
        );
        if !self.room_types.is_empty() {
            let rooms: Vec<String> = self
                .room_types
                .iter()
                .map(|room| format!("{} @ INR {} ({} available)", room.label, room.price, room.available))
                .collect();
            let _ = writeln!(prompt, "Rooms: {}", rooms.join("; "));
        }
        if !self.amenities.is_empty() {
            let _ = writeln!(prompt, "Amenities: {}", self.amenities.join(", "));
        }
        if !self.rules.is_empty() {
            let _ = writeln!(prompt, "House rules: {}", self.rules.join(", "));
        }
        let _ = writeln!(prompt, "Description: {}", self.description);
        prompt
    }
}

/// Transport-level reviewer failures. An empty or malformed reply is not a
/// transport failure; it is handed to the parser.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewerError {
    #[error("reviewer request timed out")]
    Timeout,
    #[error("reviewer returned HTTP {0}")]
    Status(u16),
    #[error("reviewer transport failed: {0}")]
    Transport(String),
}

/// External text-generation service returning the raw model reply.
#[async_trait]
pub trait ContentReviewer: Send + Sync {
    async fn review(&self, request: &ReviewRequest) -> Result<String, ReviewerError>;
}

/// Applies the moderation policy to whatever the reviewer returns.
#[derive(Clone)]
pub struct ModerationEngine {
    reviewer: Option<Arc<dyn ContentReviewer>>,
    policy: ModerationPolicy,
}

impl ModerationEngine {
    pub fn new(reviewer: Option<Arc<dyn ContentReviewer>>, policy: ModerationPolicy) -> Self {
        Self { reviewer, policy }
    }

    /// Engine without a reviewer: every submission goes to manual review.
    pub fn disabled() -> Self {
        Self::new(None, ModerationPolicy::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.reviewer.is_some()
    }

    pub fn policy(&self) -> &ModerationPolicy {
        &self.policy
    }

    pub async fn assess(&self, details: &ListingDetails) -> ReviewOutcome {
        let Some(reviewer) = &self.reviewer else {
            return ReviewOutcome::ManualReview {
                review: None,
                reason: "automated review not configured".to_string(),
            };
        };

        let request = ReviewRequest::from_details(details);
        let now = Utc::now();
        match reviewer.review(&request).await {
            Ok(reply) => self.policy.decide(parse_verdict(&reply), now),
            Err(err) => {
                tracing::warn!(error = %err, title = %details.title, "content reviewer unavailable");
                self.policy.unavailable(&err, now)
            }
        }
    }
}

impl std::fmt::Debug for ModerationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModerationEngine")
            .field("enabled", &self.is_enabled())
            .field("policy", &self.policy)
            .finish()
    }
}
