use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::UserId;
use crate::marketplace::RatingSummary;

/// Identifier wrapper for property listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub String);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Pg,
    Flat,
    Hostel,
}

impl PropertyKind {
    pub const fn label(self) -> &'static str {
        match self {
            PropertyKind::Pg => "PG",
            PropertyKind::Flat => "Flat",
            PropertyKind::Hostel => "Hostel",
        }
    }
}

/// Occupancy restriction advertised by the owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderPolicy {
    Male,
    Female,
    #[default]
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomType {
    pub label: String,
    pub price: u32,
    pub available: u32,
}

impl RoomType {
    /// Room labels are unique per listing ignoring ASCII case.
    pub fn matches(&self, label: &str) -> bool {
        self.label.eq_ignore_ascii_case(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyPlace {
    pub name: String,
    pub distance_km: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
}

/// Points of interest grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NearbyPlaces {
    pub messes: Vec<NearbyPlace>,
    pub restaurants: Vec<NearbyPlace>,
    pub hospitals: Vec<NearbyPlace>,
    pub transit: Vec<NearbyPlace>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyInstitution {
    pub name: String,
    pub distance_km: f32,
}

/// Owner-supplied content of a listing. Also the submission payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDetails {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    #[serde(default)]
    pub gender: GenderPolicy,
    pub address: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoPoint>,
    pub price: u32,
    #[serde(default)]
    pub deposit: u32,
    #[serde(default)]
    pub room_types: Vec<RoomType>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub nearby_places: NearbyPlaces,
    #[serde(default)]
    pub nearby_institutions: Vec<NearbyInstitution>,
}

impl ListingDetails {
    pub fn room(&self, label: &str) -> Option<&RoomType> {
        self.room_types.iter().find(|room| room.matches(label))
    }
}

/// Which actor produced the latest approval decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalMethod {
    #[serde(rename = "manual")]
    Manual,
    #[serde(rename = "AI")]
    Ai,
}

/// Approval gate. A listing is either pending, approved, or rejected, so the
/// approved and rejected flags can never both be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    Approved {
        method: ApprovalMethod,
        by: Option<UserId>,
        at: DateTime<Utc>,
    },
    Rejected {
        reason: String,
        by: UserId,
        at: DateTime<Utc>,
    },
}

impl ApprovalState {
    pub fn is_approved(&self) -> bool {
        matches!(self, ApprovalState::Approved { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, ApprovalState::Rejected { .. })
    }

    pub fn method(&self) -> Option<ApprovalMethod> {
        match self {
            ApprovalState::Approved { method, .. } => Some(*method),
            ApprovalState::Rejected { .. } => Some(ApprovalMethod::Manual),
            ApprovalState::Pending => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Approve,
    Reject,
    ManualReview,
}

impl Recommendation {
    pub const fn label(self) -> &'static str {
        match self {
            Recommendation::Approve => "APPROVE",
            Recommendation::Reject => "REJECT",
            Recommendation::ManualReview => "MANUAL_REVIEW",
        }
    }
}

/// Record of the latest automated content review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiReview {
    /// False when the reviewer could not be reached.
    pub reviewed: bool,
    pub confidence: u8,
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
    pub analysis: String,
    #[serde(default)]
    pub concerns: Vec<String>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
        }
    }
}

/// Checklist filled in by the executive during the physical visit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisitChecklist {
    pub network_tested: bool,
    pub network_speed_mbps: Option<f32>,
    pub video_recorded: bool,
    pub video_url: Option<String>,
    pub physical_inspection: bool,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveVisit {
    pub visited_at: DateTime<Utc>,
    pub executive: UserId,
    pub checklist: VisitChecklist,
    pub decided_at: DateTime<Utc>,
    pub decided_by: UserId,
}

/// Paid verification track, independent of approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub status: VerificationStatus,
    pub fee: u32,
    pub payment_id: String,
    pub paid_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit: Option<ExecutiveVisit>,
}

/// Stored listing document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub owner: UserId,
    pub details: ListingDetails,
    pub approval: ApprovalState,
    pub ai_review: Option<AiReview>,
    pub verification: Option<Verification>,
    pub rating: RatingSummary,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Only approved listings are returned by the public query path.
    pub fn is_public(&self) -> bool {
        self.approval.is_approved()
    }

    pub fn verification_status(&self) -> Option<VerificationStatus> {
        self.verification.as_ref().map(|verification| verification.status)
    }

    pub fn view(&self) -> ListingView {
        let (rejection_reason, decided_at) = match &self.approval {
            ApprovalState::Pending => (None, None),
            ApprovalState::Approved { at, .. } => (None, Some(*at)),
            ApprovalState::Rejected { reason, at, .. } => (Some(reason.clone()), Some(*at)),
        };

        ListingView {
            id: self.id.clone(),
            owner: self.owner.clone(),
            details: self.details.clone(),
            is_approved: self.approval.is_approved(),
            is_rejected: self.approval.is_rejected(),
            approval_method: self.approval.method(),
            rejection_reason,
            decided_at,
            ai_review: self.ai_review.clone(),
            verification_status: self.verification_status(),
            verification: self.verification.clone(),
            rating: self.rating.average(),
            reviews: self.rating.count,
            created_at: self.created_at,
        }
    }
}

/// API representation exposing the approval gate as flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingView {
    pub id: ListingId,
    pub owner: UserId,
    #[serde(flatten)]
    pub details: ListingDetails,
    pub is_approved: bool,
    pub is_rejected: bool,
    pub approval_method: Option<ApprovalMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    pub ai_review: Option<AiReview>,
    pub verification_status: Option<VerificationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
    pub rating: f32,
    pub reviews: u32,
    pub created_at: DateTime<Utc>,
}

/// Public query filter. Matching is case-insensitive on location text.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingFilter {
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<PropertyKind>,
    pub gender: Option<GenderPolicy>,
    pub max_price: Option<u32>,
}

impl ListingFilter {
    pub fn matches(&self, listing: &Listing) -> bool {
        let details = &listing.details;

        if let Some(needle) = self
            .location
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
        {
            let needle = needle.to_lowercase();
            if !details.location.to_lowercase().contains(&needle)
                && !details.address.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        if self.kind.is_some_and(|kind| kind != details.kind) {
            return false;
        }

        if let Some(gender) = self.gender {
            if details.gender != GenderPolicy::Any && details.gender != gender {
                return false;
            }
        }

        if self.max_price.is_some_and(|max| details.price > max) {
            return false;
        }

        true
    }
}
