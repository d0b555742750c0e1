use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use axum::Extension;
use serde_json::Value;

use crate::auth::{Principal, Role, Sessions, StaticSessionVerifier};
use crate::config::MarketplaceConfig;
use crate::events::EventBus;
use crate::marketplace::listings::domain::{
    AiReview, ApprovalState, GenderPolicy, Listing, ListingDetails, ListingFilter, ListingId,
    NearbyPlaces, PropertyKind, RoomType, Verification, VerificationStatus,
};
use crate::marketplace::listings::moderation::{
    ContentReviewer, ModerationEngine, ModerationPolicy, ReviewRequest, ReviewerError,
};
use crate::marketplace::listings::repository::{
    AdminNotice, AdminNotifier, ListingRepository, NotifyError,
};
use crate::marketplace::listings::{listing_router, ListingService};
use crate::marketplace::{RatingSummary, RepositoryError};
use crate::store::MemoryStore;

pub(super) const PASSING_VERDICT: &str = r#"Here is my assessment:
```json
{"confidence": 85, "score": 75, "recommendation": "APPROVE", "reason": "Complete and plausible", "concerns": []}
```"#;

pub(super) const LOW_CONFIDENCE_VERDICT: &str =
    r#"{"confidence": 60, "score": 90, "recommendation": "APPROVE", "reason": "Sparse description"}"#;

pub(super) fn details() -> ListingDetails {
    ListingDetails {
        title: "  Sunrise PG near FC College  ".to_string(),
        description: "Furnished rooms with meals, 5 minutes from campus.".to_string(),
        kind: PropertyKind::Pg,
        gender: GenderPolicy::Female,
        address: "14 Deccan Gymkhana".to_string(),
        location: "Pune".to_string(),
        coordinates: None,
        price: 8_500,
        deposit: 10_000,
        room_types: vec![
            RoomType {
                label: "Single".to_string(),
                price: 9_500,
                available: 2,
            },
            RoomType {
                label: "Double".to_string(),
                price: 6_500,
                available: 1,
            },
        ],
        amenities: vec!["WiFi".to_string(), " ".to_string(), "Laundry".to_string()],
        rules: vec!["No smoking".to_string()],
        nearby_places: NearbyPlaces::default(),
        nearby_institutions: Vec::new(),
    }
}

pub(super) fn owner() -> Principal {
    Principal::new("owner-1", Role::User, "Asha Owner")
}

pub(super) fn other_user() -> Principal {
    Principal::new("student-9", Role::User, "Ravi Student")
}

pub(super) fn admin() -> Principal {
    Principal::new("admin-1", Role::Admin, "Admin")
}

pub(super) fn executive() -> Principal {
    Principal::new("exec-1", Role::Executive, "Field Exec")
}

/// Reviewer double replaying a fixed reply.
pub(super) struct ScriptedReviewer {
    reply: Result<String, ReviewerError>,
    calls: AtomicUsize,
}

impl ScriptedReviewer {
    pub(super) fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn failing(error: ReviewerError) -> Self {
        Self {
            reply: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentReviewer for ScriptedReviewer {
    async fn review(&self, _request: &ReviewRequest) -> Result<String, ReviewerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

pub(super) fn engine(reviewer: Option<Arc<ScriptedReviewer>>, policy: ModerationPolicy) -> ModerationEngine {
    let reviewer = reviewer.map(|reviewer| reviewer as Arc<dyn ContentReviewer>);
    ModerationEngine::new(reviewer, policy)
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    notices: Mutex<Vec<AdminNotice>>,
}

impl MemoryNotifier {
    pub(super) fn notices(&self) -> Vec<AdminNotice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

impl AdminNotifier for MemoryNotifier {
    fn notify(&self, notice: AdminNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl AdminNotifier for FailingNotifier {
    fn notify(&self, _notice: AdminNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp offline".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl ListingRepository for UnavailableRepository {
    fn insert(&self, _listing: Listing) -> Result<Listing, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn public(&self, _filter: &ListingFilter) -> Result<Vec<Listing>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn pending(&self, _limit: usize) -> Result<Vec<Listing>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn set_approval(
        &self,
        _id: &ListingId,
        _approval: ApprovalState,
        _ai_review: Option<AiReview>,
    ) -> Result<Listing, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn swap_verification(
        &self,
        _id: &ListingId,
        _expected: Option<VerificationStatus>,
        _next: Verification,
    ) -> Result<Listing, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn reserve_room(&self, _id: &ListingId, _room_label: &str) -> Result<u32, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn release_room(&self, _id: &ListingId, _room_label: &str) -> Result<u32, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn set_rating(&self, _id: &ListingId, _rating: RatingSummary) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) type TestService = ListingService<MemoryStore, MemoryNotifier>;

pub(super) fn build_service(
    reviewer: Option<Arc<ScriptedReviewer>>,
) -> (TestService, Arc<MemoryStore>, Arc<MemoryNotifier>) {
    build_service_with(reviewer, ModerationPolicy::default(), EventBus::new(32))
}

pub(super) fn build_service_with(
    reviewer: Option<Arc<ScriptedReviewer>>,
    policy: ModerationPolicy,
    events: EventBus,
) -> (TestService, Arc<MemoryStore>, Arc<MemoryNotifier>) {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = ListingService::new(
        store.clone(),
        notifier.clone(),
        engine(reviewer, policy),
        events,
        &MarketplaceConfig::default(),
    );
    (service, store, notifier)
}

/// Submit without a reviewer (pending) and approve as admin.
pub(super) async fn approved_listing(service: &TestService) -> ListingId {
    let receipt = service
        .submit(&owner(), details())
        .await
        .expect("submission succeeds");
    service
        .approve(&admin(), &receipt.listing.id)
        .expect("admin approves");
    receipt.listing.id
}

pub(super) fn sessions() -> Sessions {
    Sessions::new(
        StaticSessionVerifier::new()
            .with("owner-token", owner())
            .with("student-token", other_user())
            .with("admin-token", admin())
            .with("exec-token", executive()),
    )
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    listing_router(Arc::new(service)).layer(Extension(sessions()))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
