use std::sync::Arc;

use axum::response::Response;
use axum::Extension;
use chrono::Utc;
use serde_json::Value;

use crate::auth::{Principal, Role, Sessions, StaticSessionVerifier};
use crate::events::EventBus;
use crate::marketplace::bookings::{
    booking_router, Booking, BookingId, BookingRepository, BookingRequest, BookingService,
    CommissionPolicy,
};
use crate::marketplace::listings::{
    ApprovalMethod, ApprovalState, GenderPolicy, Listing, ListingDetails, ListingId,
    ListingRepository, NearbyPlaces, PropertyKind, RoomType,
};
use crate::marketplace::{RatingSummary, RepositoryError};
use crate::store::MemoryStore;

pub(super) fn student() -> Principal {
    Principal::new("student-1", Role::User, "Meera")
}

pub(super) fn other_student() -> Principal {
    Principal::new("student-2", Role::User, "Kabir")
}

pub(super) fn admin() -> Principal {
    Principal::new("admin-1", Role::Admin, "Admin")
}

pub(super) fn listing(id: &str, approved: bool) -> Listing {
    Listing {
        id: ListingId(id.to_string()),
        owner: crate::auth::UserId("owner-1".to_string()),
        details: ListingDetails {
            title: "Greenview Flats".to_string(),
            description: "2BHK shared flat".to_string(),
            kind: PropertyKind::Flat,
            gender: GenderPolicy::Any,
            address: "7 Koramangala".to_string(),
            location: "Bengaluru".to_string(),
            coordinates: None,
            price: 10_000,
            deposit: 20_000,
            room_types: vec![
                RoomType {
                    label: "Shared".to_string(),
                    price: 7_000,
                    available: 1,
                },
                RoomType {
                    label: "Private".to_string(),
                    price: 12_000,
                    available: 0,
                },
            ],
            amenities: Vec::new(),
            rules: Vec::new(),
            nearby_places: NearbyPlaces::default(),
            nearby_institutions: Vec::new(),
        },
        approval: if approved {
            ApprovalState::Approved {
                method: ApprovalMethod::Manual,
                by: None,
                at: Utc::now(),
            }
        } else {
            ApprovalState::Pending
        },
        ai_review: None,
        verification: None,
        rating: RatingSummary::default(),
        created_at: Utc::now(),
    }
}

pub(super) fn request(property: &str) -> BookingRequest {
    BookingRequest {
        property_id: ListingId(property.to_string()),
        room_type: None,
        commission_rate: None,
        kit: None,
        guests: 1,
    }
}

pub(super) type TestService = BookingService<MemoryStore, MemoryStore>;

pub(super) fn build_service() -> (TestService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    ListingRepository::insert(&*store, listing("prop-open", true)).expect("seed listing");
    ListingRepository::insert(&*store, listing("prop-hidden", false)).expect("seed listing");
    let service = BookingService::new(
        store.clone(),
        store.clone(),
        CommissionPolicy::default(),
        EventBus::default(),
    );
    (service, store)
}

pub(super) fn available(store: &MemoryStore, property: &str, room: &str) -> u32 {
    ListingRepository::fetch(store, &ListingId(property.to_string()))
        .expect("fetch")
        .and_then(|listing| listing.details.room(room).map(|room| room.available))
        .expect("room present")
}

/// Booking store that refuses every write.
pub(super) struct ReadOnlyBookings;

impl BookingRepository for ReadOnlyBookings {
    fn insert(&self, _booking: Booking) -> Result<Booking, RepositoryError> {
        Err(RepositoryError::Unavailable("bookings offline".to_string()))
    }

    fn fetch(&self, _id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        Ok(None)
    }

    fn update(&self, _booking: Booking) -> Result<Booking, RepositoryError> {
        Err(RepositoryError::Unavailable("bookings offline".to_string()))
    }

    fn delete(&self, _id: &BookingId) -> Result<Booking, RepositoryError> {
        Err(RepositoryError::NotFound)
    }
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    let sessions = Sessions::new(
        StaticSessionVerifier::new()
            .with("student-token", student())
            .with("other-token", other_student())
            .with("admin-token", admin()),
    );
    booking_router(Arc::new(service)).layer(Extension(sessions))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
