use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::config::MarketplaceConfig;
use crate::events::EventBus;
use crate::marketplace::listings::moderation::ModerationPolicy;
use crate::marketplace::listings::{router, ListingService};

fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request builds")
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request builds")
}

#[tokio::test]
async fn submit_requires_session() {
    let (service, _, _) = build_service(None);
    let app = router_with_service(service);

    let body = serde_json::to_value(details()).expect("details serialize");
    let response = app
        .oneshot(json_request("POST", "/api/properties", None, body))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "unauthenticated");
}

#[tokio::test]
async fn submit_route_creates_pending_listing() {
    let (service, _, notifier) = build_service(None);
    let app = router_with_service(service);

    let body = serde_json::to_value(details()).expect("details serialize");
    let response = app
        .oneshot(json_request("POST", "/api/properties", Some("owner-token"), body))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["listing"]["isApproved"], false);
    assert_eq!(payload["listing"]["isRejected"], false);
    assert_eq!(payload["listing"]["type"], "pg");
    assert_eq!(payload["listing"]["owner"], "owner-1");
    assert_eq!(payload["review"]["outcome"], "manual_review");
    assert_eq!(notifier.notices().len(), 1);
}

#[tokio::test]
async fn invalid_submission_maps_to_bad_request() {
    let (service, _, _) = build_service(None);
    let app = router_with_service(service);

    let mut submission = details();
    submission.price = 0;
    let body = serde_json::to_value(submission).expect("details serialize");
    let response = app
        .oneshot(json_request("POST", "/api/properties", Some("owner-token"), body))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn public_query_lists_only_approved() {
    let (service, _, _) = build_service(None);
    approved_listing(&service).await;
    service
        .submit(&owner(), details())
        .await
        .expect("second submission stays pending");
    let app = router_with_service(service);

    let response = app
        .oneshot(empty_request("GET", "/api/properties?location=PUNE&type=pg&maxPrice=9000", None))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["count"], 1);
    assert_eq!(payload["properties"][0]["isApproved"], true);
}

#[tokio::test]
async fn non_admin_cannot_approve() {
    let (service, _, _) = build_service(None);
    let receipt = service
        .submit(&owner(), details())
        .await
        .expect("submission succeeds");
    let app = router_with_service(service);

    let uri = format!("/api/admin/properties/{}/approve", receipt.listing.id);
    let response = app
        .oneshot(empty_request("POST", &uri, Some("exec-token")))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_reject_route_requires_reason() {
    let (service, _, _) = build_service(None);
    let id = approved_listing(&service).await;
    let app = router_with_service(service);

    let uri = format!("/api/admin/properties/{id}/reject");
    let response = app
        .clone()
        .oneshot(json_request("POST", &uri, Some("admin-token"), json!({ "reason": "" })))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request(
            "POST",
            &uri,
            Some("admin-token"),
            json!({ "reason": "Duplicate listing" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["isRejected"], true);
    assert_eq!(payload["isApproved"], false);
    assert_eq!(payload["rejectionReason"], "Duplicate listing");
}

#[tokio::test]
async fn verify_route_maps_state_conflicts() {
    let (service, _, _) = build_service(None);
    let id = approved_listing(&service).await;
    let app = router_with_service(service);

    let uri = format!("/api/properties/{id}/verify");
    let first = app
        .clone()
        .oneshot(json_request("POST", &uri, Some("owner-token"), json!({ "paymentId": "PAY-1" })))
        .await
        .expect("route executes");
    assert_eq!(first.status(), StatusCode::OK);
    let payload = read_json_body(first).await;
    assert_eq!(payload["verificationStatus"], "pending");

    let second = app
        .clone()
        .oneshot(json_request("POST", &uri, Some("owner-token"), json!({ "paymentId": "PAY-2" })))
        .await
        .expect("route executes");
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let stranger = app
        .oneshot(json_request("POST", &uri, Some("student-token"), json!({ "paymentId": "PAY-3" })))
        .await
        .expect("route executes");
    assert_eq!(stranger.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn complete_verification_requires_pending_status() {
    let (service, _, _) = build_service(None);
    let id = approved_listing(&service).await;
    let app = router_with_service(service);

    let uri = format!("/api/admin/properties/{id}/complete-verification");
    let response = app
        .oneshot(json_request(
            "POST",
            &uri,
            Some("exec-token"),
            json!({ "approve": true, "checklist": { "networkTested": true } }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ai_review_route_without_reviewer_is_bad_request() {
    let (service, _, _) = build_service(None);
    let id = approved_listing(&service).await;
    let app = router_with_service(service);

    let uri = format!("/api/admin/properties/{id}/ai-review");
    let response = app
        .oneshot(empty_request("POST", &uri, Some("admin-token")))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pending_queue_is_admin_only() {
    let (service, _, _) = build_service(None);
    service
        .submit(&owner(), details())
        .await
        .expect("submission succeeds");
    let app = router_with_service(service);

    let forbidden = app
        .clone()
        .oneshot(empty_request("GET", "/api/admin/properties/pending", Some("owner-token")))
        .await
        .expect("route executes");
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(empty_request("GET", "/api/admin/properties/pending?limit=5", Some("admin-token")))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["count"], 1);
}

#[tokio::test]
async fn show_handler_returns_internal_error_when_store_is_down() {
    let service = Arc::new(ListingService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryNotifier::default()),
        engine(None, ModerationPolicy::default()),
        EventBus::default(),
        &MarketplaceConfig::default(),
    ));

    let response = router::show_handler::<UnavailableRepository, MemoryNotifier>(
        State(service),
        Some(admin()),
        Path("prop-000001".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn show_route_hides_pending_listing_from_anonymous_callers() {
    let (service, _, _) = build_service(None);
    let receipt = service
        .submit(&owner(), details())
        .await
        .expect("submission succeeds");
    let app = router_with_service(service);

    let uri = format!("/api/properties/{}", receipt.listing.id);
    let anonymous = app
        .clone()
        .oneshot(empty_request("GET", &uri, None))
        .await
        .expect("route executes");
    assert_eq!(anonymous.status(), StatusCode::NOT_FOUND);

    let owner_view = app
        .oneshot(empty_request("GET", &uri, Some("owner-token")))
        .await
        .expect("route executes");
    assert_eq!(owner_view.status(), StatusCode::OK);
}
