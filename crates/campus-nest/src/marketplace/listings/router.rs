use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ListingDetails, ListingFilter, ListingId, ListingView};
use super::repository::{AdminNotifier, ListingRepository};
use super::service::{ListingService, ListingServiceError};
use super::verification::{VerificationError, VisitReport};
use crate::auth::Principal;
use crate::error::error_response;
use crate::marketplace::RepositoryError;

const DEFAULT_PENDING_LIMIT: usize = 50;

/// Router exposing public listing queries, owner submission and verification,
/// and the admin decision endpoints.
pub fn listing_router<R, N>(service: Arc<ListingService<R, N>>) -> Router
where
    R: ListingRepository + 'static,
    N: AdminNotifier + 'static,
{
    Router::new()
        .route(
            "/api/properties",
            get(search_handler::<R, N>).post(submit_handler::<R, N>),
        )
        .route("/api/properties/:id", get(show_handler::<R, N>))
        .route("/api/properties/:id/verify", post(verify_handler::<R, N>))
        .route(
            "/api/admin/properties/pending",
            get(pending_handler::<R, N>),
        )
        .route(
            "/api/admin/properties/:id/approve",
            post(approve_handler::<R, N>),
        )
        .route(
            "/api/admin/properties/:id/reject",
            post(reject_handler::<R, N>),
        )
        .route(
            "/api/admin/properties/:id/ai-review",
            post(ai_review_handler::<R, N>),
        )
        .route(
            "/api/admin/properties/:id/complete-verification",
            post(complete_verification_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VerifyRequest {
    pub payment_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PendingQuery {
    pub limit: Option<usize>,
}

pub(crate) async fn search_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    Query(filter): Query<ListingFilter>,
) -> Response
where
    R: ListingRepository + 'static,
    N: AdminNotifier + 'static,
{
    match service.search(&filter) {
        Ok(listings) => {
            let views: Vec<ListingView> = listings.iter().map(|listing| listing.view()).collect();
            let payload = json!({
                "count": views.len(),
                "properties": views,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => listing_error(err),
    }
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    principal: Principal,
    axum::Json(details): axum::Json<ListingDetails>,
) -> Response
where
    R: ListingRepository + 'static,
    N: AdminNotifier + 'static,
{
    match service.submit(&principal, details).await {
        Ok(receipt) => (StatusCode::CREATED, axum::Json(receipt)).into_response(),
        Err(err) => listing_error(err),
    }
}

pub(crate) async fn show_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    principal: Option<Principal>,
    Path(id): Path<String>,
) -> Response
where
    R: ListingRepository + 'static,
    N: AdminNotifier + 'static,
{
    match service.get(principal.as_ref(), &ListingId(id)) {
        Ok(listing) => (StatusCode::OK, axum::Json(listing.view())).into_response(),
        Err(err) => listing_error(err),
    }
}

pub(crate) async fn verify_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    principal: Principal,
    Path(id): Path<String>,
    axum::Json(request): axum::Json<VerifyRequest>,
) -> Response
where
    R: ListingRepository + 'static,
    N: AdminNotifier + 'static,
{
    match service.begin_verification(&principal, &ListingId(id), &request.payment_id) {
        Ok(listing) => (StatusCode::OK, axum::Json(listing.view())).into_response(),
        Err(err) => listing_error(err),
    }
}

pub(crate) async fn pending_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    principal: Principal,
    Query(query): Query<PendingQuery>,
) -> Response
where
    R: ListingRepository + 'static,
    N: AdminNotifier + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_PENDING_LIMIT);
    match service.pending(&principal, limit) {
        Ok(listings) => {
            let views: Vec<ListingView> = listings.iter().map(|listing| listing.view()).collect();
            let payload = json!({
                "count": views.len(),
                "properties": views,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => listing_error(err),
    }
}

pub(crate) async fn approve_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Response
where
    R: ListingRepository + 'static,
    N: AdminNotifier + 'static,
{
    match service.approve(&principal, &ListingId(id)) {
        Ok(listing) => (StatusCode::OK, axum::Json(listing.view())).into_response(),
        Err(err) => listing_error(err),
    }
}

pub(crate) async fn reject_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    principal: Principal,
    Path(id): Path<String>,
    axum::Json(request): axum::Json<RejectRequest>,
) -> Response
where
    R: ListingRepository + 'static,
    N: AdminNotifier + 'static,
{
    match service.reject(&principal, &ListingId(id), &request.reason) {
        Ok(listing) => (StatusCode::OK, axum::Json(listing.view())).into_response(),
        Err(err) => listing_error(err),
    }
}

pub(crate) async fn ai_review_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Response
where
    R: ListingRepository + 'static,
    N: AdminNotifier + 'static,
{
    match service.rerun_review(&principal, &ListingId(id)).await {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(err) => listing_error(err),
    }
}

pub(crate) async fn complete_verification_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    principal: Principal,
    Path(id): Path<String>,
    axum::Json(report): axum::Json<VisitReport>,
) -> Response
where
    R: ListingRepository + 'static,
    N: AdminNotifier + 'static,
{
    match service.complete_verification(&principal, &ListingId(id), report) {
        Ok(listing) => (StatusCode::OK, axum::Json(listing.view())).into_response(),
        Err(err) => listing_error(err),
    }
}

fn listing_error(err: ListingServiceError) -> Response {
    let status = match &err {
        ListingServiceError::Intake(_)
        | ListingServiceError::MissingReason
        | ListingServiceError::ReviewerDisabled => StatusCode::BAD_REQUEST,
        ListingServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ListingServiceError::NotFound => StatusCode::NOT_FOUND,
        ListingServiceError::Verification(violation) => match violation {
            VerificationError::NotOwner | VerificationError::NotStaff => StatusCode::FORBIDDEN,
            VerificationError::AlreadyPending | VerificationError::AlreadyVerified => {
                StatusCode::CONFLICT
            }
            VerificationError::NotApproved
            | VerificationError::NotPending { .. }
            | VerificationError::MissingPaymentReference => StatusCode::BAD_REQUEST,
        },
        ListingServiceError::Repository(
            RepositoryError::Conflict | RepositoryError::Stale | RepositoryError::Exhausted,
        ) => StatusCode::CONFLICT,
        ListingServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "listing request failed");
    }
    error_response(status, err.to_string(), None)
}
