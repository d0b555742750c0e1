use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use super::domain::{BookingId, BookingRequest, BookingUpdate};
use super::repository::BookingRepository;
use super::service::{BookingService, BookingServiceError};
use crate::auth::Principal;
use crate::error::error_response;
use crate::marketplace::listings::ListingRepository;
use crate::marketplace::RepositoryError;

pub fn booking_router<B, L>(service: Arc<BookingService<B, L>>) -> Router
where
    B: BookingRepository + 'static,
    L: ListingRepository + 'static,
{
    Router::new()
        .route("/api/bookings", post(create_handler::<B, L>))
        .route(
            "/api/bookings/:id",
            get(show_handler::<B, L>)
                .put(update_handler::<B, L>)
                .delete(cancel_handler::<B, L>),
        )
        .route("/api/bookings/:id/capture", post(capture_handler::<B, L>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CaptureRequest {
    pub payment_id: String,
}

pub(crate) async fn create_handler<B, L>(
    State(service): State<Arc<BookingService<B, L>>>,
    principal: Principal,
    axum::Json(request): axum::Json<BookingRequest>,
) -> Response
where
    B: BookingRepository + 'static,
    L: ListingRepository + 'static,
{
    match service.create(&principal, request) {
        Ok(booking) => (StatusCode::CREATED, axum::Json(booking)).into_response(),
        Err(err) => booking_error(err),
    }
}

pub(crate) async fn show_handler<B, L>(
    State(service): State<Arc<BookingService<B, L>>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Response
where
    B: BookingRepository + 'static,
    L: ListingRepository + 'static,
{
    match service.get(&principal, &BookingId(id)) {
        Ok(booking) => (StatusCode::OK, axum::Json(booking)).into_response(),
        Err(err) => booking_error(err),
    }
}

pub(crate) async fn update_handler<B, L>(
    State(service): State<Arc<BookingService<B, L>>>,
    principal: Principal,
    Path(id): Path<String>,
    axum::Json(changes): axum::Json<BookingUpdate>,
) -> Response
where
    B: BookingRepository + 'static,
    L: ListingRepository + 'static,
{
    match service.update(&principal, &BookingId(id), changes) {
        Ok(booking) => (StatusCode::OK, axum::Json(booking)).into_response(),
        Err(err) => booking_error(err),
    }
}

pub(crate) async fn cancel_handler<B, L>(
    State(service): State<Arc<BookingService<B, L>>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Response
where
    B: BookingRepository + 'static,
    L: ListingRepository + 'static,
{
    match service.cancel(&principal, &BookingId(id)) {
        Ok(booking) => (StatusCode::OK, axum::Json(booking)).into_response(),
        Err(err) => booking_error(err),
    }
}

pub(crate) async fn capture_handler<B, L>(
    State(service): State<Arc<BookingService<B, L>>>,
    principal: Principal,
    Path(id): Path<String>,
    axum::Json(request): axum::Json<CaptureRequest>,
) -> Response
where
    B: BookingRepository + 'static,
    L: ListingRepository + 'static,
{
    match service.capture_payment(&principal, &BookingId(id), &request.payment_id) {
        Ok(booking) => (StatusCode::OK, axum::Json(booking)).into_response(),
        Err(err) => booking_error(err),
    }
}

fn booking_error(err: BookingServiceError) -> Response {
    let status = match &err {
        BookingServiceError::Invalid(_) | BookingServiceError::Pricing(_) => {
            StatusCode::BAD_REQUEST
        }
        BookingServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        BookingServiceError::NotFound | BookingServiceError::PropertyUnavailable => {
            StatusCode::NOT_FOUND
        }
        BookingServiceError::SoldOut(_)
        | BookingServiceError::Conflict(_)
        | BookingServiceError::Repository(
            RepositoryError::Conflict | RepositoryError::Stale | RepositoryError::Exhausted,
        ) => StatusCode::CONFLICT,
        BookingServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "booking request failed");
    }
    error_response(status, err.to_string(), None)
}
