use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use super::domain::ReviewSubmission;
use super::repository::ReviewRepository;
use super::service::{ReviewService, ReviewServiceError};
use crate::auth::Principal;
use crate::error::error_response;
use crate::marketplace::listings::ListingRepository;
use crate::marketplace::ItemRef;

pub fn review_router<V, L>(service: Arc<ReviewService<V, L>>) -> Router
where
    V: ReviewRepository + 'static,
    L: ListingRepository + 'static,
{
    Router::new()
        .route(
            "/api/reviews",
            get(list_handler::<V, L>).post(submit_handler::<V, L>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<V, L>(
    State(service): State<Arc<ReviewService<V, L>>>,
    principal: Principal,
    axum::Json(submission): axum::Json<ReviewSubmission>,
) -> Response
where
    V: ReviewRepository + 'static,
    L: ListingRepository + 'static,
{
    match service.submit(&principal, submission) {
        Ok(receipt) => {
            let status = if receipt.updated {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            (status, axum::Json(receipt)).into_response()
        }
        Err(err) => review_error(err),
    }
}

pub(crate) async fn list_handler<V, L>(
    State(service): State<Arc<ReviewService<V, L>>>,
    Query(item): Query<ItemRef>,
) -> Response
where
    V: ReviewRepository + 'static,
    L: ListingRepository + 'static,
{
    match service.list(item) {
        Ok(reviews) => (StatusCode::OK, axum::Json(reviews)).into_response(),
        Err(err) => review_error(err),
    }
}

fn review_error(err: ReviewServiceError) -> Response {
    let status = match &err {
        ReviewServiceError::RatingOutOfRange(_) | ReviewServiceError::Invalid(_) => {
            StatusCode::BAD_REQUEST
        }
        ReviewServiceError::ItemNotFound => StatusCode::NOT_FOUND,
        ReviewServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "review request failed");
    }
    error_response(status, err.to_string(), None)
}
