use crate::infra::{AppState, Marketplace};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use campus_nest::marketplace::bookings::booking_router;
use campus_nest::marketplace::likes::like_router;
use campus_nest::marketplace::listings::listing_router;
use campus_nest::marketplace::reviews::review_router;
use serde_json::json;
use std::sync::atomic::Ordering;

pub(crate) fn with_marketplace_routes(marketplace: Marketplace) -> Router {
    Router::new()
        .merge(listing_router(marketplace.listings))
        .merge(booking_router(marketplace.bookings))
        .merge(review_router(marketplace.reviews))
        .merge(like_router(marketplace.likes))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let started = state.readiness.load(Ordering::Relaxed);
    let store_ok = state.store.is_healthy();

    let (status, label) = match (started, store_ok) {
        (true, true) => (StatusCode::OK, "ready"),
        (false, _) => (StatusCode::SERVICE_UNAVAILABLE, "initializing"),
        (true, false) => (StatusCode::SERVICE_UNAVAILABLE, "degraded"),
    };

    (status, Json(json!({ "status": label })))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
