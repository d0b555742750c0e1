use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Extension;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::*;
use crate::auth::{Role, Sessions, StaticSessionVerifier};
use crate::marketplace::ItemKind;
use crate::store::MemoryStore;

fn student(id: &str) -> Principal {
    Principal::new(id, Role::User, id)
}

fn item() -> ItemRef {
    ItemRef::new(ItemKind::Property, "prop-000042")
}

/// Like store whose existence check lags behind inserts, as a replica read would.
#[derive(Default)]
struct LaggingLikes {
    inner: MemoryStore,
}

impl LikeRepository for LaggingLikes {
    fn insert(&self, like: Like) -> Result<(), RepositoryError> {
        self.inner.insert(like)
    }

    fn remove(&self, user: &UserId, item: &ItemRef) -> Result<bool, RepositoryError> {
        self.inner.remove(user, item)
    }

    fn exists(&self, _user: &UserId, _item: &ItemRef) -> Result<bool, RepositoryError> {
        Ok(false)
    }

    fn count(&self, item: &ItemRef) -> Result<u64, RepositoryError> {
        self.inner.count(item)
    }
}

#[test]
fn toggling_twice_restores_the_count() {
    let store = Arc::new(MemoryStore::new());
    let service = LikeService::new(store.clone());
    service
        .toggle(&student("s2"), item())
        .expect("other user likes");

    let before = service.status(None, item()).expect("status").count;
    let liked = service.toggle(&student("s1"), item()).expect("like");
    assert_eq!(liked, LikeState { liked: true, count: before + 1 });

    let unliked = service.toggle(&student("s1"), item()).expect("unlike");
    assert_eq!(unliked, LikeState { liked: false, count: before });
}

#[test]
fn conflict_on_insert_is_treated_as_unlike() {
    let service = LikeService::new(Arc::new(LaggingLikes::default()));

    assert!(service.toggle(&student("s1"), item()).expect("like").liked);
    let second = service.toggle(&student("s1"), item()).expect("toggle");
    assert_eq!(second, LikeState { liked: false, count: 0 });
}

#[test]
fn status_reports_caller_like() {
    let service = LikeService::new(Arc::new(MemoryStore::new()));
    service.toggle(&student("s1"), item()).expect("like");

    let mine = service.status(Some(&student("s1")), item()).expect("status");
    assert_eq!(mine, LikeState { liked: true, count: 1 });

    let anonymous = service.status(None, item()).expect("status");
    assert_eq!(anonymous, LikeState { liked: false, count: 1 });
}

#[test]
fn blank_item_id_is_rejected() {
    let service = LikeService::new(Arc::new(MemoryStore::new()));
    assert!(matches!(
        service.toggle(&student("s1"), ItemRef::new(ItemKind::Mess, "  ")),
        Err(LikeError::MissingItem)
    ));
}

#[tokio::test]
async fn like_routes_toggle_and_report() {
    let sessions = Sessions::new(StaticSessionVerifier::new().with("s1-token", student("s1")));
    let app = like_router(Arc::new(LikeService::new(Arc::new(MemoryStore::new()))))
        .layer(Extension(sessions));

    let toggled = app
        .clone()
        .oneshot(
            Request::post("/api/likes")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, "Bearer s1-token")
                .body(Body::from(
                    serde_json::to_vec(&json!({ "itemType": "mess", "itemId": "mess-3" }))
                        .expect("serialize"),
                ))
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(toggled.status(), StatusCode::OK);

    let unauthenticated = app
        .clone()
        .oneshot(
            Request::post("/api/likes")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"itemType":"mess","itemId":"mess-3"}"#))
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);

    let status = app
        .oneshot(
            Request::get("/api/likes?itemType=mess&itemId=mess-3")
                .header(header::COOKIE, "session=s1-token")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(status.status(), StatusCode::OK);
    let body = axum::body::to_bytes(status.into_body(), 1024)
        .await
        .expect("read body");
    let payload: Value = serde_json::from_slice(&body).expect("json payload");
    assert_eq!(payload, json!({ "liked": true, "count": 1 }));
}
