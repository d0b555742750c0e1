//! Like toggle for properties and messes.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::auth::{Principal, UserId};
use crate::error::error_response;
use crate::marketplace::{ItemRef, RepositoryError};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub user: UserId,
    #[serde(flatten)]
    pub item: ItemRef,
    pub created_at: DateTime<Utc>,
}

/// Response for both the toggle and the status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub liked: bool,
    pub count: u64,
}

/// Like storage with a unique `(user, itemType, itemId)` key.
pub trait LikeRepository: Send + Sync {
    /// Fails with `Conflict` when the key already exists.
    fn insert(&self, like: Like) -> Result<(), RepositoryError>;
    /// Returns whether a like was removed.
    fn remove(&self, user: &UserId, item: &ItemRef) -> Result<bool, RepositoryError>;
    fn exists(&self, user: &UserId, item: &ItemRef) -> Result<bool, RepositoryError>;
    fn count(&self, item: &ItemRef) -> Result<u64, RepositoryError>;
}

pub struct LikeService<K> {
    likes: Arc<K>,
}

impl<K> LikeService<K>
where
    K: LikeRepository + 'static,
{
    pub fn new(likes: Arc<K>) -> Self {
        Self { likes }
    }

    /// Add the caller's like, or remove it when one already exists. A conflict
    /// on insert means a concurrent like landed first, so it is removed.
    pub fn toggle(&self, principal: &Principal, item: ItemRef) -> Result<LikeState, LikeError> {
        let item = normalize(item)?;
        let user = &principal.user_id;

        let liked = if self.likes.exists(user, &item)? {
            self.likes.remove(user, &item)?;
            false
        } else {
            let like = Like {
                user: user.clone(),
                item: item.clone(),
                created_at: Utc::now(),
            };
            match self.likes.insert(like) {
                Ok(()) => true,
                Err(RepositoryError::Conflict) => {
                    debug!(item = %item, user = %user, "like already present, removing");
                    self.likes.remove(user, &item)?;
                    false
                }
                Err(other) => return Err(other.into()),
            }
        };

        let count = self.likes.count(&item)?;
        info!(item = %item, user = %user, liked, count, "like toggled");
        Ok(LikeState { liked, count })
    }

    /// Anonymous callers always see `liked = false`.
    pub fn status(
        &self,
        principal: Option<&Principal>,
        item: ItemRef,
    ) -> Result<LikeState, LikeError> {
        let item = normalize(item)?;
        let liked = match principal {
            Some(caller) => self.likes.exists(&caller.user_id, &item)?,
            None => false,
        };
        let count = self.likes.count(&item)?;
        Ok(LikeState { liked, count })
    }
}

fn normalize(item: ItemRef) -> Result<ItemRef, LikeError> {
    let item_id = item.item_id.trim();
    if item_id.is_empty() {
        return Err(LikeError::MissingItem);
    }
    Ok(ItemRef::new(item.item_type, item_id))
}

#[derive(Debug, thiserror::Error)]
pub enum LikeError {
    #[error("itemId is required")]
    MissingItem,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub fn like_router<K>(service: Arc<LikeService<K>>) -> Router
where
    K: LikeRepository + 'static,
{
    Router::new()
        .route(
            "/api/likes",
            get(status_handler::<K>).post(toggle_handler::<K>),
        )
        .with_state(service)
}

pub(crate) async fn toggle_handler<K>(
    State(service): State<Arc<LikeService<K>>>,
    principal: Principal,
    axum::Json(item): axum::Json<ItemRef>,
) -> Response
where
    K: LikeRepository + 'static,
{
    match service.toggle(&principal, item) {
        Ok(state) => (StatusCode::OK, axum::Json(state)).into_response(),
        Err(err) => like_error(err),
    }
}

pub(crate) async fn status_handler<K>(
    State(service): State<Arc<LikeService<K>>>,
    principal: Option<Principal>,
    Query(item): Query<ItemRef>,
) -> Response
where
    K: LikeRepository + 'static,
{
    match service.status(principal.as_ref(), item) {
        Ok(state) => (StatusCode::OK, axum::Json(state)).into_response(),
        Err(err) => like_error(err),
    }
}

fn like_error(err: LikeError) -> Response {
    match err {
        LikeError::MissingItem => error_response(StatusCode::BAD_REQUEST, err.to_string(), None),
        LikeError::Repository(_) => {
            tracing::error!(error = %err, "like request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), None)
        }
    }
}
