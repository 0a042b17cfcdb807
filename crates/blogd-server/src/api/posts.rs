// ABOUTME: Post API handlers: paged listing, lookup, and privileged create/update/delete.
// ABOUTME: Listing is newest first; summaries are derived from content when left blank.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use blogd_core::{ListFilter, NewPost, Page, Paged, Post, PostPatch};
use serde::{Deserialize, Serialize};

use crate::app_state::SharedState;
use crate::envelope::{ApiError, ApiResult, Envelope, require};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub size: Option<usize>,
}

/// Body returned by delete endpoints.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: i64,
}

/// GET /api/v1/posts - One page of posts, newest first.
pub async fn list_posts(
    State(state): State<SharedState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Paged<Post>> {
    let Query(query) = query?;
    let posts = state.store.posts().list(&ListFilter::all())?;
    Ok(Envelope::success(Page::new(query.page, query.size).apply(posts)))
}

/// GET /api/v1/posts/{id}
pub async fn get_post(
    State(state): State<SharedState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Post> {
    let Path(id) = id?;
    Ok(Envelope::success(state.store.posts().get(id)?))
}

/// POST /api/v1/posts
pub async fn create_post(
    State(state): State<SharedState>,
    payload: Result<Json<NewPost>, JsonRejection>,
) -> ApiResult<Post> {
    let Json(new_post) = payload?;
    require("title", &new_post.title)?;
    let post = state.store.posts().insert(new_post.into_post())?;
    Ok(Envelope::success(post))
}

/// PUT /api/v1/posts/{id}
pub async fn update_post(
    State(state): State<SharedState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PostPatch>, JsonRejection>,
) -> ApiResult<Post> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    if let Some(title) = &patch.title {
        require("title", title)?;
    }
    Ok(Envelope::success(state.store.posts().update(id, patch)?))
}

/// DELETE /api/v1/posts/{id}
pub async fn delete_post(
    State(state): State<SharedState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Deleted> {
    let Path(id) = id?;
    if !state.store.posts().delete(id)? {
        return Err(ApiError::not_found(format!("post {}", id)));
    }
    Ok(Envelope::success(Deleted { id }))
}
