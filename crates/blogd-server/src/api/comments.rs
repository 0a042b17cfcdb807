// ABOUTME: Comment, pending-comment and reply API handlers.
// ABOUTME: Public comments copy the post's title/summary and are mirrored into the pending feed.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use blogd_core::{
    Comment, CommentPatch, ListFilter, NewComment, NewReply, PendingComment, Reply,
};
use blogd_store::StoreError;
use serde::{Deserialize, Serialize};

use crate::api::PostQuery;
use crate::api::posts::Deleted;
use crate::app_state::SharedState;
use crate::envelope::{ApiError, ApiResult, Envelope, require};

#[derive(Debug, Default, Deserialize)]
pub struct SinceQuery {
    /// Unix seconds; defaults to 0, i.e. everything.
    #[serde(default)]
    pub since: i64,
}

/// Acknowledgement for a stored reply.
#[derive(Debug, Serialize)]
pub struct ReplyReceipt {
    pub id: i64,
    pub created_at: String,
}

/// GET /api/v1/comments/public and GET /api/v1/comments - Comments in
/// insertion order, optionally for one post.
pub async fn list_comments(
    State(state): State<SharedState>,
    query: Result<Query<PostQuery>, QueryRejection>,
) -> ApiResult<Vec<Comment>> {
    let Query(query) = query?;
    let comments = state
        .store
        .comments()
        .list(&ListFilter::for_post(query.post_id))?;
    Ok(Envelope::success(comments))
}

/// POST /api/v1/comments/public - Store a visitor comment and queue it in the
/// pending feed.
pub async fn create_comment(
    State(state): State<SharedState>,
    payload: Result<Json<NewComment>, JsonRejection>,
) -> ApiResult<Comment> {
    let Json(new_comment) = payload?;
    require("visitor_name", &new_comment.visitor_name)?;
    require("content", &new_comment.content)?;

    let post = match state.store.posts().get(new_comment.post_id) {
        Ok(post) => Some(post),
        Err(StoreError::NotFound { .. }) => {
            tracing::warn!("comment for unknown post {}", new_comment.post_id);
            None
        }
        Err(e) => return Err(e.into()),
    };

    let comment = state
        .store
        .comments()
        .insert(new_comment.into_comment(post.as_ref()))?;
    // The comment stays stored even if queueing the mirror fails.
    state.store.pending().insert(PendingComment::mirror(&comment))?;

    Ok(Envelope::success(comment))
}

/// PUT /api/v1/comments/{id}
pub async fn update_comment(
    State(state): State<SharedState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CommentPatch>, JsonRejection>,
) -> ApiResult<Comment> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    if let Some(name) = &patch.visitor_name {
        require("visitor_name", name)?;
    }
    if let Some(content) = &patch.content {
        require("content", content)?;
    }
    Ok(Envelope::success(state.store.comments().update(id, patch)?))
}

/// DELETE /api/v1/comments/{id}
pub async fn delete_comment(
    State(state): State<SharedState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Deleted> {
    let Path(id) = id?;
    if !state.store.comments().delete(id)? {
        return Err(ApiError::not_found(format!("comment {}", id)));
    }
    Ok(Envelope::success(Deleted { id }))
}

/// GET /api/v1/comments/pending?since= - Pending comments created at or after `since`.
pub async fn list_pending(
    State(state): State<SharedState>,
    query: Result<Query<SinceQuery>, QueryRejection>,
) -> ApiResult<Vec<PendingComment>> {
    let Query(query) = query?;
    let pending = state
        .store
        .pending()
        .list(&ListFilter::since(query.since))?;
    Ok(Envelope::success(pending))
}

/// GET /api/v1/comments/replies?post_id=
pub async fn list_replies(
    State(state): State<SharedState>,
    query: Result<Query<PostQuery>, QueryRejection>,
) -> ApiResult<Vec<Reply>> {
    let Query(query) = query?;
    let replies = state
        .store
        .replies()
        .list(&ListFilter::for_post(query.post_id))?;
    Ok(Envelope::success(replies))
}

/// POST /api/v1/comments - Store a reply submitted by an integration.
pub async fn create_reply(
    State(state): State<SharedState>,
    payload: Result<Json<NewReply>, JsonRejection>,
) -> ApiResult<ReplyReceipt> {
    let Json(new_reply) = payload?;
    require("author", &new_reply.author)?;
    require("content", &new_reply.content)?;

    let reply = state.store.replies().insert(new_reply.into_reply())?;
    Ok(Envelope::success(ReplyReceipt {
        id: reply.id,
        created_at: reply.created_at,
    }))
}
