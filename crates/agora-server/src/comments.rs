//! `/comments` endpoints.

use agora_shared::{Comment, CommentWithAuthor, CreateCommentInput, Validate};
use agora_store::{TableName, UserRecord};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

use crate::api::AppState;
use crate::auth::require_auth;
use crate::error::ServerError;
use crate::{new_id, now_millis};

#[derive(Debug, Deserialize)]
pub struct CommentsQuery {
    #[serde(default, rename = "discussionId")]
    pub discussion_id: String,
}

/// Comments of one discussion, each with its author joined in.
pub async fn list_comments(
    headers: HeaderMap,
    State(state): State<AppState>,
    query: Result<Query<CommentsQuery>, QueryRejection>,
) -> Result<Json<Vec<CommentWithAuthor>>, ServerError> {
    let Query(query) = query?;
    let db = state.db.lock().await;
    require_auth(&headers, &db)?;

    let comments = db
        .comments
        .find_many(|c| c.discussion_id == query.discussion_id)
        .map(|comment| CommentWithAuthor {
            author: db
                .users
                .find_by_id(&comment.author_id)
                .map(UserRecord::sanitize)
                .into(),
            comment: comment.clone(),
        })
        .collect();

    Ok(Json(comments))
}

pub async fn create_comment(
    headers: HeaderMap,
    State(state): State<AppState>,
    payload: Result<Json<CreateCommentInput>, JsonRejection>,
) -> Result<Json<Comment>, ServerError> {
    let mut db = state.db.lock().await;
    let author_id = require_auth(&headers, &db)?.id.clone();
    let Json(input) = payload?;
    let input = input.validate()?;

    let comment = db.comments.create(Comment {
        id: new_id(),
        body: input.body,
        discussion_id: input.discussion_id,
        author_id,
        created_at: now_millis(),
    })?;
    db.persist(TableName::Comment)?;

    info!(
        comment = %comment.id,
        discussion = %comment.discussion_id,
        author = %comment.author_id,
        "Comment created"
    );
    Ok(Json(comment))
}

/// Users may delete their own comments; admins may delete any.
pub async fn delete_comment(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
) -> Result<Json<Comment>, ServerError> {
    let mut db = state.db.lock().await;
    let user = require_auth(&headers, &db)?.clone();
    let elevated = user.role.is_elevated();

    let deleted = db
        .comments
        .delete_first(|c| c.id == comment_id && (elevated || c.author_id == user.id));

    let Some(comment) = deleted else {
        if db.comments.find_by_id(&comment_id).is_some() {
            warn!(comment = %comment_id, user = %user.id, "Comment delete denied");
            return Err(ServerError::Forbidden(
                "Only the author can delete this comment".into(),
            ));
        }
        return Err(ServerError::NotFound(format!("comment {comment_id}")));
    };
    db.persist(TableName::Comment)?;

    info!(comment = %comment.id, user = %user.id, role = %user.role, "Comment deleted");
    Ok(Json(comment))
}
