//! `/discussions` endpoints.

use agora_shared::{CreateDiscussionInput, Discussion, Validate};
use agora_store::TableName;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use tracing::{info, warn};

use crate::api::AppState;
use crate::auth::require_auth;
use crate::error::ServerError;
use crate::{new_id, now_millis};

pub async fn list_discussions(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<Discussion>>, ServerError> {
    let db = state.db.lock().await;
    require_auth(&headers, &db)?;
    Ok(Json(db.discussions.all().to_vec()))
}

pub async fn get_discussion(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(discussion_id): Path<String>,
) -> Result<Json<Discussion>, ServerError> {
    let db = state.db.lock().await;
    require_auth(&headers, &db)?;
    db.discussions
        .find_by_id(&discussion_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("discussion {discussion_id}")))
}

pub async fn create_discussion(
    headers: HeaderMap,
    State(state): State<AppState>,
    payload: Result<Json<CreateDiscussionInput>, JsonRejection>,
) -> Result<Json<Discussion>, ServerError> {
    let mut db = state.db.lock().await;
    let user_id = require_auth(&headers, &db)?.id.clone();
    let Json(input) = payload?;
    let input = input.validate()?;

    let discussion = db.discussions.create(Discussion {
        id: new_id(),
        title: input.title,
        body: input.body,
        created_at: now_millis(),
    })?;
    db.persist(TableName::Discussion)?;

    info!(discussion = %discussion.id, user = %user_id, "Discussion created");
    Ok(Json(discussion))
}

/// Admin only. Comments of the discussion go with it.
pub async fn delete_discussion(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(discussion_id): Path<String>,
) -> Result<Json<Discussion>, ServerError> {
    let mut db = state.db.lock().await;
    let user = require_auth(&headers, &db)?;
    if !user.role.is_elevated() {
        warn!(discussion = %discussion_id, user = %user.id, "Discussion delete denied");
        return Err(ServerError::Forbidden(
            "Only admins can delete discussions".into(),
        ));
    }

    let discussion = db
        .discussions
        .delete_first(|d| d.id == discussion_id)
        .ok_or_else(|| ServerError::NotFound(format!("discussion {discussion_id}")))?;
    let removed_comments = db.comments.delete_many(|c| c.discussion_id == discussion_id);
    db.persist(TableName::Discussion)?;
    db.persist(TableName::Comment)?;

    info!(
        discussion = %discussion.id,
        removed_comments,
        "Discussion deleted"
    );
    Ok(Json(discussion))
}
