//! Comment queries and mutations.

use agora_shared::{Comment, CommentWithAuthor, CreateCommentInput, Notification};
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use crate::api::ApiClient;
use crate::cache::{read_through, Entry, QueryCache, QueryKey};
use crate::error::{ApiError, MutationError};
use crate::mutation::OptimisticAppend;

pub type CommentEntry = Entry<CommentWithAuthor, CreateCommentInput>;

#[derive(Serialize)]
struct CommentsQuery<'a> {
    #[serde(rename = "discussionId")]
    discussion_id: &'a str,
}

/// Prefix of every per-discussion comment list.
pub fn all_comments_key() -> QueryKey {
    QueryKey::new(["comments"])
}

pub fn comments_key(discussion_id: &str) -> QueryKey {
    QueryKey::new(["comments", discussion_id])
}

/// `GET /comments?discussionId=...`, bypassing the cache.
pub async fn get_comments(
    api: &ApiClient,
    discussion_id: &str,
) -> Result<Vec<CommentWithAuthor>, ApiError> {
    api.get_with_query("/comments", &CommentsQuery { discussion_id })
        .await
}

pub async fn comments(
    api: &ApiClient,
    cache: &dyn QueryCache,
    discussion_id: &str,
) -> Result<Vec<CommentEntry>, ApiError> {
    let api = api.clone();
    let id = discussion_id.to_string();
    let fetcher = async move {
        api.get_with_query::<Value, _>("/comments", &CommentsQuery { discussion_id: &id })
            .await
    }
    .boxed();
    read_through(cache, &comments_key(discussion_id), fetcher).await
}

pub async fn create_comment(
    api: &ApiClient,
    cache: &dyn QueryCache,
    input: CreateCommentInput,
) -> Result<Comment, MutationError> {
    let key = comments_key(&input.discussion_id);
    OptimisticAppend::new(cache, api.notifier(), key, "Comment Created")
        .run(input, |input| async move {
            api.post::<Comment, _>("/comments", &input).await
        })
        .await
}

pub async fn delete_comment(
    api: &ApiClient,
    cache: &dyn QueryCache,
    discussion_id: &str,
    comment_id: &str,
) -> Result<Comment, ApiError> {
    let deleted: Comment = api.delete(&format!("/comments/{comment_id}")).await?;
    cache.invalidate(&comments_key(discussion_id)).await;
    api.notifier().notify(Notification::success("Comment Deleted"));
    Ok(deleted)
}
