//! Discussion queries and mutations.

use agora_shared::{CreateDiscussionInput, Discussion, Notification};
use futures::FutureExt;
use serde_json::Value;

use crate::api::ApiClient;
use crate::cache::{read_through, Entry, QueryCache, QueryKey};
use crate::error::{ApiError, MutationError};
use crate::mutation::OptimisticAppend;

pub type DiscussionEntry = Entry<Discussion, CreateDiscussionInput>;

pub fn discussions_key() -> QueryKey {
    QueryKey::new(["discussions"])
}

/// `GET /discussions`, bypassing the cache.
pub async fn get_discussions(api: &ApiClient) -> Result<Vec<Discussion>, ApiError> {
    api.get("/discussions").await
}

pub async fn get_discussion(api: &ApiClient, discussion_id: &str) -> Result<Discussion, ApiError> {
    api.get(&format!("/discussions/{discussion_id}")).await
}

/// The discussion list as the UI sees it, including entries still being
/// created.
pub async fn discussions(
    api: &ApiClient,
    cache: &dyn QueryCache,
) -> Result<Vec<DiscussionEntry>, ApiError> {
    let api = api.clone();
    let fetcher = async move { api.get::<Value>("/discussions").await }.boxed();
    read_through(cache, &discussions_key(), fetcher).await
}

pub async fn create_discussion(
    api: &ApiClient,
    cache: &dyn QueryCache,
    input: CreateDiscussionInput,
) -> Result<Discussion, MutationError> {
    OptimisticAppend::new(cache, api.notifier(), discussions_key(), "Discussion Created")
        .run(input, |input| async move {
            api.post::<Discussion, _>("/discussions", &input).await
        })
        .await
}

pub async fn delete_discussion(
    api: &ApiClient,
    cache: &dyn QueryCache,
    discussion_id: &str,
) -> Result<Discussion, ApiError> {
    let deleted: Discussion = api.delete(&format!("/discussions/{discussion_id}")).await?;
    cache.invalidate(&discussions_key()).await;
    api.notifier().notify(Notification::success("Discussion Deleted"));
    Ok(deleted)
}
