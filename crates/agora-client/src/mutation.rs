//! Optimistic create mutations.
//!
//! [`OptimisticAppend::run`] validates the input, then:
//!
//! 1. cancels in-flight reads of the list and snapshots it,
//! 2. appends the pending entity to the cached list,
//! 3. sends the request,
//! 4. on failure restores the snapshot, on success marks the list stale
//!    and publishes a success notification.
//!
//! Steps 1 and 2 happen in one atomic cache update, after the cancel.

use std::future::Future;

use agora_shared::{Notification, Validate};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{QueryCache, QueryKey};
use crate::error::{ApiError, MutationError};
use crate::notifications::Notifier;

pub struct OptimisticAppend<'a> {
    cache: &'a dyn QueryCache,
    notifier: &'a dyn Notifier,
    key: QueryKey,
    success_title: &'static str,
}

impl<'a> OptimisticAppend<'a> {
    pub fn new(
        cache: &'a dyn QueryCache,
        notifier: &'a dyn Notifier,
        key: QueryKey,
        success_title: &'static str,
    ) -> Self {
        Self {
            cache,
            notifier,
            key,
            success_title,
        }
    }

    /// Run the mutation. `send` performs the request; its error is returned
    /// to the caller after the rollback.
    pub async fn run<I, T, F, Fut>(&self, input: I, send: F) -> Result<T, MutationError>
    where
        I: Validate + Serialize,
        F: FnOnce(I) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let input = input.validate().map_err(MutationError::Validation)?;
        let pending = serde_json::to_value(&input)?;

        self.cache.cancel(&self.key).await;

        let appended = pending.clone();
        let previous = self
            .cache
            .update(
                &self.key,
                Box::new(move |current: Option<&Value>| Some(append(current, appended))),
            )
            .await;
        let optimistic = append(previous.as_ref(), pending.clone());
        debug!(key = %self.key, "optimistic entry applied");

        match send(input).await {
            Ok(created) => {
                self.cache.invalidate(&self.key).await;
                self.notifier.notify(Notification::success(self.success_title));
                Ok(created)
            }
            Err(err) => {
                self.rollback(previous, optimistic, pending).await;
                Err(err.into())
            }
        }
    }

    async fn rollback(&self, previous: Option<Value>, optimistic: Value, pending: Value) {
        warn!(key = %self.key, "mutation failed, rolling back optimistic entry");
        self.cache
            .update(
                &self.key,
                Box::new(move |current: Option<&Value>| {
                    rolled_back(current, previous, &optimistic, &pending)
                }),
            )
            .await;
    }
}

/// `current` with `item` appended; a missing or non-list value counts as
/// an empty list.
fn append(current: Option<&Value>, item: Value) -> Value {
    let mut items = match current {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    items.push(item);
    Value::Array(items)
}

/// The value to restore after a failed mutation.
///
/// If nothing touched the list since the optimistic apply, that is exactly
/// the pre-mutation snapshot. Otherwise only this mutation's pending entry
/// is removed, so concurrent optimistic entries survive.
fn rolled_back(
    current: Option<&Value>,
    previous: Option<Value>,
    optimistic: &Value,
    pending: &Value,
) -> Option<Value> {
    match current {
        Some(value) if value == optimistic => previous,
        Some(Value::Array(items)) => {
            let mut items = items.clone();
            if let Some(index) = items.iter().rposition(|item| item == pending) {
                items.remove(index);
            }
            Some(Value::Array(items))
        }
        other => other.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use agora_shared::{CreateDiscussionInput, NotificationKind};
    use serde_json::json;
    use tokio::sync::oneshot;

    use super::*;
    use crate::cache::MemoryQueryCache;
    use crate::notifications::NotificationStore;

    fn key() -> QueryKey {
        QueryKey::new(["discussions"])
    }

    fn input(title: &str) -> CreateDiscussionInput {
        CreateDiscussionInput {
            title: title.into(),
            body: "body".into(),
        }
    }

    async fn never_sent(_: CreateDiscussionInput) -> Result<(), ApiError> {
        panic!("request must not be sent")
    }

    fn saved() -> Value {
        json!([{ "id": "d1", "title": "First", "body": "b", "createdAt": 1 }])
    }

    #[test]
    fn rollback_removes_only_its_own_entry_when_list_moved_on() {
        let mine = json!({ "title": "mine" });
        let theirs = json!({ "title": "theirs" });
        let optimistic = json!([mine.clone()]);
        let current = json!([mine.clone(), theirs.clone()]);

        let restored = rolled_back(Some(&current), None, &optimistic, &mine);
        assert_eq!(restored, Some(json!([theirs])));
    }

    #[test]
    fn rollback_restores_absent_snapshot_as_absent() {
        let mine = json!({ "title": "mine" });
        let optimistic = json!([mine.clone()]);
        assert_eq!(rolled_back(Some(&optimistic), None, &optimistic, &mine), None);
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_cache_or_network() {
        let cache = MemoryQueryCache::new();
        let notifier = NotificationStore::new();
        cache.set(&key(), saved()).await;

        let mutation = OptimisticAppend::new(&cache, &notifier, key(), "Discussion Created");
        let err = mutation.run(input(""), never_sent).await.unwrap_err();

        assert_eq!(err.field_errors().unwrap().get("title"), Some("Required"));
        assert_eq!(cache.get(&key()).await, Some(saved()));
        assert!(notifier.list().is_empty());
    }

    #[tokio::test]
    async fn pending_entry_is_visible_before_the_response() {
        let cache = Arc::new(MemoryQueryCache::new());
        let notifier = Arc::new(NotificationStore::new());
        cache.set(&key(), saved()).await;

        let (respond, response) = oneshot::channel::<Result<(), ApiError>>();
        let (sent, request_sent) = oneshot::channel::<()>();

        let task = {
            let cache = cache.clone();
            let notifier = notifier.clone();
            tokio::spawn(async move {
                let mutation =
                    OptimisticAppend::new(cache.as_ref(), notifier.as_ref(), key(), "Discussion Created");
                mutation
                    .run(input("Second"), |_| async move {
                        let _ = sent.send(());
                        response.await.unwrap_or(Err(ApiError::Cancelled))
                    })
                    .await
            })
        };

        request_sent.await.unwrap();
        let during = cache.get(&key()).await.unwrap();
        assert_eq!(during.as_array().unwrap().len(), 2);
        assert_eq!(during[1], json!({ "title": "Second", "body": "body" }));
        assert!(notifier.list().is_empty());

        respond.send(Ok(())).unwrap();
        task.await.unwrap().unwrap();

        assert!(cache.is_stale(&key()).await);
        let notes = notifier.list();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].notification.kind, NotificationKind::Success);
        assert_eq!(notes[0].notification.title, "Discussion Created");
    }

    #[tokio::test]
    async fn failure_restores_the_exact_snapshot() {
        let cache = MemoryQueryCache::new();
        let notifier = NotificationStore::new();
        cache.set(&key(), saved()).await;

        let mutation = OptimisticAppend::new(&cache, &notifier, key(), "Discussion Created");
        let err = mutation
            .run(input("Doomed"), |_| async {
                Err::<(), _>(ApiError::Http {
                    status: 500,
                    message: "Server Error".into(),
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, MutationError::Api(ApiError::Http { status: 500, .. })));
        assert_eq!(cache.get(&key()).await, Some(saved()));
        assert!(!cache.is_stale(&key()).await);
        assert!(notifier.list().is_empty());
    }

    #[tokio::test]
    async fn failure_with_no_prior_list_leaves_no_list() {
        let cache = MemoryQueryCache::new();
        let notifier = NotificationStore::new();

        let mutation = OptimisticAppend::new(&cache, &notifier, key(), "Discussion Created");
        let _ = mutation
            .run(input("Doomed"), |_| async { Err::<(), _>(ApiError::Cancelled) })
            .await;

        assert_eq!(cache.get(&key()).await, None);
    }

    #[tokio::test]
    async fn concurrent_rollback_keeps_the_other_pending_entry() {
        let cache = Arc::new(MemoryQueryCache::new());
        let notifier = Arc::new(NotificationStore::new());
        cache.set(&key(), saved()).await;

        let (fail_first, first_response) = oneshot::channel::<()>();
        let (first_sent_tx, first_sent) = oneshot::channel::<()>();
        let (finish_second, second_response) = oneshot::channel::<()>();
        let (second_sent_tx, second_sent) = oneshot::channel::<()>();

        let first = {
            let (cache, notifier) = (cache.clone(), notifier.clone());
            tokio::spawn(async move {
                OptimisticAppend::new(cache.as_ref(), notifier.as_ref(), key(), "Discussion Created")
                    .run(input("First pending"), |_| async move {
                        let _ = first_sent_tx.send(());
                        let _ = first_response.await;
                        Err::<(), _>(ApiError::Transport("connection reset".into()))
                    })
                    .await
            })
        };
        first_sent.await.unwrap();

        let second = {
            let (cache, notifier) = (cache.clone(), notifier.clone());
            tokio::spawn(async move {
                OptimisticAppend::new(cache.as_ref(), notifier.as_ref(), key(), "Discussion Created")
                    .run(input("Second pending"), |_| async move {
                        let _ = second_sent_tx.send(());
                        let _ = second_response.await;
                        Ok(())
                    })
                    .await
            })
        };
        second_sent.await.unwrap();
        assert_eq!(cache.get(&key()).await.unwrap().as_array().unwrap().len(), 3);

        fail_first.send(()).unwrap();
        assert!(first.await.unwrap().is_err());

        let after_rollback = cache.get(&key()).await.unwrap();
        let titles: Vec<_> = after_rollback
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, ["First", "Second pending"]);

        finish_second.send(()).unwrap();
        second.await.unwrap().unwrap();
        assert!(cache.is_stale(&key()).await);
    }
}
