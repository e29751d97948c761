//! User-facing notifications.
//!
//! The HTTP layer and the mutations publish through the [`Notifier`] trait;
//! [`NotificationStore`] keeps the current list and broadcasts every new
//! notification to whatever UI is subscribed.

use std::sync::{Mutex, PoisonError};

use agora_shared::Notification;
use tokio::sync::broadcast;

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// A notification as held by the store, with the id used to dismiss it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNotification {
    pub id: u64,
    pub notification: Notification,
}

struct Inner {
    next_id: u64,
    items: Vec<StoredNotification>,
}

pub struct NotificationStore {
    inner: Mutex<Inner>,
    tx: broadcast::Sender<StoredNotification>,
}

impl NotificationStore {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                items: Vec::new(),
            }),
            tx,
        }
    }

    /// Add a notification and return its id.
    pub fn add(&self, notification: Notification) -> u64 {
        let stored = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let stored = StoredNotification {
                id: inner.next_id,
                notification,
            };
            inner.next_id += 1;
            inner.items.push(stored.clone());
            stored
        };

        let id = stored.id;
        // No subscribers is fine: the list still has it.
        let _ = self.tx.send(stored);
        id
    }

    pub fn dismiss(&self, id: u64) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.items.retain(|n| n.id != id);
    }

    pub fn list(&self) -> Vec<StoredNotification> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoredNotification> {
        self.tx.subscribe()
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotificationStore {
    fn notify(&self, notification: Notification) {
        tracing::debug!(
            kind = ?notification.kind,
            title = %notification.title,
            "notification"
        );
        self.add(notification);
    }
}
