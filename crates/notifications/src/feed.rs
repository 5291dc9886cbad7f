use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use rentloop_core::{Entity, UserId};

use crate::notification::{Notification, NotificationId};

/// Feed page size; the endpoint always returns the newest slice.
const FEED_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum NotificationFeedError {
    #[error("notification not found")]
    NotFound,

    #[error("notification feed lock poisoned")]
    Poisoned,
}

/// Delivery seam between lifecycle workers and the feed.
///
/// Implementors must be cheap and non-blocking from the caller's point of
/// view; the relay swallows and logs errors rather than propagating them.
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, notification: Notification) -> Result<(), NotificationFeedError>;
}

/// Thread-safe in-memory feed, one bucket per recipient.
#[derive(Default)]
pub struct InMemoryNotificationFeed {
    by_recipient: RwLock<HashMap<UserId, Vec<Notification>>>,
}

impl InMemoryNotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first, capped at the feed page size.
    pub fn list(&self, recipient_id: UserId) -> Result<Vec<Notification>, NotificationFeedError> {
        let guard = self
            .by_recipient
            .read()
            .map_err(|_| NotificationFeedError::Poisoned)?;

        let Some(bucket) = guard.get(&recipient_id) else {
            return Ok(Vec::new());
        };

        Ok(bucket.iter().rev().take(FEED_LIMIT).cloned().collect())
    }

    pub fn unread_count(&self, recipient_id: UserId) -> Result<usize, NotificationFeedError> {
        let guard = self
            .by_recipient
            .read()
            .map_err(|_| NotificationFeedError::Poisoned)?;

        Ok(guard
            .get(&recipient_id)
            .map(|bucket| bucket.iter().filter(|n| !n.is_read()).count())
            .unwrap_or(0))
    }

    /// Mark a single notification as read.
    ///
    /// Scoped to the recipient: an id belonging to another user's bucket is
    /// indistinguishable from a missing one.
    pub fn mark_read(
        &self,
        recipient_id: UserId,
        notification_id: NotificationId,
    ) -> Result<(), NotificationFeedError> {
        let mut guard = self
            .by_recipient
            .write()
            .map_err(|_| NotificationFeedError::Poisoned)?;

        let notification = guard
            .get_mut(&recipient_id)
            .and_then(|bucket| bucket.iter_mut().find(|n| *n.id() == notification_id))
            .ok_or(NotificationFeedError::NotFound)?;

        notification.mark_read();
        Ok(())
    }

    pub fn mark_all_read(&self, recipient_id: UserId) -> Result<(), NotificationFeedError> {
        let mut guard = self
            .by_recipient
            .write()
            .map_err(|_| NotificationFeedError::Poisoned)?;

        if let Some(bucket) = guard.get_mut(&recipient_id) {
            for notification in bucket.iter_mut() {
                notification.mark_read();
            }
        }
        Ok(())
    }
}

impl NotificationDispatcher for InMemoryNotificationFeed {
    fn dispatch(&self, notification: Notification) -> Result<(), NotificationFeedError> {
        let mut guard = self
            .by_recipient
            .write()
            .map_err(|_| NotificationFeedError::Poisoned)?;

        guard
            .entry(notification.recipient_id())
            .or_default()
            .push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationCategory;
    use chrono::{Duration, Utc};

    fn push(feed: &InMemoryNotificationFeed, recipient: UserId, msg: &str, offset_secs: i64) {
        feed.dispatch(Notification::new(
            recipient,
            NotificationCategory::Rental,
            msg,
            Utc::now() + Duration::seconds(offset_secs),
        ))
        .unwrap();
    }

    #[test]
    fn list_returns_newest_first_capped_at_twenty() {
        let feed = InMemoryNotificationFeed::new();
        let recipient = UserId::new();

        for i in 0..25 {
            push(&feed, recipient, &format!("message {i}"), i);
        }

        let page = feed.list(recipient).unwrap();
        assert_eq!(page.len(), 20);
        assert_eq!(page[0].message(), "message 24");
        assert_eq!(page[19].message(), "message 5");
    }

    #[test]
    fn feeds_are_isolated_per_recipient() {
        let feed = InMemoryNotificationFeed::new();
        let alice = UserId::new();
        let bob = UserId::new();

        push(&feed, alice, "for alice", 0);

        assert_eq!(feed.list(alice).unwrap().len(), 1);
        assert!(feed.list(bob).unwrap().is_empty());
        assert_eq!(feed.unread_count(bob).unwrap(), 0);
    }

    #[test]
    fn mark_read_flips_one_notification() {
        let feed = InMemoryNotificationFeed::new();
        let recipient = UserId::new();
        push(&feed, recipient, "one", 0);
        push(&feed, recipient, "two", 1);
        assert_eq!(feed.unread_count(recipient).unwrap(), 2);

        let id = *feed.list(recipient).unwrap()[0].id();
        feed.mark_read(recipient, id).unwrap();

        assert_eq!(feed.unread_count(recipient).unwrap(), 1);
    }

    #[test]
    fn mark_read_is_scoped_to_the_recipient() {
        let feed = InMemoryNotificationFeed::new();
        let alice = UserId::new();
        let bob = UserId::new();
        push(&feed, alice, "for alice", 0);

        let id = *feed.list(alice).unwrap()[0].id();
        let err = feed.mark_read(bob, id).unwrap_err();
        assert!(matches!(err, NotificationFeedError::NotFound));
        assert_eq!(feed.unread_count(alice).unwrap(), 1);
    }

    #[test]
    fn mark_all_read_clears_the_counter() {
        let feed = InMemoryNotificationFeed::new();
        let recipient = UserId::new();
        for i in 0..5 {
            push(&feed, recipient, &format!("message {i}"), i);
        }

        feed.mark_all_read(recipient).unwrap();
        assert_eq!(feed.unread_count(recipient).unwrap(), 0);
        // Messages themselves stay in the feed.
        assert_eq!(feed.list(recipient).unwrap().len(), 5);
    }
}
