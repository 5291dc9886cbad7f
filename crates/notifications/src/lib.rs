//! `rentloop-notifications` — per-user notification feed.
//!
//! Notifications are side channel, not source of truth: a failed delivery
//! never blocks or rolls back the lifecycle operation that produced it.

pub mod feed;
pub mod notification;

pub use feed::{InMemoryNotificationFeed, NotificationDispatcher, NotificationFeedError};
pub use notification::{Notification, NotificationCategory, NotificationId};
