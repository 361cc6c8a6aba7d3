//! Change notifications from the store.
//!
//! A subscription is a [`ChangeFeed`]: an ordered stream of lifecycle status
//! messages and insert/update events, each carrying the old/new record pair.
//! Events missed while a feed is down are not replayed.

use crate::StoreError;
use async_trait::async_trait;
use award_types::{Category, Vote};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A named collection that can be subscribed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Categories,
    Votes,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Insert,
    Update,
}

/// One record change. `old` is `None` for inserts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent<T> {
    pub kind: ChangeKind,
    pub old: Option<T>,
    pub new: T,
}

impl<T> ChangeEvent<T> {
    pub fn inserted(new: T) -> Self {
        Self {
            kind: ChangeKind::Insert,
            old: None,
            new,
        }
    }

    pub fn updated(old: T, new: T) -> Self {
        Self {
            kind: ChangeKind::Update,
            old: Some(old),
            new,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreChange {
    Category(ChangeEvent<Category>),
    Vote(ChangeEvent<Vote>),
}

impl StoreChange {
    pub fn collection(&self) -> Collection {
        match self {
            Self::Category(_) => Collection::Categories,
            Self::Vote(_) => Collection::Votes,
        }
    }
}

/// Subscription lifecycle as reported by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionStatus {
    Subscribed,
    Error(String),
    Closed,
    TimedOut,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedMessage {
    Status(SubscriptionStatus),
    Change(StoreChange),
}

/// Receiving half of a subscription.
#[derive(Debug)]
pub struct ChangeFeed {
    rx: mpsc::UnboundedReceiver<FeedMessage>,
}

impl ChangeFeed {
    /// Create a connected sender/feed pair. Backends keep the sender and
    /// hand the feed to the subscriber.
    pub fn channel() -> (FeedSender, ChangeFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        (FeedSender { tx }, ChangeFeed { rx })
    }

    /// Next message, or `None` once the backend dropped its sender.
    pub async fn next(&mut self) -> Option<FeedMessage> {
        self.rx.recv().await
    }
}

/// Sending half of a subscription, held by the backend.
#[derive(Clone, Debug)]
pub struct FeedSender {
    tx: mpsc::UnboundedSender<FeedMessage>,
}

impl FeedSender {
    /// Deliver a message. Returns `false` if the subscriber has gone away.
    pub fn send(&self, message: FeedMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Open a feed for the given collections. The first message on a healthy
    /// feed is `Status(Subscribed)`.
    async fn subscribe(&self, collections: &[Collection]) -> Result<ChangeFeed, StoreError>;
}
