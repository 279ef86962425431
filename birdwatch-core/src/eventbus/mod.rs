//! src/eventbus/mod.rs
//!
//! In-process bus between the stream read loop and the filter pipeline.
//! Post events go over a bounded broadcast queue: a subscriber that falls
//! behind drops its oldest entries (and is told how many) instead of the
//! queue blocking the read loop, since a stalled read loop risks an
//! idle-timeout disconnect upstream.

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};

use crate::models::PostEvent;

/// Events the watcher publishes internally.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// A decoded post from the upstream stream, stamped at receipt.
    Post {
        post: PostEvent,
        received_at: DateTime<Utc>,
    },

    /// Session transition announcements (connect, backoff, ...).
    SystemMessage(String),
}

/// Default depth of the post queue. Overflow drops oldest, never blocks.
const DEFAULT_QUEUE_SIZE: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WatchEvent>,
    shutdown_tx: watch::Sender<bool>,
    pub shutdown_rx: watch::Receiver<bool>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            sender,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Returns a receiver that sees every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. With no subscribers the event is simply dropped.
    pub fn publish(&self, event: WatchEvent) {
        let _ = self.sender.send(event);
    }

    pub fn publish_post(&self, post: PostEvent) {
        self.publish(WatchEvent::Post {
            post,
            received_at: Utc::now(),
        });
    }

    pub fn publish_system(&self, text: impl Into<String>) {
        self.publish(WatchEvent::SystemMessage(text.into()));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
