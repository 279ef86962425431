// src/models.rs

use serde::Deserialize;

/// A single post received from the upstream stream. Ephemeral: lives only for
/// one trip through the filter pipeline and is never persisted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PostEvent {
    pub author_id: String,
    pub author_name: String,
    pub post_id: String,
    pub text: String,
    /// Present when the post is a reply. Replies are never keyword-matched.
    #[serde(default)]
    pub in_reply_to_id: Option<String>,
}

/// Outbound alert built from a matched post. Consumed exactly once by the
/// notifier, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub message: String,
    pub title: String,
    pub url: String,
}
