// src/platforms/firehose/events.rs
//
// Wire frames for the firehose stream. Everything is a JSON text frame
// tagged by "type"; anything that fails to decode is treated as a malformed
// event and skipped without touching the connection.

use serde::{Deserialize, Serialize};

use crate::models::PostEvent;

/// Frames the server may push at us.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Open acknowledgment; the client answers with `Subscribe`.
    Welcome,
    Keepalive,
    Post { data: PostEvent },
    /// Out-of-band rate-limit signal. Fatal for this run: no reconnect.
    RateLimited,
    AuthError { reason: Option<String> },
}

/// Frames the client sends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Server-side author-union filter. Narrows the event volume, but does
    /// not replace the local author filter (replies still come through).
    Subscribe { follow: Vec<String> },
}
