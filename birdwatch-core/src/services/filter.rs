// src/services/filter.rs

use std::collections::HashSet;
use std::sync::Arc;

use crate::models::PostEvent;

/// Allow-list predicate over inbound posts: tracked author plus the
/// skip-replies rule. Pure; runs on every inbound event, so membership is a
/// set lookup rather than a scan.
#[derive(Debug, Clone)]
pub struct AuthorFilter {
    tracked: Arc<HashSet<String>>,
}

impl AuthorFilter {
    pub fn new(tracked: Arc<HashSet<String>>) -> Self {
        Self { tracked }
    }

    /// True iff the author is tracked and the post is not a reply.
    pub fn accepts(&self, event: &PostEvent) -> bool {
        self.tracked.contains(&event.author_id) && event.in_reply_to_id.is_none()
    }
}
