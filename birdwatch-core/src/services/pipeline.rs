//! src/services/pipeline.rs
//!
//! Per-event pipeline: author allow-list -> keyword match -> dispatch.
//! Runs on its own task fed by the event bus, so a slow notification call
//! never stalls the stream read loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::eventbus::{EventBus, WatchEvent};
use crate::models::{NotificationRequest, PostEvent};
use crate::notifier::{DispatchResult, Notifier};
use crate::services::filter::AuthorFilter;
use crate::services::keywords::{KeywordRule, first_match};

/// How long an in-flight dispatch may keep running once shutdown is signaled.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Immutable per-event decision logic. A plain value over fixed
/// configuration; no callback object, no mutable state.
#[derive(Clone)]
pub struct EventHandler {
    filter: AuthorFilter,
    rules: Arc<Vec<KeywordRule>>,
    post_link_base: String,
}

impl EventHandler {
    pub fn new(filter: AuthorFilter, rules: Arc<Vec<KeywordRule>>, post_link_base: String) -> Self {
        Self {
            filter,
            rules,
            post_link_base,
        }
    }

    /// Decides whether `event` warrants an alert. First matching rule in
    /// configured order wins; at most one request per event. Replies and
    /// untracked authors never match, whatever the text says.
    pub fn evaluate(&self, event: &PostEvent) -> Option<NotificationRequest> {
        if !self.filter.accepts(event) {
            if let Some(reply_to) = &event.in_reply_to_id {
                debug!(
                    "[Pipeline] post {} in reply to {}... skipping",
                    event.post_id, reply_to
                );
            } else {
                trace!(
                    "[Pipeline] post {} from untracked author {}; ignoring",
                    event.post_id, event.author_id
                );
            }
            return None;
        }

        info!("[Pipeline] @{}: {}", event.author_name, event.text);

        let Some(rule) = first_match(&event.text, &self.rules) else {
            debug!("[Pipeline] post {} matched no keyword", event.post_id);
            return None;
        };
        info!(
            "[Pipeline] post {} matched keyword '{}'",
            event.post_id,
            rule.pattern()
        );

        Some(NotificationRequest {
            message: format!("@{}: {}", event.author_name, event.text),
            title: format!("keyword match: {}", rule.pattern()),
            url: format!(
                "{}/{}",
                self.post_link_base.trim_end_matches('/'),
                event.post_id
            ),
        })
    }
}

/// Pipeline worker: consumes posts from the bus until shutdown, dispatching
/// at most one notification per event, in arrival order. Dispatch failures
/// are recorded and do not stop the worker.
///
/// The receiver is handed in by the caller, subscribed before this task is
/// spawned; events published before the first poll are therefore queued,
/// not dropped.
pub async fn run_pipeline(
    event_bus: Arc<EventBus>,
    mut rx: broadcast::Receiver<WatchEvent>,
    handler: EventHandler,
    notifier: Arc<dyn Notifier>,
) {
    let mut shutdown_rx = event_bus.shutdown_rx.clone();

    loop {
        if event_bus.is_shutdown() {
            break;
        }

        let event = tokio::select! {
            Ok(_) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
                continue;
            }
            recv = rx.recv() => match recv {
                Ok(WatchEvent::Post { post, received_at }) => {
                    trace!("[Pipeline] post {} received at {}", post.post_id, received_at);
                    post
                }
                Ok(WatchEvent::SystemMessage(_)) => continue,
                Err(RecvError::Lagged(n)) => {
                    warn!("[Pipeline] queue overflow; dropped {} oldest event(s)", n);
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
        };

        let Some(request) = handler.evaluate(&event) else {
            continue;
        };

        info!(
            "[Pipeline] sending notification: {} {} {}",
            request.message, request.title, request.url
        );
        match dispatch_with_grace(&*notifier, &request, &mut shutdown_rx).await {
            Some(DispatchResult::Delivered(code)) => {
                info!(
                    "[Pipeline] notification for post {} delivered => HTTP {}",
                    event.post_id, code
                );
            }
            Some(DispatchResult::TransportFailure(e)) => {
                warn!(
                    "[Pipeline] notification for post {} failed => {}",
                    event.post_id, e
                );
            }
            None => {
                warn!(
                    "[Pipeline] dispatch for post {} abandoned after {:?} shutdown grace",
                    event.post_id, SHUTDOWN_GRACE
                );
                break;
            }
        }
    }

    info!("[Pipeline] worker stopped.");
}

/// Runs one dispatch. If shutdown arrives while the call is in flight, the
/// call gets `SHUTDOWN_GRACE` to finish; `None` means it was abandoned.
async fn dispatch_with_grace(
    notifier: &dyn Notifier,
    request: &NotificationRequest,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Option<DispatchResult> {
    let send = notifier.send(request);
    tokio::pin!(send);

    tokio::select! {
        result = &mut send => Some(result),
        _ = wait_for_shutdown(shutdown_rx) => {
            match timeout(SHUTDOWN_GRACE, &mut send).await {
                Ok(result) => Some(result),
                Err(_) => None,
            }
        }
    }
}

async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}
