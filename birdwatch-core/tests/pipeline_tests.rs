// tests/pipeline_tests.rs

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use birdwatch_core::eventbus::EventBus;
use birdwatch_core::models::{NotificationRequest, PostEvent};
use birdwatch_core::notifier::{DispatchResult, Notifier};
use birdwatch_core::services::filter::AuthorFilter;
use birdwatch_core::services::keywords::KeywordRule;
use birdwatch_core::services::pipeline::{EventHandler, run_pipeline};

/// Notifier that records every request and answers with a fixed result.
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<NotificationRequest>>>,
    result: DispatchResult,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, request: &NotificationRequest) -> DispatchResult {
        self.sent.lock().unwrap().push(request.clone());
        self.result.clone()
    }
}

fn handler(ids: &[&str], patterns: &[&str]) -> EventHandler {
    let tracked: HashSet<String> = ids.iter().map(|s| s.to_string()).collect();
    let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
    EventHandler::new(
        AuthorFilter::new(Arc::new(tracked)),
        Arc::new(KeywordRule::compile_all(&patterns).unwrap()),
        "https://example.net/posts".into(),
    )
}

fn post(author_id: &str, post_id: &str, text: &str, in_reply_to_id: Option<&str>) -> PostEvent {
    PostEvent {
        author_id: author_id.into(),
        author_name: "acct".into(),
        post_id: post_id.into(),
        text: text.into(),
        in_reply_to_id: in_reply_to_id.map(str::to_string),
    }
}

/// Feeds `events` through a pipeline worker and returns what got dispatched.
async fn run_events(
    handler: EventHandler,
    events: Vec<PostEvent>,
    result: DispatchResult,
) -> Vec<NotificationRequest> {
    let bus = Arc::new(EventBus::new());
    let sent = Arc::new(Mutex::new(Vec::new()));
    let notifier = Arc::new(RecordingNotifier {
        sent: sent.clone(),
        result,
    });

    let worker = tokio::spawn(run_pipeline(bus.clone(), bus.subscribe(), handler, notifier));

    for event in events {
        bus.publish_post(event);
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    bus.shutdown();
    worker.await.expect("worker should exit cleanly");

    let sent = sent.lock().unwrap().clone();
    sent
}

#[tokio::test]
async fn test_tracked_post_matching_keyword_sends_one_notification() {
    let sent = run_events(
        handler(&["42"], &["delay", "cancel"]),
        vec![post("42", "100", "Flight 100 DELAY announced", None)],
        DispatchResult::Delivered(200),
    )
    .await;

    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message, "@acct: Flight 100 DELAY announced");
    assert_eq!(sent[0].title, "keyword match: delay");
    assert_eq!(sent[0].url, "https://example.net/posts/100");
}

#[tokio::test]
async fn test_reply_from_tracked_author_sends_nothing() {
    let sent = run_events(
        handler(&["42"], &["delay", "cancel"]),
        vec![post("42", "100", "delay update", Some("99"))],
        DispatchResult::Delivered(200),
    )
    .await;
    assert!(sent.is_empty());
}

#[tokio::test]
async fn test_untracked_author_sends_nothing() {
    let sent = run_events(
        handler(&["42"], &["delay"]),
        vec![post("7", "100", "delay", None)],
        DispatchResult::Delivered(200),
    )
    .await;
    assert!(sent.is_empty());
}

#[tokio::test]
async fn test_configured_keyword_order_beats_text_order() {
    // "cancel" occurs earlier in the text, but "delay" precedes it in the
    // configured list, so "delay" is reported.
    let sent = run_events(
        handler(&["42"], &["delay", "cancel"]),
        vec![post("42", "100", "cancelled, or maybe just a delay", None)],
        DispatchResult::Delivered(200),
    )
    .await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, "keyword match: delay");
}

#[tokio::test]
async fn test_identical_events_dispatch_independently() {
    // No deduplication: re-processing the same event means a second attempt.
    let event = post("42", "100", "delay ahead", None);
    let sent = run_events(
        handler(&["42"], &["delay"]),
        vec![event.clone(), event],
        DispatchResult::Delivered(200),
    )
    .await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], sent[1]);
}

#[tokio::test]
async fn test_dispatch_failures_do_not_stop_the_pipeline() {
    let sent = run_events(
        handler(&["42"], &["delay"]),
        vec![
            post("42", "100", "delay one", None),
            post("42", "101", "delay two", None),
        ],
        DispatchResult::TransportFailure("dns failure".into()),
    )
    .await;
    assert_eq!(sent.len(), 2);
    assert!(sent[1].message.contains("delay two"));
}

#[tokio::test]
async fn test_non_2xx_delivery_still_processes_later_events() {
    let sent = run_events(
        handler(&["42"], &["delay"]),
        vec![
            post("42", "100", "delay one", None),
            post("42", "101", "delay two", None),
        ],
        DispatchResult::Delivered(429),
    )
    .await;
    assert_eq!(sent.len(), 2);
}
