//! Load attempt orchestration tests
//!
//! Drive a LoadAttempt against a ScriptedFetcher with paused Tokio time,
//! so request latencies and the feedback delay are deterministic.

mod helpers;

use async_trait::async_trait;
use helpers::{metadata_json, notes_html, test_config, url, Reply, ScriptedFetcher, RECORD_ID};
use recplay_common::{EventBus, LoadErrorKind, LoaderEvent};
use recplay_loader::builders::{BuildError, BuilderRegistry, Content, ContentBuilder};
use recplay_loader::classifier::Payload;
use recplay_loader::{Layout, LoadAttempt, LoadRequest, LoadState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;

const FEEDBACK_MS: u64 = 1000;

fn drain(rx: &mut broadcast::Receiver<LoaderEvent>) -> Vec<LoaderEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn event_names(events: &[LoaderEvent]) -> Vec<&'static str> {
    events.iter().map(LoaderEvent::name).collect()
}

fn three_resources() -> [(&'static str, &'static str); 3] {
    [
        ("metadata", "metadata.json"),
        ("notes", "notes.html"),
        ("cursor", "cursor.xml"),
    ]
}

fn all_success_fetcher() -> ScriptedFetcher {
    ScriptedFetcher::new()
        .route(url("metadata.json"), 10, Reply::ok(metadata_json()))
        .route(url("notes.html"), 20, Reply::ok(notes_html()))
        .route(url("cursor.xml"), 30, Reply::ok("<recording/>"))
        .route(url("video/webcams.webm"), 5, Reply::ok(""))
        .route(url("video/webcams.mp4"), 5, Reply::ok(""))
}

#[tokio::test(start_paused = true)]
async fn test_ready_only_after_feedback_delay() {
    let fetcher = Arc::new(all_success_fetcher());
    let config = test_config(&three_resources(), &["webm", "mp4"], FEEDBACK_MS);
    let attempt = LoadAttempt::new(LoadRequest::new(Some(RECORD_ID)), &config, fetcher.clone());

    let driver = attempt.start().expect("driver started");

    // t=100ms: every unit ticked (3 declared + media batch), timer armed at t=30ms
    sleep(Duration::from_millis(100)).await;
    match attempt.state() {
        LoadState::Loading { loaded, required } => {
            assert_eq!(loaded, 4);
            assert_eq!(required, 4);
        }
        other => panic!("expected LOADING, got {:?}", other),
    }

    // t=950ms: still inside the feedback window
    sleep(Duration::from_millis(850)).await;
    assert_eq!(attempt.state().name(), "LOADING");

    // t=1050ms: past t=30ms + 1000ms
    sleep(Duration::from_millis(100)).await;
    let state = attempt.state();
    let handoff = state.handoff().expect("attempt should be ready");

    match handoff.data.get("metadata") {
        Some(Content::Metadata(meta)) => {
            assert_eq!(meta.id, "rec-1");
            assert_eq!(meta.duration_ms, 60_000);
        }
        other => panic!("unexpected metadata content: {:?}", other),
    }
    assert_eq!(
        handoff.data.get("notes"),
        Some(&Content::Notes("<p>Agenda</p>".to_string()))
    );
    assert_eq!(
        handoff.data.get("cursor"),
        Some(&Content::Text("<recording/>".to_string()))
    );
    assert_eq!(
        handoff.data.media(),
        Some(&["webm".to_string(), "mp4".to_string()][..])
    );
    assert_eq!(handoff.data.len(), 4);

    driver.await.expect("driver task");
    assert_eq!(fetcher.call_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_absent_record_id_issues_no_requests() {
    let fetcher = Arc::new(all_success_fetcher());
    let config = test_config(&three_resources(), &["webm", "mp4"], FEEDBACK_MS);

    for request in [LoadRequest::new(None), LoadRequest::new(Some("../etc/passwd"))] {
        let attempt = LoadAttempt::new(request, &config, fetcher.clone());
        assert_eq!(attempt.state().error_kind(), Some(LoadErrorKind::BadRequest));

        assert!(attempt.start().is_none());
        sleep(Duration::from_millis(100)).await;

        assert_eq!(attempt.state().error_kind(), Some(LoadErrorKind::BadRequest));
    }

    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent() {
    let fetcher = Arc::new(all_success_fetcher());
    let config = test_config(&three_resources(), &["webm", "mp4"], FEEDBACK_MS);
    let attempt = LoadAttempt::new(LoadRequest::new(Some(RECORD_ID)), &config, fetcher.clone());

    let driver = attempt.start().expect("first start runs");
    assert!(attempt.start().is_none());
    assert!(attempt.start().is_none());

    driver.await.expect("driver task");
    assert!(matches!(attempt.state(), LoadState::Ready(_)));
    // One GET per declared resource plus one HEAD per media candidate
    assert_eq!(fetcher.call_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_first_error_wins() {
    // (unsupported delay, transport failure delay, expected kind)
    let cases = [
        (10, 50, LoadErrorKind::BadRequest),
        (50, 10, LoadErrorKind::NotFound),
    ];

    for (unsupported_ms, failing_ms, expected) in cases {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .route(url("slides.txt"), unsupported_ms, Reply::ok("plain"))
                .route(url("metadata.json"), failing_ms, Reply::Fail)
                .route(url("video/webcams.webm"), 5, Reply::ok("")),
        );
        let config = test_config(
            &[("slides", "slides.txt"), ("metadata", "metadata.json")],
            &["webm"],
            FEEDBACK_MS,
        );
        let event_bus = EventBus::new(64);
        let mut events = event_bus.subscribe();
        let attempt = LoadAttempt::new(LoadRequest::new(Some(RECORD_ID)), &config, fetcher)
            .with_event_bus(event_bus);

        attempt.start().expect("driver started").await.expect("driver task");

        assert_eq!(attempt.state().error_kind(), Some(expected));

        let failures: Vec<_> = drain(&mut events)
            .into_iter()
            .filter_map(|event| match event {
                LoaderEvent::LoadFailed { kind, .. } => Some(kind),
                _ => None,
            })
            .collect();
        assert_eq!(failures, vec![expected]);
    }
}

#[tokio::test(start_paused = true)]
async fn test_single_media_probe_success() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .route(url("metadata.json"), 10, Reply::ok(metadata_json()))
            .route(url("notes.html"), 10, Reply::ok(notes_html()))
            .route(url("video/webcams.webm"), 5, Reply::ok(""))
            .route(url("video/webcams.mp4"), 5, Reply::status(404)),
    );
    let config = test_config(
        &[("metadata", "metadata.json"), ("notes", "notes.html")],
        &["webm", "mp4"],
        FEEDBACK_MS,
    );
    let attempt = LoadAttempt::new(LoadRequest::new(Some(RECORD_ID)), &config, fetcher);
    attempt.start().expect("driver started");

    // The batch ticks once, not once per probe
    sleep(Duration::from_millis(100)).await;
    match attempt.state() {
        LoadState::Loading { loaded, .. } => assert_eq!(loaded, 3),
        other => panic!("expected LOADING, got {:?}", other),
    }

    sleep(Duration::from_millis(FEEDBACK_MS)).await;
    let state = attempt.state();
    let handoff = state.handoff().expect("attempt should be ready");
    assert_eq!(handoff.data.media(), Some(&["webm".to_string()][..]));
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_counts_as_missing_media() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .route(url("metadata.json"), 10, Reply::ok(metadata_json()))
            .route(url("video/webcams.webm"), 5, Reply::Fail)
            .route(url("video/webcams.mp4"), 15, Reply::ok("")),
    );
    let config = test_config(&[("metadata", "metadata.json")], &["webm", "mp4"], 10);
    let attempt = LoadAttempt::new(LoadRequest::new(Some(RECORD_ID)), &config, fetcher);

    attempt.start().expect("driver started").await.expect("driver task");

    let state = attempt.state();
    let handoff = state.handoff().expect("attempt should be ready");
    assert_eq!(handoff.data.media(), Some(&["mp4".to_string()][..]));
}

#[tokio::test(start_paused = true)]
async fn test_no_media_is_not_found() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .route(url("metadata.json"), 10, Reply::ok(metadata_json()))
            .route(url("video/webcams.webm"), 5, Reply::status(404))
            .route(url("video/webcams.mp4"), 5, Reply::Fail),
    );
    let config = test_config(&[("metadata", "metadata.json")], &["webm", "mp4"], FEEDBACK_MS);
    let attempt = LoadAttempt::new(LoadRequest::new(Some(RECORD_ID)), &config, fetcher);

    attempt.start().expect("driver started").await.expect("driver task");

    assert_eq!(attempt.state().error_kind(), Some(LoadErrorKind::NotFound));
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_resource_does_not_block_siblings() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .route(url("metadata.json"), 5, Reply::ok(metadata_json()))
            .route(url("slides.txt"), 20, Reply::ok("slide text"))
            .route(url("video/webcams.webm"), 40, Reply::ok("")),
    );
    let mut config = test_config(
        &[("metadata", "metadata.json"), ("slides", "slides.txt")],
        &["webm"],
        FEEDBACK_MS,
    );
    config.feedback.enabled = true;

    let event_bus = EventBus::new(64);
    let mut events = event_bus.subscribe();
    let attempt = LoadAttempt::new(LoadRequest::new(Some(RECORD_ID)), &config, fetcher.clone())
        .with_event_bus(event_bus);

    attempt.start().expect("driver started").await.expect("driver task");

    assert_eq!(attempt.state().error_kind(), Some(LoadErrorKind::BadRequest));

    let events = drain(&mut events);
    let loaded: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            LoaderEvent::ResourceLoaded { resource, .. } => Some(resource.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(loaded, vec!["metadata"]);
    assert_eq!(
        event_names(&events),
        vec!["LoadStarted", "ResourceLoaded", "LoadFailed"]
    );

    // Sibling requests were still issued; the media result was discarded
    assert_eq!(fetcher.call_count(), 3);
    assert!(fetcher.calls().contains(&url("video/webcams.webm")));
}

#[tokio::test(start_paused = true)]
async fn test_failed_resource_stalls_in_loading() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .route(url("metadata.json"), 10, Reply::ok(metadata_json()))
            .route(url("notes.html"), 20, Reply::ok(notes_html()))
            .route(url("cursor.xml"), 30, Reply::status(404))
            .route(url("video/webcams.webm"), 5, Reply::ok(""))
            .route(url("video/webcams.mp4"), 5, Reply::status(404)),
    );
    let config = test_config(&three_resources(), &["webm", "mp4"], FEEDBACK_MS);
    let event_bus = EventBus::new(64);
    let mut events = event_bus.subscribe();
    let attempt = LoadAttempt::new(LoadRequest::new(Some(RECORD_ID)), &config, fetcher)
        .with_event_bus(event_bus);

    attempt.start().expect("driver started").await.expect("driver task");

    // 2 declared hits + 1 media batch hit, 4 required
    match attempt.state() {
        LoadState::Loading { loaded, required } => {
            assert_eq!(loaded, 3);
            assert_eq!(required, 4);
        }
        other => panic!("expected LOADING, got {:?}", other),
    }

    sleep(Duration::from_secs(60)).await;
    assert_eq!(attempt.state().name(), "LOADING");

    let events = drain(&mut events);
    assert!(events.iter().any(|event| matches!(
        event,
        LoaderEvent::ResourceSkipped { resource, status: 404, .. } if resource == "cursor"
    )));
    assert!(!event_names(&events).contains(&"LoadReady"));
    assert!(!event_names(&events).contains(&"LoadFailed"));
    assert!(!event_names(&events).contains(&"CompletionReached"));
}

#[tokio::test(start_paused = true)]
async fn test_decode_and_build_failures_are_bad_request() {
    let bodies = [
        "{not json",                   // decode failure
        r#"{"name": "missing id"}"#,   // metadata build failure
        r#"{"id": "x", "start_time": -9223372036854775808, "end_time": 9223372036854775807}"#,
    ];

    for body in bodies {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .route(url("metadata.json"), 10, Reply::ok(body))
                .route(url("video/webcams.webm"), 5, Reply::ok("")),
        );
        let config = test_config(&[("metadata", "metadata.json")], &["webm"], FEEDBACK_MS);
        let attempt = LoadAttempt::new(LoadRequest::new(Some(RECORD_ID)), &config, fetcher);

        attempt.start().expect("driver started").await.expect("driver task");
        assert_eq!(
            attempt.state().error_kind(),
            Some(LoadErrorKind::BadRequest),
            "body: {}",
            body
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_builder_follows_logical_name() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .route(url("shared.html"), 10, Reply::ok(notes_html()))
            .route(url("video/webcams.webm"), 5, Reply::ok("")),
    );
    let config = test_config(&[("notes", "shared.html")], &["webm"], 50);
    let attempt = LoadAttempt::new(LoadRequest::new(Some(RECORD_ID)), &config, fetcher);

    attempt.start().expect("driver started").await.expect("driver task");

    let state = attempt.state();
    let handoff = state.handoff().expect("attempt should be ready");
    assert_eq!(
        handoff.data.get("notes"),
        Some(&Content::Notes("<p>Agenda</p>".to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_build_still_counts() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .route(url("captions.json"), 10, Reply::ok("[]"))
            .route(url("video/webcams.webm"), 5, Reply::ok("")),
    );
    let config = test_config(&[("captions", "captions.json")], &["webm"], 50);
    let attempt = LoadAttempt::new(LoadRequest::new(Some(RECORD_ID)), &config, fetcher);

    attempt.start().expect("driver started").await.expect("driver task");

    let state = attempt.state();
    let handoff = state.handoff().expect("attempt should be ready");
    assert!(handoff.data.contains("captions"));
    assert!(handoff.data.get("captions").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_progress_events_follow_feedback_flag() {
    for enabled in [false, true] {
        let fetcher = Arc::new(all_success_fetcher());
        let mut config = test_config(&three_resources(), &["webm", "mp4"], 100);
        config.feedback.enabled = enabled;

        let event_bus = EventBus::new(64);
        let mut events = event_bus.subscribe();
        let attempt = LoadAttempt::new(LoadRequest::new(Some(RECORD_ID)), &config, fetcher)
            .with_event_bus(event_bus);

        attempt.start().expect("driver started").await.expect("driver task");
        assert!(matches!(attempt.state(), LoadState::Ready(_)));

        let names = event_names(&drain(&mut events));
        assert_eq!(names.first(), Some(&"LoadStarted"));
        assert_eq!(names.last(), Some(&"LoadReady"));
        assert!(names.contains(&"CompletionReached"));

        let progress = names
            .iter()
            .filter(|name| matches!(**name, "ResourceLoaded" | "MediaProbed"))
            .count();
        assert_eq!(progress, if enabled { 4 } else { 0 });
    }
}

#[tokio::test(start_paused = true)]
async fn test_observer_sees_ready_with_route_context() {
    let fetcher = Arc::new(all_success_fetcher());
    let config = test_config(&three_resources(), &["webm", "mp4"], FEEDBACK_MS);
    let request = LoadRequest::new(Some(RECORD_ID))
        .with_layout(Layout::Content)
        .with_start_time(Some(42.0));
    let attempt = LoadAttempt::new(request, &config, fetcher);
    let mut observer = attempt.subscribe();

    assert_eq!(observer.borrow().name(), "INIT");
    attempt.start().expect("driver started");

    let state = observer
        .wait_for(LoadState::is_terminal)
        .await
        .expect("state sender alive")
        .clone();

    let handoff = state.handoff().expect("attempt should be ready");
    assert_eq!(handoff.record_id.as_str(), RECORD_ID);
    assert_eq!(handoff.layout, Layout::Content);
    assert_eq!(handoff.start_time, Some(42.0));
}

struct RejectingCursorBuilder;

#[async_trait]
impl ContentBuilder for RejectingCursorBuilder {
    fn name(&self) -> &'static str {
        "cursor"
    }

    async fn build(
        &self,
        _source_path: &str,
        _payload: Payload,
    ) -> Result<Option<Content>, BuildError> {
        Err(BuildError::Malformed("cursor track unreadable".to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn test_custom_builder_rejection() {
    let fetcher = Arc::new(all_success_fetcher());
    let config = test_config(&three_resources(), &["webm", "mp4"], FEEDBACK_MS);

    let mut builders = BuilderRegistry::with_defaults();
    builders.register(Arc::new(RejectingCursorBuilder));

    let attempt = LoadAttempt::new(LoadRequest::new(Some(RECORD_ID)), &config, fetcher)
        .with_builders(builders);
    attempt.start().expect("driver started").await.expect("driver task");

    assert_eq!(attempt.state().error_kind(), Some(LoadErrorKind::BadRequest));
}
