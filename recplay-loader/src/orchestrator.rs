//! Load attempt orchestration
//!
//! # State Progression
//! INIT → LOADING → READY | ERROR
//!
//! # Architecture
//! A [`LoadAttempt`] is built per load. [`LoadAttempt::start`] spawns one
//! driver task that owns every piece of mutable attempt state: the loaded
//! data set, the completion gate and the feedback deadline. Per-resource
//! pipelines (fetch → classify → decode → build) and the media probe batch
//! run as futures polled by that single task, so their results are applied
//! one at a time without locks.
//!
//! Observers follow the attempt through [`LoadAttempt::subscribe`] (a watch
//! channel carrying [`LoadState`]) and through [`LoaderEvent`]s on the
//! event bus.
//!
//! # Failure policy
//! - Transport failure → NOT_FOUND; unsupported suffix, decode or build
//!   failure → BAD_REQUEST; no media → NOT_FOUND.
//! - First error wins. Results settling afterwards are drained and dropped.
//! - A non-success status is logged and skipped without a tick, which
//!   leaves the attempt in LOADING for good.

use crate::builders::{BuilderRegistry, Content};
use crate::classifier::{classify, decode};
use crate::error::ResourceError;
use crate::fetcher::{media_path, resource_url, ResourceFetcher};
use crate::gate::{CompletionGate, GateDecision};
use crate::route::{Layout, LoadRequest, RecordId};
use chrono::Utc;
use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use recplay_common::config::MEDIA_KEY;
use recplay_common::{
    DeclaredResource, EventBus, LoadErrorKind, LoaderConfig, LoaderEvent, MediaCandidate,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Built resources keyed by logical name
///
/// A `None` value means the resource resolved but its builder produced
/// nothing. The media batch is stored under [`MEDIA_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LoadedDataSet {
    entries: BTreeMap<String, Option<Content>>,
}

impl LoadedDataSet {
    /// Built content for a name, if any
    pub fn get(&self, name: &str) -> Option<&Content> {
        self.entries.get(name).and_then(Option::as_ref)
    }

    /// Whether a name resolved, with or without content
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Media tags found by the probe batch
    pub fn media(&self) -> Option<&[String]> {
        match self.get(MEDIA_KEY) {
            Some(Content::Media(tags)) => Some(tags),
            _ => None,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, name: String, content: Option<Content>) {
        self.entries.insert(name, content);
    }
}

/// Everything the playback component receives once the load is ready
///
/// A point-in-time snapshot; later changes to the attempt are not visible.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackHandoff {
    pub record_id: RecordId,
    pub data: LoadedDataSet,
    pub layout: Layout,
    /// Playback start offset in seconds
    pub start_time: Option<f64>,
}

/// Observable state of a load attempt
#[derive(Debug, Clone)]
pub enum LoadState {
    /// Created, not started
    Init,
    /// Requests in flight
    Loading {
        /// Completion ticks so far
        loaded: usize,
        /// Ticks needed for completion (declared resources + media batch)
        required: usize,
    },
    /// Terminal: data handed off
    Ready(Arc<PlaybackHandoff>),
    /// Terminal: first error raised
    Error(LoadErrorKind),
}

impl LoadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadState::Ready(_) | LoadState::Error(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            LoadState::Init => "INIT",
            LoadState::Loading { .. } => "LOADING",
            LoadState::Ready(_) => "READY",
            LoadState::Error(_) => "ERROR",
        }
    }

    pub fn error_kind(&self) -> Option<LoadErrorKind> {
        match self {
            LoadState::Error(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn handoff(&self) -> Option<&Arc<PlaybackHandoff>> {
        match self {
            LoadState::Ready(handoff) => Some(handoff),
            _ => None,
        }
    }
}

/// Static inputs of an attempt, taken from configuration
#[derive(Debug)]
struct LoadPlan {
    base_url: String,
    resources: Vec<DeclaredResource>,
    medias: Vec<MediaCandidate>,
    feedback_enabled: bool,
    feedback_duration: Duration,
}

impl LoadPlan {
    fn from_config(config: &LoaderConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            resources: config.resources.clone(),
            medias: config.medias.clone(),
            feedback_enabled: config.feedback.enabled,
            feedback_duration: config.feedback_duration(),
        }
    }
}

/// One attempt at loading a record's resources
pub struct LoadAttempt {
    id: Uuid,
    request: LoadRequest,
    plan: Arc<LoadPlan>,
    fetcher: Arc<dyn ResourceFetcher>,
    builders: Arc<BuilderRegistry>,
    event_bus: EventBus,
    started: AtomicBool,
    state: Arc<watch::Sender<LoadState>>,
}

impl LoadAttempt {
    /// Create an attempt
    ///
    /// An attempt whose request has no valid record id starts out in
    /// `Error(BadRequest)`.
    pub fn new(
        request: LoadRequest,
        config: &LoaderConfig,
        fetcher: Arc<dyn ResourceFetcher>,
    ) -> Self {
        let initial = if request.record_id.is_some() {
            LoadState::Init
        } else {
            LoadState::Error(LoadErrorKind::BadRequest)
        };
        let (state, _) = watch::channel(initial);

        Self {
            id: Uuid::new_v4(),
            request,
            plan: Arc::new(LoadPlan::from_config(config)),
            fetcher,
            builders: Arc::new(BuilderRegistry::with_defaults()),
            event_bus: EventBus::default(),
            started: AtomicBool::new(false),
            state: Arc::new(state),
        }
    }

    /// Replace the builder registry
    pub fn with_builders(mut self, builders: BuilderRegistry) -> Self {
        self.builders = Arc::new(builders);
        self
    }

    /// Publish events on the given bus
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn request(&self) -> &LoadRequest {
        &self.request
    }

    /// Current state snapshot
    pub fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Start loading
    ///
    /// Only the first call has an effect. Returns the driver task handle
    /// when this call started the load; `None` when the attempt was already
    /// started or has no valid record id. Must be called within a Tokio
    /// runtime.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!(attempt_id = %self.id, "Load already started");
            return None;
        }

        let Some(record_id) = self.request.record_id.clone() else {
            warn!(attempt_id = %self.id, "No valid record id, nothing to load");
            return None;
        };

        let gate = CompletionGate::new(self.plan.resources.len());

        info!(
            attempt_id = %self.id,
            record_id = %record_id,
            resources = self.plan.resources.len(),
            medias = self.plan.medias.len(),
            "Starting load"
        );

        self.state.send_replace(LoadState::Loading {
            loaded: 0,
            required: gate.required(),
        });
        self.event_bus.emit_lossy(LoaderEvent::LoadStarted {
            attempt_id: self.id,
            record_id: record_id.to_string(),
            required: gate.required(),
            timestamp: Utc::now(),
        });

        let driver = AttemptDriver {
            id: self.id,
            record_id,
            layout: self.request.layout,
            start_time: self.request.start_time,
            plan: Arc::clone(&self.plan),
            fetcher: Arc::clone(&self.fetcher),
            builders: Arc::clone(&self.builders),
            event_bus: self.event_bus.clone(),
            state: Arc::clone(&self.state),
            gate,
            data: LoadedDataSet::default(),
            ready_at: None,
        };

        Some(tokio::spawn(driver.run()))
    }
}

/// Settled unit of work
enum Outcome {
    Resource {
        name: String,
        result: Result<Resolution, ResourceError>,
    },
    Media(Result<Vec<String>, ResourceError>),
}

/// Non-error end of a declared resource
enum Resolution {
    Built(Option<Content>),
    Skipped { status: u16 },
}

/// Owns the mutable state of a started attempt
struct AttemptDriver {
    id: Uuid,
    record_id: RecordId,
    layout: Layout,
    start_time: Option<f64>,
    plan: Arc<LoadPlan>,
    fetcher: Arc<dyn ResourceFetcher>,
    builders: Arc<BuilderRegistry>,
    event_bus: EventBus,
    state: Arc<watch::Sender<LoadState>>,
    gate: CompletionGate,
    data: LoadedDataSet,
    /// Feedback deadline, set once the gate fires
    ready_at: Option<Instant>,
}

impl AttemptDriver {
    async fn run(mut self) {
        let mut pending: FuturesUnordered<BoxFuture<'static, Outcome>> = FuturesUnordered::new();

        for resource in self.plan.resources.iter().cloned() {
            let url = resource_url(&self.plan.base_url, self.record_id.as_str(), &resource.path);
            pending.push(
                load_resource(
                    Arc::clone(&self.fetcher),
                    Arc::clone(&self.builders),
                    url,
                    resource,
                )
                .boxed(),
            );
        }
        pending.push(
            probe_media(
                Arc::clone(&self.fetcher),
                Arc::clone(&self.plan),
                self.record_id.clone(),
            )
            .boxed(),
        );

        loop {
            tokio::select! {
                Some(outcome) = pending.next() => self.apply(outcome),
                _ = tokio::time::sleep_until(self.ready_at.unwrap_or_else(Instant::now)),
                    if self.ready_at.is_some() => self.ready(),
                else => break,
            }
        }

        if let LoadState::Loading { loaded, required } = *self.state.borrow() {
            warn!(
                attempt_id = %self.id,
                record_id = %self.record_id,
                loaded,
                required,
                "All requests settled without completing the load"
            );
        }
    }

    fn is_terminal(&self) -> bool {
        self.state.borrow().is_terminal()
    }

    fn apply(&mut self, outcome: Outcome) {
        if self.is_terminal() {
            match outcome {
                Outcome::Resource { result: Err(e), .. } | Outcome::Media(Err(e)) => {
                    debug!(attempt_id = %self.id, error = %e, "Ignoring error after terminal state");
                }
                _ => debug!(attempt_id = %self.id, "Discarding result after terminal state"),
            }
            return;
        }

        match outcome {
            Outcome::Resource {
                name,
                result: Ok(Resolution::Built(content)),
            } => {
                let built = content.is_some();
                if built {
                    debug!(attempt_id = %self.id, resource = %name, "Resource built");
                } else {
                    debug!(attempt_id = %self.id, resource = %name, "Resource resolved without content");
                }

                self.data.insert(name.clone(), content);
                let decision = self.gate.tick();

                if self.plan.feedback_enabled {
                    self.event_bus.emit_lossy(LoaderEvent::ResourceLoaded {
                        attempt_id: self.id,
                        resource: name,
                        built,
                        loaded: self.gate.counter(),
                        timestamp: Utc::now(),
                    });
                }
                self.after_tick(decision);
            }
            Outcome::Resource {
                name,
                result: Ok(Resolution::Skipped { status }),
            } => {
                warn!(
                    attempt_id = %self.id,
                    resource = %name,
                    status,
                    "Resource request unsuccessful, skipping"
                );
                self.event_bus.emit_lossy(LoaderEvent::ResourceSkipped {
                    attempt_id: self.id,
                    resource: name,
                    status,
                    timestamp: Utc::now(),
                });
            }
            Outcome::Resource {
                name,
                result: Err(e),
            } => {
                debug!(attempt_id = %self.id, resource = %name, "Resource failed");
                self.fail(e);
            }
            Outcome::Media(Ok(tags)) => {
                debug!(attempt_id = %self.id, tags = ?tags, "Media batch accepted");
                self.data
                    .insert(MEDIA_KEY.to_string(), Some(Content::Media(tags.clone())));
                let decision = self.gate.tick();

                if self.plan.feedback_enabled {
                    self.event_bus.emit_lossy(LoaderEvent::MediaProbed {
                        attempt_id: self.id,
                        tags,
                        loaded: self.gate.counter(),
                        timestamp: Utc::now(),
                    });
                }
                self.after_tick(decision);
            }
            Outcome::Media(Err(e)) => self.fail(e),
        }
    }

    fn after_tick(&mut self, decision: GateDecision) {
        let loaded = self.gate.counter();
        let required = self.gate.required();
        self.state.send_replace(LoadState::Loading { loaded, required });

        if decision == GateDecision::Fire {
            let feedback = self.plan.feedback_duration;
            info!(
                attempt_id = %self.id,
                loaded,
                feedback_ms = feedback.as_millis() as u64,
                "All resources accounted for"
            );
            self.ready_at = Some(Instant::now() + feedback);
            self.event_bus.emit_lossy(LoaderEvent::CompletionReached {
                attempt_id: self.id,
                loaded,
                feedback_ms: feedback.as_millis() as u64,
                timestamp: Utc::now(),
            });
        }
    }

    fn fail(&mut self, error: ResourceError) {
        let kind = error.kind();
        error!(
            attempt_id = %self.id,
            record_id = %self.record_id,
            code = kind.code(),
            "Load failed: {}",
            error
        );

        self.ready_at = None;
        self.state.send_replace(LoadState::Error(kind));
        self.event_bus.emit_lossy(LoaderEvent::LoadFailed {
            attempt_id: self.id,
            kind,
            timestamp: Utc::now(),
        });
    }

    fn ready(&mut self) {
        self.ready_at = None;
        if self.is_terminal() {
            return;
        }

        let handoff = PlaybackHandoff {
            record_id: self.record_id.clone(),
            data: self.data.clone(),
            layout: self.layout,
            start_time: self.start_time,
        };

        info!(
            attempt_id = %self.id,
            record_id = %self.record_id,
            entries = handoff.data.len(),
            "Load ready"
        );

        self.state.send_replace(LoadState::Ready(Arc::new(handoff)));
        self.event_bus.emit_lossy(LoaderEvent::LoadReady {
            attempt_id: self.id,
            timestamp: Utc::now(),
        });
    }
}

async fn load_resource(
    fetcher: Arc<dyn ResourceFetcher>,
    builders: Arc<BuilderRegistry>,
    url: String,
    resource: DeclaredResource,
) -> Outcome {
    let result = resolve_resource(fetcher.as_ref(), &builders, &url, &resource).await;
    Outcome::Resource {
        name: resource.name,
        result,
    }
}

/// Fetch → classify → decode → build for one declared resource
async fn resolve_resource(
    fetcher: &dyn ResourceFetcher,
    builders: &BuilderRegistry,
    url: &str,
    resource: &DeclaredResource,
) -> Result<Resolution, ResourceError> {
    let path = resource.path.as_str();
    let response = fetcher.get(url).await?;

    if !response.is_success() {
        return Ok(Resolution::Skipped {
            status: response.status,
        });
    }
    debug!(url = %url, status = response.status, "Fetched resource");

    let strategy = classify(path).ok_or_else(|| ResourceError::Unsupported(path.to_string()))?;

    let payload = decode(strategy, response.body).map_err(|e| ResourceError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })?;

    let content = builders
        .build(&resource.name, path, payload)
        .await
        .map_err(|source| ResourceError::Build {
            path: path.to_string(),
            source,
        })?;

    Ok(Resolution::Built(content))
}

/// Probe every media candidate and accept the batch if any exists
///
/// All probes settle before the batch is judged; a transport failure
/// counts as a missing candidate.
async fn probe_media(
    fetcher: Arc<dyn ResourceFetcher>,
    plan: Arc<LoadPlan>,
    record_id: RecordId,
) -> Outcome {
    let probes = plan.medias.iter().map(|candidate| {
        let url = resource_url(
            &plan.base_url,
            record_id.as_str(),
            &media_path(&candidate.tag),
        );
        let fetcher = Arc::clone(&fetcher);
        async move {
            let response = fetcher.head(&url).await;
            (url, response)
        }
    });
    let responses = future::join_all(probes).await;

    let mut tags: Vec<String> = Vec::new();
    for (url, response) in responses {
        match response {
            Ok(probe) if probe.is_success() => {
                // The echoed URL tells which candidate answered
                let candidate = plan
                    .medias
                    .iter()
                    .find(|c| probe.url.ends_with(&format!(".{}", c.tag)));
                match candidate {
                    Some(candidate) => {
                        debug!(url = %probe.url, tag = %candidate.tag, "Media candidate found");
                        if !tags.contains(&candidate.tag) {
                            tags.push(candidate.tag.clone());
                        }
                    }
                    None => warn!(url = %probe.url, "Media probe answered from an unrecognized URL"),
                }
            }
            Ok(probe) => debug!(url = %url, status = probe.status, "Media candidate missing"),
            Err(e) => debug!(url = %url, error = %e, "Media probe failed"),
        }
    }

    if tags.is_empty() {
        Outcome::Media(Err(ResourceError::NoMedia(record_id.to_string())))
    } else {
        Outcome::Media(Ok(tags))
    }
}
