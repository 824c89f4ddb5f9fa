//! Frame pipeline
//!
//! Wires sampler → inference adapter → session → overlay renderer behind a
//! single `process_frame` call. Every frame that goes in comes back out,
//! annotated with the latest committed label, whether or not it was sampled
//! and whatever the classifier did with it.
//!
//! Two execution modes:
//! - **Inline**: a sampled frame is classified inside `process_frame`,
//!   bounded by the adapter timeout.
//! - **Pooled**: a sampled frame is copied onto a bounded queue and
//!   `process_frame` returns at once. Worker tasks classify and commit; a
//!   full queue drops the frame from inference.
//!
//! The pipeline owns its tokio runtime. `process_frame` must not be called
//! from inside another tokio runtime; if it is, inline inference is skipped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use super::frame::Frame;
use super::sampler::FrameSampler;
use super::transport::{StreamEvent, StreamLifecycle, StreamState};
use crate::config::{ExecutionMode, PipelineConfig};
use crate::error::{EmotiveError, Result};
use crate::neural::{ClassifierRegistry, EmotionClassifier, InferenceAdapter, InferenceOutcome};
use crate::overlay::{IconSet, OverlayRenderer};
use crate::state::{Clock, Session, SystemClock};

/// How long `shutdown` waits for abandoned classifier calls
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Point-in-time pipeline counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Frames handed to `process_frame`
    pub seen: u64,
    /// Frames selected for inference
    pub sampled: u64,
    /// Observations committed
    pub succeeded: u64,
    /// Inference attempts that produced no observation
    pub skipped: u64,
    /// Sampled frames that never reached the classifier
    pub dropped: u64,
    /// Successful results discarded as older than the newest commit
    pub stale: u64,
}

#[derive(Debug, Default)]
struct Counters {
    seen: AtomicU64,
    sampled: AtomicU64,
    succeeded: AtomicU64,
    skipped: AtomicU64,
    dropped: AtomicU64,
    stale: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            seen: self.seen.load(Ordering::Relaxed),
            sampled: self.sampled.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the frame path and pool workers
struct Shared {
    adapter: InferenceAdapter,
    counters: Counters,
    /// Set on the first fatal outcome; sampling stops for good
    halted: AtomicBool,
}

impl Shared {
    /// Apply one inference outcome to the session it was sampled for
    fn commit(&self, session: &Session, index: u64, outcome: InferenceOutcome) {
        match outcome {
            InferenceOutcome::Success(classification) => {
                match session.record(index, classification.dominant) {
                    Some(obs) => {
                        Counters::bump(&self.counters.succeeded);
                        debug!("[PIPELINE] frame {} committed '{}'", index, obs.label);
                    }
                    None => Counters::bump(&self.counters.stale),
                }
            }
            InferenceOutcome::Skipped(_) => Counters::bump(&self.counters.skipped),
            InferenceOutcome::Fatal(reason) => {
                Counters::bump(&self.counters.skipped);
                if !self.halted.swap(true, Ordering::SeqCst) {
                    error!("[PIPELINE] inference halted: {}", reason);
                }
            }
        }
    }
}

/// One sampled frame waiting for a worker
struct Job {
    index: u64,
    frame: Frame,
    session: Arc<Session>,
}

enum Dispatch {
    Inline,
    Pooled {
        queue: Option<mpsc::Sender<Job>>,
        workers: Vec<JoinHandle<()>>,
    },
}

/// The per-stream frame pipeline
pub struct FramePipeline {
    runtime: Option<Runtime>,
    shared: Arc<Shared>,
    renderer: OverlayRenderer,
    sampler: Mutex<FrameSampler>,
    lifecycle: Mutex<StreamLifecycle>,
    session: RwLock<Arc<Session>>,
    clock: Arc<dyn Clock>,
    /// Index of the last frame seen while live; frames are numbered from 1
    frame_index: AtomicU64,
    /// Stream clock for frames that carry no capture offset
    started: Instant,
    dispatch: Dispatch,
}

impl FramePipeline {
    /// Build a pipeline from a validated config, resolving the classifier
    /// through `registry` and loading icons from disk
    pub fn from_config(config: &PipelineConfig, registry: &ClassifierRegistry) -> Result<Self> {
        Self::builder(config)
            .registry(registry)
            .build()
    }

    pub fn builder(config: &PipelineConfig) -> PipelineBuilder<'_> {
        PipelineBuilder {
            config,
            registry: None,
            classifier: None,
            clock: None,
            icons: None,
        }
    }

    /// Apply a lifecycle event from the transport
    pub fn handle_event(&self, event: StreamEvent) -> StreamState {
        self.lifecycle.lock().handle(event)
    }

    pub fn state(&self) -> StreamState {
        self.lifecycle.lock().state()
    }

    /// True once a fatal classifier outcome has stopped sampling
    pub fn is_halted(&self) -> bool {
        self.shared.halted.load(Ordering::SeqCst)
    }

    /// Run one frame through the pipeline, returning the annotated frame
    pub fn process_frame(&self, frame: Frame) -> Frame {
        Counters::bump(&self.shared.counters.seen);
        let session = self.session();

        if self.lifecycle.lock().is_live() && !self.is_halted() {
            let index = self.frame_index.fetch_add(1, Ordering::SeqCst) + 1;
            let at = frame
                .captured_at()
                .unwrap_or_else(|| self.started.elapsed());
            if self.sampler.lock().should_sample(index, at) {
                Counters::bump(&self.shared.counters.sampled);
                self.submit(index, &frame, &session);
            }
        }

        self.renderer.render(frame, &session.current_label())
    }

    fn submit(&self, index: u64, frame: &Frame, session: &Arc<Session>) {
        match &self.dispatch {
            Dispatch::Inline => {
                let runtime = match &self.runtime {
                    Some(rt) if Handle::try_current().is_err() => rt,
                    _ => {
                        warn!("[PIPELINE] frame {} not classified: called from an async context", index);
                        Counters::bump(&self.shared.counters.dropped);
                        return;
                    }
                };
                let outcome = runtime.block_on(self.shared.adapter.infer(frame));
                self.shared.commit(session, index, outcome);
            }
            Dispatch::Pooled { queue, .. } => {
                let Some(queue) = queue else {
                    Counters::bump(&self.shared.counters.dropped);
                    return;
                };
                let job = Job {
                    index,
                    frame: frame.clone(),
                    session: Arc::clone(session),
                };
                match queue.try_send(job) {
                    Ok(()) => {}
                    Err(TrySendError::Full(job)) => {
                        Counters::bump(&self.shared.counters.dropped);
                        debug!("[PIPELINE] queue full, frame {} dropped", job.index);
                    }
                    Err(TrySendError::Closed(job)) => {
                        Counters::bump(&self.shared.counters.dropped);
                        warn!("[PIPELINE] workers gone, frame {} dropped", job.index);
                    }
                }
            }
        }
    }

    /// Handle to the current session
    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&*self.session.read())
    }

    /// Discard the current session and start an empty one
    ///
    /// Readers holding the old handle keep a consistent, frozen session.
    /// Queued results for the old session still commit to it, never to the
    /// new one.
    pub fn reset_session(&self) -> Arc<Session> {
        let fresh = Arc::new(Session::with_clock(Arc::clone(&self.clock)));
        let old = std::mem::replace(&mut *self.session.write(), Arc::clone(&fresh));
        info!(
            "[PIPELINE] session {} replaced by {} ({} observations discarded)",
            old.id(),
            fresh.id(),
            old.ledger().len()
        );
        fresh
    }

    pub fn stats(&self) -> PipelineStats {
        self.shared.counters.snapshot()
    }

    pub fn classifier_id(&self) -> &str {
        self.shared.adapter.classifier_id()
    }

    /// Stop accepting work, let workers finish the queue and return the
    /// final counters
    pub fn shutdown(mut self) -> PipelineStats {
        if let Dispatch::Pooled { queue, workers } = &mut self.dispatch {
            queue.take();
            let workers = std::mem::take(workers);
            if let Some(runtime) = &self.runtime {
                runtime.block_on(async {
                    for worker in workers {
                        if let Err(e) = worker.await {
                            warn!("[PIPELINE] worker ended abnormally: {}", e);
                        }
                    }
                });
            }
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
        }
        let stats = self.stats();
        info!(
            "[PIPELINE] shut down: {} seen, {} sampled, {} committed",
            stats.seen, stats.sampled, stats.succeeded
        );
        stats
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        // Never wait on a stalled classifier while dropping
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Builds a [`FramePipeline`]
///
/// The classifier comes from an explicit instance if one is given,
/// otherwise from the registry by the configured ID.
pub struct PipelineBuilder<'a> {
    config: &'a PipelineConfig,
    registry: Option<&'a ClassifierRegistry>,
    classifier: Option<Arc<dyn EmotionClassifier>>,
    clock: Option<Arc<dyn Clock>>,
    icons: Option<IconSet>,
}

impl<'a> PipelineBuilder<'a> {
    pub fn registry(mut self, registry: &'a ClassifierRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn EmotionClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use these icons instead of loading the configured files
    pub fn icons(mut self, icons: IconSet) -> Self {
        self.icons = Some(icons);
        self
    }

    pub fn build(self) -> Result<FramePipeline> {
        let config = self.config;
        config.validate()?;

        let classifier = match (self.classifier, self.registry) {
            (Some(classifier), _) => classifier,
            (None, Some(registry)) => registry.get(&config.inference.classifier)?,
            (None, None) => ClassifierRegistry::with_defaults().get(&config.inference.classifier)?,
        };
        let adapter = InferenceAdapter::new(
            classifier,
            config.inference.params.clone(),
            config.inference.adapter_settings(),
        )?;

        let icons = match self.icons {
            Some(icons) => icons,
            None => IconSet::load(&config.overlay.icons, config.overlay.style.icon_size)?,
        };
        let renderer = OverlayRenderer::new(config.overlay.style.clone(), icons)?;
        let sampler = FrameSampler::new(config.sampling)?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads(&config.mode))
            .thread_name("emotive-pipeline")
            .enable_time()
            .build()
            .map_err(|e| EmotiveError::Runtime {
                reason: format!("failed to start runtime: {}", e),
            })?;

        let shared = Arc::new(Shared {
            adapter,
            counters: Counters::default(),
            halted: AtomicBool::new(false),
        });

        let dispatch = match config.mode {
            ExecutionMode::Inline => Dispatch::Inline,
            ExecutionMode::Pooled {
                workers,
                queue_depth,
            } => {
                let (tx, rx) = mpsc::channel::<Job>(queue_depth);
                let rx = Arc::new(tokio::sync::Mutex::new(rx));
                let handles = (0..workers)
                    .map(|id| runtime.spawn(run_worker(id, Arc::clone(&rx), Arc::clone(&shared))))
                    .collect();
                Dispatch::Pooled {
                    queue: Some(tx),
                    workers: handles,
                }
            }
        };

        info!(
            "[PIPELINE] classifier '{}', sampling {:?}, mode {:?}",
            shared.adapter.classifier_id(),
            config.sampling,
            config.mode
        );

        Ok(FramePipeline {
            runtime: Some(runtime),
            shared,
            renderer,
            sampler: Mutex::new(sampler),
            lifecycle: Mutex::new(StreamLifecycle::new()),
            session: RwLock::new(Arc::new(Session::with_clock(Arc::clone(&clock)))),
            clock,
            frame_index: AtomicU64::new(0),
            started: Instant::now(),
            dispatch,
        })
    }
}

fn worker_threads(mode: &ExecutionMode) -> usize {
    match mode {
        ExecutionMode::Inline => 1,
        ExecutionMode::Pooled { workers, .. } => (*workers).max(1),
    }
}

async fn run_worker(id: usize, queue: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>, shared: Arc<Shared>) {
    debug!("[WORKER {}] started", id);
    loop {
        let job = queue.lock().await.recv().await;
        let Some(job) = job else { break };

        if shared.halted.load(Ordering::SeqCst) {
            Counters::bump(&shared.counters.dropped);
            continue;
        }
        let outcome = shared.adapter.infer(&job.frame).await;
        shared.commit(&job.session, job.index, outcome);
    }
    debug!("[WORKER {}] queue closed, exiting", id);
}
