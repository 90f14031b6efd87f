use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{debug, info, warn};
use serde::Serialize;

use object_spot_core::{draw_quad, RgbImage};
use object_spot_detect::DecisionEngine;

use crate::config::{LoopParams, TrackedObject};
use crate::traits::{Actuator, FeatureExtractor, FrameSink, FrameSource};

/// Per-object search state, re-entered on every tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Searching,
    Found,
}

/// Startup failures. Everything after a successful start degrades
/// gracefully instead of erroring.
#[derive(thiserror::Error, Debug)]
pub enum StartError {
    #[error("frame source is not connected")]
    SourceDisconnected,
    #[error("no reference objects configured")]
    NoObjects,
    #[error("failed to spawn the acquisition worker")]
    Spawn(#[from] std::io::Error),
}

/// Snapshot of the loop's counters.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct LoopCounters {
    /// Ticks that ran the full decision pipeline.
    pub ticks: u64,
    /// Ticks skipped because no frame was available.
    pub skipped: u64,
    /// Voice announcements dispatched.
    pub announcements: u64,
}

#[derive(Default)]
struct SharedCounters {
    ticks: AtomicU64,
    skipped: AtomicU64,
    announcements: AtomicU64,
}

impl SharedCounters {
    fn snapshot(&self) -> LoopCounters {
        LoopCounters {
            ticks: self.ticks.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            announcements: self.announcements.load(Ordering::Relaxed),
        }
    }
}

enum ThresholdUpdate {
    MatchThreshold { object: String, value: usize },
    RatioThreshold { object: String, value: f32 },
}

/// Fixed-period acquisition scheduler.
///
/// `start` spawns a single worker thread that owns the frame source, the
/// extractor and the actuation/display collaborators; all per-tick vision
/// work runs on that thread, so ticks never overlap. An overrunning tick
/// delays the next one rather than dropping it.
pub struct AcquisitionLoop;

impl AcquisitionLoop {
    pub fn start<S, X, A, K>(
        params: LoopParams,
        objects: Vec<TrackedObject>,
        source: S,
        extractor: X,
        actuator: A,
        sink: K,
    ) -> Result<LoopHandle, StartError>
    where
        S: FrameSource + Send + 'static,
        X: FeatureExtractor + Send + 'static,
        A: Actuator + Send + 'static,
        K: FrameSink + Send + 'static,
    {
        if objects.is_empty() {
            return Err(StartError::NoObjects);
        }
        if !source.is_connected() {
            return Err(StartError::SourceDisconnected);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(SharedCounters::default());
        let (updates_tx, updates_rx) = mpsc::channel();

        let states = vec![SearchState::Idle; objects.len()];
        let engine = DecisionEngine::with_verifier_params(params.verifier);
        let worker = Worker {
            params,
            objects,
            states,
            engine,
            source,
            extractor,
            actuator,
            sink,
            updates: updates_rx,
            counters: Arc::clone(&counters),
            last_shown: None,
        };

        let worker_stop = Arc::clone(&stop);
        let join = thread::Builder::new()
            .name("object-spot-acquire".into())
            .spawn(move || worker.run(&worker_stop))?;

        Ok(LoopHandle {
            stop,
            updates: updates_tx,
            counters,
            worker: Some(join),
        })
    }
}

/// Owner-side handle to a running loop.
///
/// Stopping (or dropping) the handle stops scheduling new ticks, lets the
/// in-flight tick finish, and only then releases the frame source, which
/// the worker thread owns.
pub struct LoopHandle {
    stop: Arc<AtomicBool>,
    updates: Sender<ThresholdUpdate>,
    counters: Arc<SharedCounters>,
    worker: Option<JoinHandle<()>>,
}

impl LoopHandle {
    /// Queue a match-threshold change; it takes effect at the start of the
    /// next tick, never mid-tick.
    pub fn set_match_threshold(&self, object: &str, value: usize) {
        let _ = self.updates.send(ThresholdUpdate::MatchThreshold {
            object: object.into(),
            value,
        });
    }

    /// Queue a ratio-threshold change, applied at the next tick start.
    pub fn set_ratio_threshold(&self, object: &str, value: f32) {
        let _ = self.updates.send(ThresholdUpdate::RatioThreshold {
            object: object.into(),
            value,
        });
    }

    pub fn counters(&self) -> LoopCounters {
        self.counters.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Stop the loop and wait for the worker to quiesce.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("acquisition worker panicked before quiescing");
            }
        }
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker<S, X, A, K> {
    params: LoopParams,
    objects: Vec<TrackedObject>,
    states: Vec<SearchState>,
    engine: DecisionEngine,
    source: S,
    extractor: X,
    actuator: A,
    sink: K,
    updates: Receiver<ThresholdUpdate>,
    counters: Arc<SharedCounters>,
    last_shown: Option<RgbImage>,
}

impl<S, X, A, K> Worker<S, X, A, K>
where
    S: FrameSource,
    X: FeatureExtractor,
    A: Actuator,
    K: FrameSink,
{
    fn run(mut self, stop: &AtomicBool) {
        let period = self.params.tick_period();
        let mut next_tick = Instant::now();

        while !stop.load(Ordering::Acquire) {
            self.tick();

            next_tick += period;
            let now = Instant::now();
            if next_tick < now {
                // the tick overran; run the next one immediately
                next_tick = now;
            } else {
                thread::sleep(next_tick - now);
            }
        }
        info!("acquisition loop quiesced, releasing the video source");
        // the frame source is dropped here, after the last tick finished
    }

    fn tick(&mut self) {
        self.apply_updates();

        if !self.source.is_connected() {
            warn!("video source disconnected, skipping tick");
            self.redisplay_last();
            self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(err) => {
                warn!("frame unavailable: {err}");
                self.redisplay_last();
                self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        let features = self.extractor.extract(&frame.view());
        let mut annotated = frame;

        let previous = self.states.clone();
        for state in &mut self.states {
            *state = SearchState::Idle;
        }
        for i in 0..self.objects.len() {
            self.states[i] = SearchState::Searching;
            let tracked = &self.objects[i];
            let decision =
                self.engine
                    .decide(&features, &tracked.reference, self.params.want_region);
            if !decision.found {
                self.states[i] = SearchState::Idle;
                continue;
            }

            self.states[i] = SearchState::Found;
            if previous[i] != SearchState::Found {
                info!("{}: sighted", tracked.reference.name());
            }
            debug!(
                "{}: confirmed with {} good matches",
                tracked.reference.name(),
                decision.good_match_count
            );
            if let Some(region) = &decision.region {
                draw_quad(
                    &mut annotated,
                    &region.corners,
                    self.params.overlay_color,
                    self.params.overlay_thickness,
                );
            }
            self.actuator.speak(&tracked.announcement);
            self.counters.announcements.fetch_add(1, Ordering::Relaxed);
            // first confirmed object wins the tick; lower-priority objects
            // are not evaluated in this frame
            break;
        }
        for (i, tracked) in self.objects.iter().enumerate() {
            if previous[i] == SearchState::Found && self.states[i] != SearchState::Found {
                debug!("{}: out of view", tracked.reference.name());
            }
        }

        self.sink.show(annotated.clone());
        self.last_shown = Some(annotated);
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);
    }

    fn apply_updates(&mut self) {
        for update in self.updates.try_iter() {
            match update {
                ThresholdUpdate::MatchThreshold { object, value } => {
                    match self
                        .objects
                        .iter_mut()
                        .find(|t| t.reference.name() == object)
                    {
                        Some(tracked) => {
                            debug!("{object}: match threshold -> {value}");
                            tracked.reference.set_match_threshold(value);
                        }
                        None => warn!("match-threshold update for unknown object {object}"),
                    }
                }
                ThresholdUpdate::RatioThreshold { object, value } => {
                    match self
                        .objects
                        .iter_mut()
                        .find(|t| t.reference.name() == object)
                    {
                        Some(tracked) => {
                            debug!("{object}: ratio threshold -> {value}");
                            tracked.reference.set_ratio_threshold(value);
                        }
                        None => warn!("ratio-threshold update for unknown object {object}"),
                    }
                }
            }
        }
    }

    fn redisplay_last(&self) {
        if let Some(frame) = &self.last_shown {
            self.sink.show(frame.clone());
        }
    }
}
