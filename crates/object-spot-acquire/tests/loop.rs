use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use object_spot_acquire::{
    AcquisitionLoop, Actuator, FeatureExtractor, FrameError, FrameSink, FrameSource, LoopParams,
    StartError, TrackedObject,
};
use object_spot_core::{FeatureSet, Keypoint, RgbImage, RgbImageView};
use object_spot_detect::ReferenceObject;

// ---- scripted collaborators -------------------------------------------------

/// Plays a fixed script of frames, then keeps returning `fallback`.
struct ScriptedSource {
    script: VecDeque<Result<RgbImage, FrameError>>,
    fallback: Result<RgbImage, FrameError>,
    connected: Arc<AtomicBool>,
    released: Arc<AtomicBool>,
}

impl ScriptedSource {
    fn repeating(frame: RgbImage) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: Ok(frame),
            connected: Arc::new(AtomicBool::new(true)),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    fn with_script(
        script: Vec<Result<RgbImage, FrameError>>,
        fallback: Result<RgbImage, FrameError>,
    ) -> Self {
        Self {
            script: script.into(),
            fallback,
            connected: Arc::new(AtomicBool::new(true)),
            released: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<RgbImage, FrameError> {
        self.script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.released.store(true, Ordering::Release);
    }
}

/// Looks up canned feature sets by a marker byte stored in the first pixel.
struct TableExtractor {
    table: Vec<FeatureSet>,
}

impl FeatureExtractor for TableExtractor {
    fn extract(&self, image: &RgbImageView<'_>) -> FeatureSet {
        let id = image.data[0] as usize;
        self.table.get(id).cloned().unwrap_or_default()
    }
}

#[derive(Clone, Default)]
struct RecordingActuator {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl RecordingActuator {
    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl Actuator for RecordingActuator {
    fn speak(&self, text: &str) {
        self.spoken.lock().unwrap().push(text.to_string());
    }

    fn set_posture(&self, _name: &str, speed: f32) -> bool {
        (0.0..=1.0).contains(&speed)
    }
}

#[derive(Clone, Default)]
struct RecordingSink {
    shown: Arc<Mutex<Vec<RgbImage>>>,
}

impl RecordingSink {
    fn shown(&self) -> Vec<RgbImage> {
        self.shown.lock().unwrap().clone()
    }
}

impl FrameSink for RecordingSink {
    fn show(&self, image: RgbImage) {
        self.shown.lock().unwrap().push(image);
    }
}

// ---- fixtures ---------------------------------------------------------------

/// Grid keypoints with well-separated scalar descriptors; sets built from
/// different bases never cross-match through the ratio test.
fn features(count: usize, offset: (f32, f32), base: f32) -> FeatureSet {
    let side = (count as f32).sqrt().ceil() as usize;
    let keypoints: Vec<Keypoint> = (0..count)
        .map(|i| {
            let (gx, gy) = ((i % side) as f32, (i / side) as f32);
            Keypoint::at(gx * 20.0 + offset.0, gy * 20.0 + offset.1)
        })
        .collect();
    let descriptors: Vec<f32> = (0..count).map(|i| base + i as f32 * 50.0).collect();
    FeatureSet::new(keypoints, 1, descriptors).expect("aligned")
}

fn union(a: &FeatureSet, b: &FeatureSet) -> FeatureSet {
    let mut keypoints = a.keypoints().to_vec();
    keypoints.extend_from_slice(b.keypoints());
    let mut descriptors = Vec::new();
    for i in 0..a.len() {
        descriptors.extend_from_slice(a.descriptor(i));
    }
    for i in 0..b.len() {
        descriptors.extend_from_slice(b.descriptor(i));
    }
    FeatureSet::new(keypoints, a.descriptor_len(), descriptors).expect("aligned")
}

/// Frame whose first pixel selects the extractor's canned feature set.
fn marked_frame(id: u8) -> RgbImage {
    let mut frame = RgbImage::new(64, 48);
    frame.set_pixel(0, 0, [id, 0, 0]);
    frame
}

fn fast_params() -> LoopParams {
    LoopParams {
        tick_ms: 5,
        ..LoopParams::default()
    }
}

fn init_logging() {
    let _ = object_spot_core::init_with_level(log::LevelFilter::Debug);
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

const WAIT: Duration = Duration::from_secs(5);

// ---- tests ------------------------------------------------------------------

#[test]
fn startup_rejects_bad_configuration() {
    init_logging();
    let book = TrackedObject::new(
        ReferenceObject::new("book", 100, 100, features(10, (0.0, 0.0), 0.0)),
        "I found the book",
    );

    let err = AcquisitionLoop::start(
        fast_params(),
        Vec::new(),
        ScriptedSource::repeating(marked_frame(0)),
        TableExtractor { table: vec![] },
        RecordingActuator::default(),
        RecordingSink::default(),
    )
    .err()
    .expect("empty object list must fail");
    assert!(matches!(err, StartError::NoObjects));

    let source = ScriptedSource::repeating(marked_frame(0));
    source.connected.store(false, Ordering::Release);
    let err = AcquisitionLoop::start(
        fast_params(),
        vec![book],
        source,
        TableExtractor { table: vec![] },
        RecordingActuator::default(),
        RecordingSink::default(),
    )
    .err()
    .expect("disconnected source must fail");
    assert!(matches!(err, StartError::SourceDisconnected));
}

#[test]
fn book_outranks_card_when_both_visible() {
    init_logging();
    let book_features = features(30, (0.0, 0.0), 0.0);
    let card_features = features(30, (0.0, 0.0), 1_000_000.0);

    // frame 1 carries both objects, slightly shifted
    let scene = union(
        &features(30, (8.0, 3.0), 0.0),
        &features(30, (200.0, 60.0), 1_000_000.0),
    );

    let book = TrackedObject::new(
        ReferenceObject::new("book", 120, 100, book_features).with_match_threshold(25),
        "I found the book",
    );
    let card = TrackedObject::new(
        ReferenceObject::new("card", 90, 50, card_features).with_match_threshold(25),
        "I found the card",
    );

    let actuator = RecordingActuator::default();
    let sink = RecordingSink::default();
    let handle = AcquisitionLoop::start(
        fast_params(),
        vec![book, card],
        ScriptedSource::repeating(marked_frame(1)),
        TableExtractor {
            table: vec![FeatureSet::empty(), scene],
        },
        actuator.clone(),
        sink.clone(),
    )
    .expect("start");

    assert!(wait_until(WAIT, || {
        handle.counters().announcements >= 3
    }));
    handle.stop();

    let spoken = actuator.spoken();
    assert!(spoken.len() >= 3, "announces on every tick while in view");
    assert!(
        spoken.iter().all(|s| s == "I found the book"),
        "the higher-priority object wins every tick: {spoken:?}"
    );
}

#[test]
fn disconnect_suspends_decisions_and_retains_last_frame() {
    init_logging();
    let book_features = features(20, (0.0, 0.0), 0.0);
    let scene = features(20, (5.0, 5.0), 0.0);

    let book = TrackedObject::new(
        ReferenceObject::new("book", 80, 80, book_features).with_match_threshold(15),
        "I found the book",
    );

    let source = ScriptedSource::repeating(marked_frame(1));
    let connected = Arc::clone(&source.connected);
    let actuator = RecordingActuator::default();
    let sink = RecordingSink::default();
    let handle = AcquisitionLoop::start(
        fast_params(),
        vec![book],
        source,
        TableExtractor {
            table: vec![FeatureSet::empty(), scene],
        },
        actuator.clone(),
        sink.clone(),
    )
    .expect("start");

    assert!(wait_until(WAIT, || handle.counters().announcements >= 1));
    connected.store(false, Ordering::Release);

    let skipped_at_disconnect = handle.counters().skipped;
    assert!(wait_until(WAIT, || {
        handle.counters().skipped >= skipped_at_disconnect + 3
    }));

    let announced = handle.counters().announcements;
    thread::sleep(Duration::from_millis(40));
    assert_eq!(
        handle.counters().announcements,
        announced,
        "no actuation while the source is down"
    );
    handle.stop();

    let shown = sink.shown();
    assert!(shown.len() >= 2);
    let last_good = shown.last().expect("frames shown");
    assert!(
        shown.iter().rev().take(3).all(|f| f == last_good),
        "the last good frame is re-shown while the source is down"
    );
    assert!(actuator.spoken().iter().all(|s| s == "I found the book"));
}

#[test]
fn frame_errors_redisplay_last_frame() {
    init_logging();
    let book = TrackedObject::new(
        ReferenceObject::new("book", 80, 80, features(10, (0.0, 0.0), 0.0)),
        "I found the book",
    );

    // one good (empty-featured) frame, then the source keeps failing
    let source =
        ScriptedSource::with_script(vec![Ok(marked_frame(0))], Err(FrameError::NoFrame));
    let actuator = RecordingActuator::default();
    let sink = RecordingSink::default();
    let handle = AcquisitionLoop::start(
        fast_params(),
        vec![book],
        source,
        TableExtractor {
            table: vec![FeatureSet::empty()],
        },
        actuator.clone(),
        sink.clone(),
    )
    .expect("start");

    assert!(wait_until(WAIT, || {
        let c = handle.counters();
        c.ticks >= 1 && c.skipped >= 3
    }));
    handle.stop();

    let shown = sink.shown();
    assert!(shown.len() >= 2, "failed ticks still refresh the display");
    assert!(
        shown.iter().all(|f| f == &shown[0]),
        "every redisplay shows the retained frame"
    );
    assert!(actuator.spoken().is_empty());
}

#[test]
fn stop_quiesces_worker_then_releases_source() {
    init_logging();
    let book = TrackedObject::new(
        ReferenceObject::new("book", 80, 80, features(10, (0.0, 0.0), 0.0)),
        "I found the book",
    );

    let source = ScriptedSource::repeating(marked_frame(0));
    let released = Arc::clone(&source.released);
    let sink = RecordingSink::default();
    let handle = AcquisitionLoop::start(
        fast_params(),
        vec![book],
        source,
        TableExtractor {
            table: vec![FeatureSet::empty()],
        },
        RecordingActuator::default(),
        sink.clone(),
    )
    .expect("start");

    assert!(wait_until(WAIT, || handle.counters().ticks >= 2));
    assert!(handle.is_running());
    assert!(!released.load(Ordering::Acquire));

    handle.stop();
    assert!(
        released.load(Ordering::Acquire),
        "the source is released once stop returns"
    );

    let shown_after_stop = sink.shown().len();
    thread::sleep(Duration::from_millis(40));
    assert_eq!(sink.shown().len(), shown_after_stop, "no ticks after stop");
}

#[test]
fn threshold_updates_take_effect_between_ticks() {
    init_logging();
    let book_features = features(20, (0.0, 0.0), 0.0);
    let scene = features(20, (5.0, 5.0), 0.0);

    let book = TrackedObject::new(
        // unreachable threshold: nothing is found at first
        ReferenceObject::new("book", 80, 80, book_features).with_match_threshold(1000),
        "I found the book",
    );

    let actuator = RecordingActuator::default();
    let handle = AcquisitionLoop::start(
        fast_params(),
        vec![book],
        ScriptedSource::repeating(marked_frame(1)),
        TableExtractor {
            table: vec![FeatureSet::empty(), scene],
        },
        actuator.clone(),
        RecordingSink::default(),
    )
    .expect("start");

    assert!(wait_until(WAIT, || handle.counters().ticks >= 2));
    assert_eq!(handle.counters().announcements, 0);

    handle.set_match_threshold("book", 15);
    assert!(
        wait_until(WAIT, || handle.counters().announcements >= 1),
        "lowered threshold applies on a following tick"
    );
    handle.stop();
}
