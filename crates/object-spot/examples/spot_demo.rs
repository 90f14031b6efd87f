//! End-to-end demo against synthetic collaborators: a scripted camera cycles
//! through frames with and without two reference objects while the
//! acquisition loop announces what it sees.
//!
//! Run with `RUST_LOG=debug` for per-decision output.

use std::thread;
use std::time::Duration;

use object_spot::acquire::{
    AcquisitionLoop, Actuator, FeatureExtractor, FrameError, FrameSource, LatestFrameSink,
    LoopParams, TrackedObject,
};
use object_spot::core::{FeatureSet, Keypoint, RgbImage, RgbImageView};
use object_spot::detect::{DecisionEngine, ReferenceObject};

/// Camera stand-in cycling through scripted scenes; the scene id rides in
/// the first pixel so the extractor stand-in can look features up.
struct CyclingCamera {
    scene_ids: Vec<u8>,
    served: usize,
}

impl FrameSource for CyclingCamera {
    fn next_frame(&mut self) -> Result<RgbImage, FrameError> {
        let id = self.scene_ids[self.served % self.scene_ids.len()];
        self.served += 1;
        let mut frame = RgbImage::new(320, 240);
        frame.set_pixel(0, 0, [id, 0, 0]);
        Ok(frame)
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// Extractor stand-in serving canned feature sets per scene.
struct CannedExtractor {
    scenes: Vec<FeatureSet>,
}

impl FeatureExtractor for CannedExtractor {
    fn extract(&self, image: &RgbImageView<'_>) -> FeatureSet {
        let id = image.data[0] as usize;
        self.scenes.get(id).cloned().unwrap_or_default()
    }
}

/// Robot stand-in that narrates instead of actuating.
struct SpeechLog;

impl Actuator for SpeechLog {
    fn speak(&self, text: &str) {
        log::info!("robot says: {text}");
    }

    fn set_posture(&self, name: &str, speed: f32) -> bool {
        if !(0.0..=1.0).contains(&speed) {
            log::warn!("posture speed {speed} outside [0, 1], ignoring");
            return false;
        }
        log::info!("robot posture -> {name} (speed {speed})");
        true
    }
}

/// A grid of keypoints with well-separated scalar descriptors. Sets built
/// from different bases never survive the ratio test against each other.
fn grid_features(count: usize, offset: (f32, f32), base: f32) -> FeatureSet {
    let side = (count as f32).sqrt().ceil() as usize;
    let keypoints: Vec<Keypoint> = (0..count)
        .map(|i| {
            let (gx, gy) = ((i % side) as f32, (i / side) as f32);
            Keypoint::at(gx * 18.0 + offset.0, gy * 18.0 + offset.1)
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

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let book_features = grid_features(40, (0.0, 0.0), 0.0);
    let card_features = grid_features(40, (0.0, 0.0), 1_000_000.0);

    // scene 0: nothing, scene 1: the book, scene 2: book and card together
    let book_in_view = grid_features(40, (60.0, 30.0), 0.0);
    let both_in_view = union(&book_in_view, &grid_features(40, (200.0, 150.0), 1_000_000.0));
    let scenes = vec![FeatureSet::empty(), book_in_view.clone(), both_in_view];

    let book = ReferenceObject::new("book", 130, 110, book_features).with_match_threshold(30);
    let card = ReferenceObject::new("card", 90, 55, card_features).with_match_threshold(30);

    // one-off decision report before the loop takes over
    let engine = DecisionEngine::new();
    let decision = engine.decide(&book_in_view, &book, true);
    match serde_json::to_string_pretty(&decision) {
        Ok(json) => println!("sample decision for the book scene:\n{json}"),
        Err(err) => eprintln!("report serialization failed: {err}"),
    }

    let actuator = SpeechLog;
    // posture control stays outside the recognition loop
    actuator.set_posture("Stand", 0.8);

    let sink = LatestFrameSink::new();
    let handle = AcquisitionLoop::start(
        LoopParams::default(),
        vec![
            TrackedObject::new(book, "I see the book"),
            TrackedObject::new(card, "I see the book and the card"),
        ],
        CyclingCamera {
            scene_ids: vec![0, 1, 1, 2, 2, 0],
            served: 0,
        },
        CannedExtractor { scenes },
        actuator,
        sink.clone(),
    )
    .expect("loop start");

    thread::sleep(Duration::from_secs(1));
    let counters = handle.counters();
    handle.stop();

    println!(
        "loop ran {} ticks, skipped {}, announced {} times",
        counters.ticks, counters.skipped, counters.announcements
    );
    if let Some(frame) = sink.latest() {
        println!("last displayed frame: {}x{}", frame.width, frame.height);
    }
}
