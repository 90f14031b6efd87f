use std::sync::{Arc, Mutex};

use object_spot_core::{FeatureSet, RgbImage, RgbImageView};

/// Frame acquisition failures. The loop degrades on these; they are never
/// fatal to a running loop.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("no frame available from the video source")]
    NoFrame,
    #[error("video source is disconnected")]
    Disconnected,
}

/// Upstream video source (robot camera, file playback, test script).
///
/// Called once per tick. The loop's worker owns the source and drops it
/// only after the loop has quiesced, so implementations may release their
/// subscription in `Drop`.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<RgbImage, FrameError>;
    fn is_connected(&self) -> bool;
}

/// Interest-point detector + descriptor extractor. Assumed deterministic
/// for a fixed image.
pub trait FeatureExtractor {
    fn extract(&self, image: &RgbImageView<'_>) -> FeatureSet;
}

/// Robot actuation. Calls are fire-and-forget: implementations log their
/// own failures and must never block the acquisition tick for long.
pub trait Actuator {
    fn speak(&self, text: &str);

    /// Move to a named posture at a relative speed in [0, 1].
    /// Returns false when the request was rejected.
    fn set_posture(&self, name: &str, speed: f32) -> bool;
}

/// Consumer of the (possibly annotated) frame shown each tick. `show` must
/// not block the next tick's computation.
pub trait FrameSink {
    fn show(&self, image: RgbImage);
}

/// A non-blocking sink holding only the most recent frame. GUIs poll
/// `latest` at their own pace; the loop never waits on them.
#[derive(Clone, Default)]
pub struct LatestFrameSink {
    slot: Arc<Mutex<Option<RgbImage>>>,
}

impl LatestFrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<RgbImage> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl FrameSink for LatestFrameSink {
    fn show(&self, image: RgbImage) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(image);
        }
    }
}
