use std::time::Duration;

use serde::{Deserialize, Serialize};

use object_spot_detect::{ReferenceObject, VerifierParams};

/// One object the loop searches for. The configured list order is the
/// priority order: the first object confirmed in a tick wins the
/// announcement and short-circuits the rest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackedObject {
    pub reference: ReferenceObject,
    /// Spoken when the object is confirmed in a frame.
    pub announcement: String,
}

impl TrackedObject {
    pub fn new(reference: ReferenceObject, announcement: impl Into<String>) -> Self {
        Self {
            reference,
            announcement: announcement.into(),
        }
    }
}

/// Acquisition loop settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoopParams {
    /// Wall-clock tick period in milliseconds. An overrunning tick delays
    /// the next one; ticks are never dropped or overlapped.
    pub tick_ms: u64,
    /// Ask the engine for a localization quad on every positive decision.
    pub want_region: bool,
    /// Overlay stroke color for confirmed objects.
    pub overlay_color: [u8; 3],
    /// Overlay stroke thickness in pixels.
    pub overlay_thickness: u32,
    /// Settings for the geometric verifier behind every decision.
    #[serde(default)]
    pub verifier: VerifierParams,
}

impl Default for LoopParams {
    fn default() -> Self {
        Self {
            tick_ms: 33, // ~30 Hz
            want_region: true,
            overlay_color: [0, 255, 0],
            overlay_thickness: 4,
            verifier: VerifierParams::default(),
        }
    }
}

impl LoopParams {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
