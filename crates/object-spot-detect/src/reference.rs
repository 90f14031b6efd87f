use log::warn;
use serde::{Deserialize, Serialize};

use object_spot_core::FeatureSet;

/// Minimal good-match count to declare presence, unless tuned per object.
pub const DEFAULT_MATCH_THRESHOLD: usize = 100;

/// Nearest-neighbor distance-ratio cutoff, unless tuned per object.
pub const DEFAULT_RATIO_THRESHOLD: f32 = 0.7;

/// A known object to spot: its reference image dimensions, the features
/// extracted from that image once at startup, and per-object decision
/// thresholds.
///
/// Constructed once and treated as read-only while a recognition loop runs;
/// threshold setters exist for tuning, and the loop applies such updates
/// only between ticks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceObject {
    name: String,
    width: u32,
    height: u32,
    features: FeatureSet,
    match_threshold: usize,
    ratio_threshold: f32,
}

impl ReferenceObject {
    pub fn new(name: impl Into<String>, width: u32, height: u32, features: FeatureSet) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            features,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            ratio_threshold: DEFAULT_RATIO_THRESHOLD,
        }
    }

    pub fn with_match_threshold(mut self, threshold: usize) -> Self {
        self.match_threshold = threshold;
        self
    }

    pub fn with_ratio_threshold(mut self, ratio: f32) -> Self {
        self.set_ratio_threshold(ratio);
        self
    }

    pub fn set_match_threshold(&mut self, threshold: usize) {
        self.match_threshold = threshold;
    }

    /// Update the ratio cutoff; values outside (0, 1) are ignored.
    pub fn set_ratio_threshold(&mut self, ratio: f32) {
        if !(ratio > 0.0 && ratio < 1.0) {
            warn!(
                "{}: ignoring ratio threshold {ratio}, must lie in (0, 1)",
                self.name
            );
            return;
        }
        self.ratio_threshold = ratio;
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    #[inline]
    pub fn match_threshold(&self) -> usize {
        self.match_threshold
    }

    #[inline]
    pub fn ratio_threshold(&self) -> f32 {
        self.ratio_threshold
    }
}
