use serde::{Deserialize, Serialize};

/// Configuration for the robust homography fit.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct VerifierParams {
    /// Number of consensus-sampling rounds.
    pub max_iterations: usize,
    /// Reprojection error below which a correspondence counts as an inlier,
    /// in pixels.
    pub reproj_threshold_px: f32,
    /// Minimal consensus-set size to accept a fit. Values below 4 are
    /// treated as 4, the minimum a homography needs.
    pub min_inliers: usize,
    /// Seed for the sampling RNG; a fixed seed makes verification
    /// reproducible for identical inputs.
    pub seed: u64,
}

impl Default for VerifierParams {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            reproj_threshold_px: 3.0,
            min_inliers: 4,
            seed: 7,
        }
    }
}
