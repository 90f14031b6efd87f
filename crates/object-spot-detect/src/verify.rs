use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use object_spot_core::{FeatureSet, Homography};

use crate::matcher::GoodMatch;
use crate::params::VerifierParams;
use crate::ransac::fit_homography_ransac;

/// A geometrically verified localization: the fitted transform plus the
/// reference image's corner quad projected into the query image.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationResult {
    pub homography: Homography,
    /// Projected reference corners, in order
    /// top-left, top-right, bottom-right, bottom-left.
    pub corners: [Point2<f32>; 4],
    /// Correspondences consistent with the fitted transform.
    pub inlier_count: usize,
}

/// Verifies that good matches agree on a planar transform and localizes the
/// reference object in the query image.
#[derive(Clone, Debug, Default)]
pub struct GeometricVerifier {
    params: VerifierParams,
}

impl GeometricVerifier {
    pub fn new(params: VerifierParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &VerifierParams {
        &self.params
    }

    /// Fit a homography through the matched keypoint pairs.
    ///
    /// Point pairs are built index-aligned with `matches`, reference side as
    /// the transform source and query side as its destination. Fewer than
    /// four matches, or a fit without consensus, yield `None`; both mean
    /// "no localization for this frame", never an error.
    pub fn verify(
        &self,
        matches: &[GoodMatch],
        reference: &FeatureSet,
        query: &FeatureSet,
        reference_size: (u32, u32),
    ) -> Option<VerificationResult> {
        if matches.len() < 4 {
            return None;
        }

        let ref_pts: Vec<Point2<f32>> = matches
            .iter()
            .map(|m| reference.keypoints()[m.reference_index].position)
            .collect();
        let qry_pts: Vec<Point2<f32>> = matches
            .iter()
            .map(|m| query.keypoints()[m.query_index].position)
            .collect();

        let fit = fit_homography_ransac(&ref_pts, &qry_pts, &self.params)?;

        let (w, h) = (reference_size.0 as f32, reference_size.1 as f32);
        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(w, 0.0),
            Point2::new(w, h),
            Point2::new(0.0, h),
        ]
        .map(|c| fit.homography.project(c));

        Some(VerificationResult {
            homography: fit.homography,
            corners,
            inlier_count: fit.inliers.len(),
        })
    }
}
