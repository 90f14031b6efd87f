use log::debug;
use serde::Serialize;

use object_spot_core::FeatureSet;

use crate::matcher::{DescriptorMetric, Euclidean, Matcher};
use crate::params::VerifierParams;
use crate::reference::ReferenceObject;
use crate::verify::{GeometricVerifier, VerificationResult};

/// Per-frame outcome for one reference object. Recomputed every frame,
/// never persisted.
#[derive(Clone, Debug, Serialize)]
pub struct Decision {
    pub found: bool,
    pub good_match_count: usize,
    /// Present only when the object was found, localization was requested
    /// and the geometry held up. A found object with an absent region is a
    /// valid outcome.
    pub region: Option<VerificationResult>,
}

/// Ties the matcher and the geometric verifier into the single
/// "is this object present, and if so where" query.
///
/// Every call recomputes from scratch; nothing is cached between frames.
#[derive(Clone, Debug, Default)]
pub struct DecisionEngine<M = Euclidean> {
    matcher: Matcher<M>,
    verifier: GeometricVerifier,
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verifier_params(params: VerifierParams) -> Self {
        Self {
            matcher: Matcher::new(),
            verifier: GeometricVerifier::new(params),
        }
    }
}

impl<M: DescriptorMetric> DecisionEngine<M> {
    pub fn with_parts(matcher: Matcher<M>, verifier: GeometricVerifier) -> Self {
        Self { matcher, verifier }
    }

    /// Decide whether `reference` is present among the query features.
    ///
    /// Presence is a pure match-count test: at least `match_threshold` good
    /// matches. When `want_region` is set and the object is present, the
    /// verifier localizes it; a failed verification leaves the decision
    /// positive with `region = None`.
    pub fn decide(
        &self,
        query: &FeatureSet,
        reference: &ReferenceObject,
        want_region: bool,
    ) -> Decision {
        let good =
            self.matcher
                .match_features(query, reference.features(), reference.ratio_threshold());
        let found = good.len() >= reference.match_threshold();
        debug!(
            "{}: {} good matches, threshold {} -> {}",
            reference.name(),
            good.len(),
            reference.match_threshold(),
            if found { "found" } else { "not found" },
        );

        let region = if found && want_region {
            self.verifier
                .verify(&good, reference.features(), query, reference.size())
        } else {
            None
        };

        Decision {
            found,
            good_match_count: good.len(),
            region,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_spot_core::Keypoint;

    /// A grid of distinctive features; descriptors are far apart so each
    /// query feature matches its counterpart unambiguously.
    fn grid_features(count: usize, offset: (f32, f32), descriptor_base: f32) -> FeatureSet {
        let side = (count as f32).sqrt().ceil() as usize;
        let keypoints: Vec<Keypoint> = (0..count)
            .map(|i| {
                let (gx, gy) = ((i % side) as f32, (i / side) as f32);
                Keypoint::at(gx * 20.0 + offset.0, gy * 20.0 + offset.1)
            })
            .collect();
        let descriptors: Vec<f32> = (0..count)
            .map(|i| descriptor_base + i as f32 * 50.0)
            .collect();
        FeatureSet::new(keypoints, 1, descriptors).expect("aligned")
    }

    fn reference_with(count: usize, threshold: usize) -> ReferenceObject {
        ReferenceObject::new("probe", 200, 200, grid_features(count, (0.0, 0.0), 0.0))
            .with_match_threshold(threshold)
    }

    #[test]
    fn match_count_crosses_threshold_inclusively() {
        let engine = DecisionEngine::new();
        let query = grid_features(150, (10.0, 4.0), 0.0);

        let at_100 = engine.decide(&query, &reference_with(150, 100), false);
        assert!(at_100.found);
        assert_eq!(at_100.good_match_count, 150);

        let at_150 = engine.decide(&query, &reference_with(150, 150), false);
        assert!(at_150.found, "threshold equal to the count still finds");

        let at_200 = engine.decide(&query, &reference_with(150, 200), false);
        assert!(!at_200.found);
        assert!(at_200.region.is_none());
    }

    #[test]
    fn raising_the_threshold_never_creates_a_find() {
        let engine = DecisionEngine::new();
        let query = grid_features(60, (0.0, 0.0), 0.0);
        let mut last_found = true;
        for threshold in [1usize, 30, 60, 61, 200] {
            let found = engine
                .decide(&query, &reference_with(60, threshold), false)
                .found;
            assert!(found <= last_found, "found set must shrink monotonically");
            last_found = found;
        }
    }

    #[test]
    fn repeated_decisions_are_identical() {
        let engine = DecisionEngine::new();
        let reference = reference_with(30, 10);
        let query = grid_features(30, (15.0, -8.0), 0.0);

        let a = engine.decide(&query, &reference, true);
        let b = engine.decide(&query, &reference, true);
        assert_eq!(a.found, b.found);
        assert_eq!(a.good_match_count, b.good_match_count);
        let (ra, rb) = (a.region.expect("region"), b.region.expect("region"));
        assert_eq!(ra.corners, rb.corners);
        assert_eq!(ra.inlier_count, rb.inlier_count);
    }

    #[test]
    fn found_object_localizes_under_translation() {
        let engine = DecisionEngine::new();
        let reference = reference_with(25, 20);
        let query = grid_features(25, (30.0, 10.0), 0.0);

        let decision = engine.decide(&query, &reference, true);
        assert!(decision.found);
        let region = decision.region.expect("localized");
        assert_eq!(region.inlier_count, 25);
        let tl = region.corners[0];
        assert!((tl.x - 30.0).abs() < 0.1 && (tl.y - 10.0).abs() < 0.1);
    }

    #[test]
    fn degenerate_geometry_still_reports_found() {
        let engine = DecisionEngine::new();
        // keypoints all on one row: matches abound, geometry cannot hold
        let keypoints: Vec<Keypoint> = (0..8).map(|i| Keypoint::at(i as f32 * 12.0, 3.0)).collect();
        let descriptors: Vec<f32> = (0..8).map(|i| i as f32 * 50.0).collect();
        let features = FeatureSet::new(keypoints, 1, descriptors).expect("aligned");
        let reference =
            ReferenceObject::new("flatline", 100, 100, features.clone()).with_match_threshold(5);

        let decision = engine.decide(&features, &reference, true);
        assert!(decision.found);
        assert_eq!(decision.good_match_count, 8);
        assert!(decision.region.is_none());
    }

    #[test]
    fn region_skipped_when_not_requested() {
        let engine = DecisionEngine::new();
        let reference = reference_with(25, 20);
        let query = grid_features(25, (30.0, 10.0), 0.0);
        let decision = engine.decide(&query, &reference, false);
        assert!(decision.found);
        assert!(decision.region.is_none());
    }
}
