use object_spot_core::FeatureSet;
use serde::{Deserialize, Serialize};

/// Distance between two descriptors. The metric is a property of the
/// descriptor family and must be applied consistently on both sides of a
/// match.
pub trait DescriptorMetric {
    fn distance(&self, a: &[f32], b: &[f32]) -> f32;
}

/// Euclidean (L2) distance, the usual metric for float descriptors.
#[derive(Clone, Copy, Debug, Default)]
pub struct Euclidean;

impl DescriptorMetric for Euclidean {
    #[inline]
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt()
    }
}

/// Nearest and second-nearest reference neighbor of one query feature.
///
/// Invariant: `distance <= second_distance`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub query_index: usize,
    pub reference_index: usize,
    pub distance: f32,
    pub second_distance: f32,
}

/// A candidate retained by the ratio test:
/// `distance <= ratio * second_distance`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoodMatch {
    pub query_index: usize,
    pub reference_index: usize,
    pub distance: f32,
    pub second_distance: f32,
}

/// Two-nearest-neighbor matcher with Lowe's ratio test.
#[derive(Clone, Debug, Default)]
pub struct Matcher<M = Euclidean> {
    metric: M,
}

impl Matcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M: DescriptorMetric> Matcher<M> {
    pub fn with_metric(metric: M) -> Self {
        Self { metric }
    }

    /// Match every query feature against the reference set and keep only the
    /// unambiguous ones.
    ///
    /// Output order follows query index order. Distance ties keep the
    /// earlier reference candidate. References with fewer than two features
    /// cannot support the ratio test, so nothing matches against them.
    pub fn match_features(
        &self,
        query: &FeatureSet,
        reference: &FeatureSet,
        ratio: f32,
    ) -> Vec<GoodMatch> {
        if query.is_empty() || reference.len() < 2 {
            return Vec::new();
        }

        let mut good = Vec::new();
        for qi in 0..query.len() {
            let Some(candidate) = self.two_nearest(query, qi, reference) else {
                continue;
            };
            if candidate.distance <= ratio * candidate.second_distance {
                good.push(GoodMatch {
                    query_index: candidate.query_index,
                    reference_index: candidate.reference_index,
                    distance: candidate.distance,
                    second_distance: candidate.second_distance,
                });
            }
        }
        good
    }

    fn two_nearest(
        &self,
        query: &FeatureSet,
        query_index: usize,
        reference: &FeatureSet,
    ) -> Option<CandidateMatch> {
        let qd = query.descriptor(query_index);
        let mut best = f32::INFINITY;
        let mut second = f32::INFINITY;
        let mut best_index = 0usize;

        for ri in 0..reference.len() {
            let d = self.metric.distance(qd, reference.descriptor(ri));
            if d < best {
                second = best;
                best = d;
                best_index = ri;
            } else if d < second {
                second = d;
            }
        }

        if !second.is_finite() {
            return None;
        }
        Some(CandidateMatch {
            query_index,
            reference_index: best_index,
            distance: best,
            second_distance: second,
        })
    }
}
