use log::debug;
use nalgebra::Point2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use object_spot_core::{fit_homography, homography_from_quad, Homography};

use crate::params::VerifierParams;

/// Outcome of a successful consensus fit.
#[derive(Clone, Debug)]
pub struct RansacFit {
    pub homography: Homography,
    /// Indices of the correspondences consistent with the model.
    pub inliers: Vec<usize>,
}

/// Fit `dst ~ H * src` from noisy, outlier-contaminated correspondences.
///
/// Minimal four-point samples are drawn with a seeded RNG, scored by
/// reprojection error, and the best consensus set is refined with a
/// least-squares fit. Returns `None` when fewer than four correspondences
/// are given, every sampled model is degenerate, or the best consensus set
/// stays below `params.min_inliers`.
pub fn fit_homography_ransac(
    src: &[Point2<f32>],
    dst: &[Point2<f32>],
    params: &VerifierParams,
) -> Option<RansacFit> {
    let n = src.len();
    if n != dst.len() || n < 4 {
        return None;
    }

    let threshold_sq = params.reproj_threshold_px * params.reproj_threshold_px;
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    // with exactly four points every sample is the full set
    let rounds = if n == 4 { 1 } else { params.max_iterations };

    let mut best: Option<(Homography, Vec<usize>)> = None;
    let mut degenerate_rounds = 0usize;

    for _ in 0..rounds {
        let picked = rand::seq::index::sample(&mut rng, n, 4);
        let sample_src: [Point2<f32>; 4] = std::array::from_fn(|k| src[picked.index(k)]);
        let sample_dst: [Point2<f32>; 4] = std::array::from_fn(|k| dst[picked.index(k)]);

        let Some(model) = homography_from_quad(&sample_src, &sample_dst) else {
            degenerate_rounds += 1;
            continue;
        };

        let inliers = consensus_set(&model, src, dst, threshold_sq);
        let is_better = best.as_ref().is_none_or(|(_, b)| inliers.len() > b.len());
        if is_better {
            let full_support = inliers.len() == n;
            best = Some((model, inliers));
            if full_support {
                break;
            }
        }
    }

    if degenerate_rounds > 0 {
        debug!("homography sampling: {degenerate_rounds} degenerate rounds");
    }

    let (seed_model, inliers) = best?;
    if inliers.len() < params.min_inliers.max(4) {
        return None;
    }

    // least-squares refit over the consensus set
    let ref_src: Vec<Point2<f32>> = inliers.iter().map(|&i| src[i]).collect();
    let ref_dst: Vec<Point2<f32>> = inliers.iter().map(|&i| dst[i]).collect();
    let homography = fit_homography(&ref_src, &ref_dst).unwrap_or(seed_model);

    Some(RansacFit { homography, inliers })
}

fn consensus_set(
    model: &Homography,
    src: &[Point2<f32>],
    dst: &[Point2<f32>],
    threshold_sq: f32,
) -> Vec<usize> {
    src.iter()
        .zip(dst)
        .enumerate()
        .filter_map(|(i, (&s, &d))| {
            let p = model.project(s);
            let err = (p.x - d.x).powi(2) + (p.y - d.y).powi(2);
            (err <= threshold_sq).then_some(i)
        })
        .collect()
}
