//! Recognition layer: match query features against a reference object,
//! verify the match geometry with a robust homography fit, and reduce both
//! to a per-frame presence decision.
//!
//! The crate is pure with respect to external state; descriptor extraction
//! and frame acquisition live behind the seams of `object-spot-acquire`.

mod engine;
mod matcher;
mod params;
mod ransac;
mod reference;
mod verify;

pub use engine::{Decision, DecisionEngine};
pub use matcher::{CandidateMatch, DescriptorMetric, Euclidean, GoodMatch, Matcher};
pub use params::VerifierParams;
pub use ransac::{fit_homography_ransac, RansacFit};
pub use reference::{ReferenceObject, DEFAULT_MATCH_THRESHOLD, DEFAULT_RATIO_THRESHOLD};
pub use verify::{GeometricVerifier, VerificationResult};
