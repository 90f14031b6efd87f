//! High-level facade crate for the `object-spot-*` workspace.
//!
//! This crate provides:
//! - stable re-exports of the underlying pipeline crates
//! - (feature-gated) helpers bridging `image` crate buffers into the
//!   pipeline's own frame type, for loading reference images at startup.
//!
//! ## Quickstart
//!
//! ```no_run
//! use object_spot::core::FeatureSet;
//! use object_spot::detect::{DecisionEngine, ReferenceObject};
//!
//! // features normally come from the application's extractor collaborator
//! let reference = ReferenceObject::new("book", 320, 240, FeatureSet::empty())
//!     .with_match_threshold(40);
//! let frame_features = FeatureSet::empty();
//!
//! let engine = DecisionEngine::new();
//! let decision = engine.decide(&frame_features, &reference, true);
//! println!("found: {} ({} matches)", decision.found, decision.good_match_count);
//! ```
//!
//! ## API map
//! - `object_spot::core`: image buffers, feature sets, homographies.
//! - `object_spot::detect`: ratio-test matcher, RANSAC verifier, decisions.
//! - `object_spot::acquire`: collaborator traits and the fixed-rate
//!   acquisition loop with its start/stop lifecycle.
//! - `object_spot::io` (feature `image`): load reference images from disk.

pub use object_spot_acquire as acquire;
pub use object_spot_core as core;
pub use object_spot_detect as detect;

pub use object_spot_acquire::{AcquisitionLoop, LoopHandle, LoopParams, TrackedObject};
pub use object_spot_core::{FeatureSet, Keypoint, RgbImage};
pub use object_spot_detect::{Decision, DecisionEngine, ReferenceObject};

#[cfg(feature = "image")]
pub mod io;
