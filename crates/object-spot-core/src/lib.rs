//! Core types for reference-object spotting.
//!
//! This crate is intentionally small: image buffers, feature sets and planar
//! projective transforms. It does *not* depend on any concrete feature
//! detector, descriptor matcher or frame source.

mod features;
mod homography;
mod image;
mod logger;

pub use features::{FeatureSet, FeatureSetError, Keypoint};
pub use homography::{fit_homography, homography_from_quad, Homography};
pub use image::{draw_quad, draw_segment, RgbImage, RgbImageView};
pub use logger::init_with_level;
