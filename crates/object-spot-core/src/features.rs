use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A detected interest point: image position plus detector metadata.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub position: Point2<f32>,
    /// Characteristic scale of the local patch, in pixels.
    pub scale: f32,
    /// Dominant orientation in radians.
    pub orientation: f32,
    /// Detector response strength.
    pub response: f32,
}

impl Keypoint {
    /// Keypoint at a position with neutral metadata.
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Point2::new(x, y),
            scale: 1.0,
            orientation: 0.0,
            response: 0.0,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FeatureSetError {
    #[error(
        "descriptor buffer holds {got} values, expected {expected} \
         ({count} keypoints x {len} per descriptor)"
    )]
    LengthMismatch {
        got: usize,
        expected: usize,
        count: usize,
        len: usize,
    },
}

/// Keypoints of one image together with their descriptors.
///
/// Descriptors are fixed-length f32 vectors stored in one flat buffer;
/// `descriptor(i)` describes `keypoints()[i]`. The set is computed once per
/// image and never mutated.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FeatureSet {
    keypoints: Vec<Keypoint>,
    descriptor_len: usize,
    descriptors: Vec<f32>,
}

impl FeatureSet {
    /// Build a feature set, checking that keypoints and descriptors are
    /// index-aligned.
    pub fn new(
        keypoints: Vec<Keypoint>,
        descriptor_len: usize,
        descriptors: Vec<f32>,
    ) -> Result<Self, FeatureSetError> {
        let expected = keypoints.len() * descriptor_len;
        if descriptors.len() != expected {
            return Err(FeatureSetError::LengthMismatch {
                got: descriptors.len(),
                expected,
                count: keypoints.len(),
                len: descriptor_len,
            });
        }
        Ok(Self {
            keypoints,
            descriptor_len,
            descriptors,
        })
    }

    /// Feature set with no keypoints.
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    #[inline]
    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    #[inline]
    pub fn descriptor_len(&self) -> usize {
        self.descriptor_len
    }

    #[inline]
    pub fn descriptor(&self, index: usize) -> &[f32] {
        let start = index * self.descriptor_len;
        &self.descriptors[start..start + self.descriptor_len]
    }
}
