//! Acquisition layer: a fixed-period loop that pulls frames, runs the
//! decision engine over configured reference objects in priority order and
//! dispatches side effects (overlay, announcement, display).
//!
//! The robot, camera and feature extractor are collaborators behind traits;
//! this crate owns only the scheduling, the dispatch ordering and the
//! stop/quiesce lifecycle.

mod acquisition;
mod config;
mod traits;

pub use acquisition::{AcquisitionLoop, LoopCounters, LoopHandle, SearchState, StartError};
pub use config::{LoopParams, TrackedObject};
pub use traits::{
    Actuator, FeatureExtractor, FrameError, FrameSink, FrameSource, LatestFrameSink,
};
