//! Vision collaborator interfaces and the shared observation
//!
//! The scoring math lives behind three traits (frame capture, target
//! scoring, range estimation) so the serving side never depends on a
//! particular camera or detector. The daemon wires a pipeline at startup
//! from the config; the built-in `synthetic` pipeline needs no hardware.

pub mod mock;

use crate::config::VisionConfig;
use crate::error::{Error, Result};
use std::sync::{Arc, Mutex};

/// One captured camera frame, 8-bit luma, row-major
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Axis-aligned bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Outcome of scoring one frame
#[derive(Debug, Clone, Copy)]
pub struct ScoreResult {
    pub found: bool,
    /// 0-100, higher is a better target match
    pub score: f64,
    pub bounding_box: Option<Rect>,
}

/// Distance and bearing to a detected target
#[derive(Debug, Clone, Copy)]
pub struct RangeEstimate {
    /// Meters to the target
    pub distance: f64,
    /// Degrees off the camera centerline, positive to the right
    pub angle: f64,
}

/// Blocking, endless source of camera frames
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Frame>;
}

/// Scores a frame for the best target candidate
pub trait TargetScorer: Send {
    fn score_frame(&mut self, frame: &Frame) -> ScoreResult;
}

/// Turns a bounding box into a distance/angle estimate
pub trait RangeEstimator: Send {
    fn estimate(&self, bounds: &Rect, frame_width: u32, frame_height: u32) -> RangeEstimate;
}

/// A complete wired pipeline: capture, score, estimate
pub struct VisionPipeline {
    pub source: Box<dyn FrameSource>,
    pub scorer: Box<dyn TargetScorer>,
    pub estimator: Box<dyn RangeEstimator>,
}

/// Build the pipeline named in the config
pub fn create_pipeline(config: &VisionConfig) -> Result<VisionPipeline> {
    match config.pipeline.as_str() {
        "synthetic" => Ok(mock::synthetic_pipeline(&config.tuning)),
        other => Err(Error::Other(format!("unknown vision pipeline: {}", other))),
    }
}

/// The link's current best estimate of the target
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Observation {
    pub found: bool,
    pub score: f64,
    /// Meters to the target; meaningless when `found` is false
    pub distance: f64,
    /// Degrees off centerline; meaningless when `found` is false
    pub angle: f64,
}

/// Latest observation, shared between the scoring worker (sole writer) and
/// the report handlers (readers)
///
/// One mutex guards the whole struct; it is held only for the copy in or
/// out, never across socket I/O, so a reader always sees the four fields of
/// a single write together.
#[derive(Clone, Default)]
pub struct SharedObservation {
    inner: Arc<Mutex<Observation>>,
}

impl SharedObservation {
    /// Starts as "not found"
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite every field atomically with respect to readers
    pub fn store(&self, obs: Observation) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *guard = obs;
    }

    /// Copy of the most recently stored observation
    pub fn snapshot(&self) -> Observation {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
