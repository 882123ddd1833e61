//! Synthetic vision pipeline for hardware-free operation and tests
//!
//! The camera renders a bright rectangular target sweeping across a dark
//! frame, disappearing for part of each cycle, so the daemon exercises both
//! found and not-found paths without a real camera. The scorer and
//! estimator are simple but honest implementations of their traits: the
//! scorer thresholds and boxes lit pixels, the estimator applies the
//! pinhole model.

use crate::config::VisionTuning;
use crate::error::Result;
use crate::vision::{
    Frame, FrameSource, RangeEstimate, RangeEstimator, Rect, ScoreResult, TargetScorer,
    VisionPipeline,
};
use std::time::Duration;

/// Frames per sweep cycle; the target is off-frame for the last quarter
const SWEEP_STEPS: u64 = 40;

/// Generates frames with a moving synthetic target
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    frame_period: Duration,
    tick: u64,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32, frame_period: Duration) -> Self {
        Self {
            width,
            height,
            frame_period,
            tick: 0,
        }
    }
}

impl FrameSource for SyntheticCamera {
    fn next_frame(&mut self) -> Result<Frame> {
        std::thread::sleep(self.frame_period);

        let mut pixels = vec![8u8; (self.width * self.height) as usize];
        let phase = self.tick % SWEEP_STEPS;
        self.tick += 1;

        // Last quarter of the cycle: empty frame, target not visible
        if phase < SWEEP_STEPS * 3 / 4 {
            let target_w = self.width / 6;
            let target_h = self.height / 8;
            let span = self.width - target_w;
            let x0 = (span * phase as u32) / (SWEEP_STEPS as u32 * 3 / 4);
            let y0 = self.height / 2 - target_h / 2;

            for y in y0..y0 + target_h {
                for x in x0..x0 + target_w {
                    pixels[(y * self.width + x) as usize] = 230;
                }
            }
        }

        Ok(Frame {
            width: self.width,
            height: self.height,
            pixels,
        })
    }
}

/// Boxes lit pixels and scores the box by fill ratio
pub struct ThresholdScorer {
    tuning: VisionTuning,
}

impl ThresholdScorer {
    pub fn new(tuning: VisionTuning) -> Self {
        Self { tuning }
    }
}

impl TargetScorer for ThresholdScorer {
    fn score_frame(&mut self, frame: &Frame) -> ScoreResult {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        let mut lit: u64 = 0;

        for y in 0..frame.height {
            for x in 0..frame.width {
                if frame.pixels[(y * frame.width + x) as usize] >= self.tuning.val_min {
                    lit += 1;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }

        if lit == 0 {
            return ScoreResult {
                found: false,
                score: 0.0,
                bounding_box: None,
            };
        }

        let bounds = Rect {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        };
        let area = f64::from(bounds.width) * f64::from(bounds.height);
        let score = (lit as f64 / area) * 100.0;
        let found = area >= self.tuning.min_contour_area && score >= self.tuning.min_score;

        ScoreResult {
            found,
            score,
            bounding_box: Some(bounds),
        }
    }
}

/// Pinhole-model range and bearing from a bounding box
pub struct PinholeEstimator {
    focal_length_px: f64,
    target_width_m: f64,
}

impl PinholeEstimator {
    pub fn new(focal_length_px: f64, target_width_m: f64) -> Self {
        Self {
            focal_length_px,
            target_width_m,
        }
    }
}

impl RangeEstimator for PinholeEstimator {
    fn estimate(&self, bounds: &Rect, frame_width: u32, _frame_height: u32) -> RangeEstimate {
        let apparent_width = f64::from(bounds.width.max(1));
        let distance = self.target_width_m * self.focal_length_px / apparent_width;

        let center_x = f64::from(bounds.x) + f64::from(bounds.width) / 2.0;
        let offset = center_x - f64::from(frame_width) / 2.0;
        let angle = (offset / self.focal_length_px).atan().to_degrees();

        RangeEstimate { distance, angle }
    }
}

/// Wire the full synthetic pipeline from the tuning block
pub fn synthetic_pipeline(tuning: &VisionTuning) -> VisionPipeline {
    VisionPipeline {
        source: Box::new(SyntheticCamera::new(320, 240, Duration::from_millis(33))),
        scorer: Box::new(ThresholdScorer::new(*tuning)),
        estimator: Box::new(PinholeEstimator::new(
            tuning.focal_length_px,
            tuning.target_width_m,
        )),
    }
}
