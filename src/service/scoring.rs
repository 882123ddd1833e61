//! Frame scoring worker
//!
//! Capture and scoring run on separate threads bridged by a small bounded
//! channel: the capture side must never stall on a slow detector, and a
//! dropped frame costs nothing since only the latest observation matters. The
//! scoring side writes all four observation fields under one lock hold, so
//! report handlers never see a half-updated estimate.

use crate::error::Result;
use crate::vision::{Observation, SharedObservation, VisionPipeline};
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Frames queued between capture and scoring; beyond this, frames drop
const FRAME_QUEUE_DEPTH: usize = 2;

/// Pause after a capture failure before retrying
const CAPTURE_RETRY: Duration = Duration::from_millis(50);

/// How long the scoring thread waits for a frame before rechecking shutdown
const SCORE_RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Spawn the capture and scoring threads for a wired pipeline
pub fn spawn(
    pipeline: VisionPipeline,
    shared: SharedObservation,
    running: Arc<AtomicBool>,
) -> Result<(JoinHandle<()>, JoinHandle<()>)> {
    let VisionPipeline {
        mut source,
        mut scorer,
        estimator,
    } = pipeline;

    let (frame_tx, frame_rx) = bounded(FRAME_QUEUE_DEPTH);

    let capture_running = Arc::clone(&running);
    let capture = std::thread::Builder::new()
        .name("capture".to_string())
        .spawn(move || {
            log::info!("capture thread running");
            while capture_running.load(Ordering::Relaxed) {
                match source.next_frame() {
                    Ok(frame) => {
                        if frame_tx.try_send(frame).is_err() {
                            log::trace!("scoring busy, dropped a frame");
                        }
                    }
                    Err(e) => {
                        log::warn!("frame capture failed: {}", e);
                        std::thread::sleep(CAPTURE_RETRY);
                    }
                }
            }
            log::info!("capture thread stopped");
            // frame_tx drops here, which unblocks the scoring thread
        })?;

    let scoring = std::thread::Builder::new()
        .name("scoring".to_string())
        .spawn(move || {
            log::info!("scoring thread running");
            while running.load(Ordering::Relaxed) {
                let frame = match frame_rx.recv_timeout(SCORE_RECV_TIMEOUT) {
                    Ok(frame) => frame,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                };

                let result = scorer.score_frame(&frame);
                let observation = match (result.found, result.bounding_box) {
                    (true, Some(bounds)) => {
                        let range = estimator.estimate(&bounds, frame.width, frame.height);
                        Observation {
                            found: true,
                            score: result.score,
                            distance: range.distance,
                            angle: range.angle,
                        }
                    }
                    _ => Observation::default(),
                };

                shared.store(observation);
            }
            log::info!("scoring thread stopped");
        })?;

    Ok((capture, scoring))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::vision::{
        Frame, FrameSource, RangeEstimate, RangeEstimator, Rect, ScoreResult, TargetScorer,
    };
    use std::time::Instant;

    struct BrightSource;

    impl FrameSource for BrightSource {
        fn next_frame(&mut self) -> Result<Frame> {
            std::thread::sleep(Duration::from_millis(5));
            Ok(Frame {
                width: 4,
                height: 4,
                pixels: vec![255; 16],
            })
        }
    }

    struct BrightnessScorer;

    impl TargetScorer for BrightnessScorer {
        fn score_frame(&mut self, frame: &Frame) -> ScoreResult {
            let lit = frame.pixels.iter().any(|p| *p > 128);
            ScoreResult {
                found: lit,
                score: if lit { 75.0 } else { 0.0 },
                bounding_box: lit.then_some(Rect {
                    x: 0,
                    y: 0,
                    width: frame.width,
                    height: frame.height,
                }),
            }
        }
    }

    struct FixedEstimator;

    impl RangeEstimator for FixedEstimator {
        fn estimate(&self, _: &Rect, _: u32, _: u32) -> RangeEstimate {
            RangeEstimate {
                distance: 2.0,
                angle: 1.5,
            }
        }
    }

    #[test]
    fn test_worker_publishes_observation_and_shuts_down() {
        let shared = SharedObservation::new();
        let running = Arc::new(AtomicBool::new(true));

        let pipeline = VisionPipeline {
            source: Box::new(BrightSource),
            scorer: Box::new(BrightnessScorer),
            estimator: Box::new(FixedEstimator),
        };

        let (capture, scoring) =
            spawn(pipeline, shared.clone(), Arc::clone(&running)).unwrap();

        // The bright first frame must surface as a found observation
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let obs = shared.snapshot();
            if obs.found {
                assert_eq!(obs.score, 75.0);
                assert_eq!(obs.distance, 2.0);
                assert_eq!(obs.angle, 1.5);
                break;
            }
            assert!(Instant::now() < deadline, "observation never published");
            std::thread::sleep(Duration::from_millis(5));
        }

        running.store(false, Ordering::Relaxed);
        capture.join().unwrap();
        scoring.join().unwrap();
    }
}
