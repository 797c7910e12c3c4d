//! Shot detection polling loop
//!
//! A background worker reads frames at the configured detection rate and
//! pushes every localized spot through the session pipeline. Detection and
//! hit resolution for a frame complete fully before the next tick starts;
//! there are never overlapping detection passes.
//!
//! Read misses are counted; on the 25th consecutive miss the camera is
//! declared disconnected exactly once and the loop stops. Any successful
//! read resets the counter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::detector::ShotDetector;
use super::frame::FrameSource;
use crate::core::Session;
use crate::{Result, TrainerError};

/// Consecutive read misses tolerated before declaring a disconnect
pub const MAX_CONSECUTIVE_MISSES: u32 = 25;

/// Background shot detection worker
pub struct DetectionRunner {
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl DetectionRunner {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Start polling `source` every `interval`. Fails if already running.
    pub fn start(
        &mut self,
        source: Box<dyn FrameSource>,
        detector: ShotDetector,
        session: Arc<Mutex<Session>>,
        interval: Duration,
    ) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(TrainerError::AlreadyRunning);
        }

        let running = self.running.clone();
        let handle = thread::spawn(move || {
            run_detection_loop(running, source, detector, session, interval);
        });
        self.worker = Some(handle);

        log::info!(
            "Shot detection started ({} ms interval)",
            interval.as_millis()
        );
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the loop and join the worker
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        log::info!("Shot detection stopped");
    }

    /// Block until the loop exits on its own (test support; the loop ends
    /// when the camera disconnects)
    pub fn join(&mut self) {
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Default for DetectionRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DetectionRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_detection_loop(
    running: Arc<AtomicBool>,
    mut source: Box<dyn FrameSource>,
    mut detector: ShotDetector,
    session: Arc<Mutex<Session>>,
    interval: Duration,
) {
    let mut miss_count: u32 = 0;

    while running.load(Ordering::SeqCst) {
        let tick_start = Instant::now();

        match source.read() {
            None => {
                miss_count += 1;
                log::debug!(
                    "Missed {} webcam frames. If we miss too many, shot processing will stop.",
                    miss_count
                );

                if miss_count >= MAX_CONSECUTIVE_MISSES {
                    log::error!("{}", TrainerError::CameraDisconnected(miss_count));
                    session.lock().camera_disconnected(miss_count);
                    break;
                }
            }
            Some(frame) => {
                miss_count = 0;

                let outcome = detector.detect(&frame);

                // The full pipeline for this frame (commands, protocol
                // callbacks) finishes under one lock before the next tick
                let mut session = session.lock();
                if let Some(percent_dark) = outcome.interference {
                    session.interference_detected(percent_dark);
                }
                for candidate in outcome.candidates {
                    session.handle_shot(
                        candidate.color,
                        (candidate.pos.0 as f64, candidate.pos.1 as f64),
                    );
                }
                session.poll_reset();
            }
        }

        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }

    running.store(false, Ordering::SeqCst);
}
