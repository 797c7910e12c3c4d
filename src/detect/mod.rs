//! Shot detection
//!
//! Frame acquisition, laser spot localization and colour classification,
//! interference detection, and the polling loop that drives it all.

mod detector;
mod frame;
mod runner;

pub use detector::{
    DetectionOutcome, InterferencePrompt, NoPrompt, ShotCandidate, ShotDetector,
};
pub use frame::{FrameSequence, FrameSource};
pub use runner::{DetectionRunner, MAX_CONSECUTIVE_MISSES};
