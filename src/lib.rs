//! Dryfire Core
//!
//! A laser dry-fire training engine: it locates laser-pointer hits on a
//! webcam feed, resolves them against layered user-authored target regions,
//! and drives pluggable training protocols that score the session.
//!
//! The GUI, the physical webcam, and the audio/speech engines are external
//! collaborators. This crate owns the detection and hit-resolution pipeline
//! and talks to the collaborators through narrow traits (`FrameSource`,
//! `SpeechEngine`, `SoundPlayer`, `ShotListSink`, `InterferencePrompt`).

pub mod audio;
pub mod config;
pub mod core;
pub mod detect;
pub mod hits;
pub mod projector;
pub mod protocols;
pub mod targets;

// Re-export commonly used types
pub use crate::core::{LaserColor, Session, SessionEvent, Shot};
pub use config::AppConfig;
pub use detect::{DetectionRunner, FrameSource, ShotDetector};
pub use hits::HitResolver;
pub use projector::{ArenaMapper, CalibrationState};
pub use protocols::{ProtocolInfo, ProtocolRegistry, TrainingProtocol};
pub use targets::{Region, RegionStore, TagMap};

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, TrainerError>;

/// Errors surfaced by the training engine.
///
/// Only the two camera conditions are fatal to a running session; everything
/// else is contained at the component boundary.
#[derive(Debug, Error)]
pub enum TrainerError {
    /// Video capturing could not be initialized at startup
    #[error("cannot open video camera {0}")]
    CameraUnavailable(u32),

    /// Too many consecutive frame reads failed mid-session
    #[error("missed {0} consecutive webcam frames, the camera is probably disconnected")]
    CameraDisconnected(u32),

    /// A preference value failed range validation
    #[error("invalid value for {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    /// The settings file could not be parsed
    #[error("failed to parse settings: {0}")]
    Settings(#[from] toml::de::Error),

    /// A target definition file could not be parsed
    #[error("failed to parse target file: {0}")]
    TargetFile(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No protocol with the requested id is registered
    #[error("no training protocol registered with id '{0}'")]
    ProtocolNotFound(String),

    /// Detection loop is already running
    #[error("shot detection is already running")]
    AlreadyRunning,
}
