//! Audio and speech collaborators
//!
//! Text-to-speech and sound playback are opaque side-effecting services
//! owned by the host application. Protocols and region commands reach them
//! through these traits; playback is fire-and-forget.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Text-to-speech engine
pub trait SpeechEngine: Send + Sync {
    fn say(&self, text: &str);
}

/// Sound file playback
pub trait SoundPlayer: Send + Sync {
    fn play(&self, path: &Path);
}

/// Audio backend that swallows everything; the default when no engine is
/// attached
#[derive(Debug, Default)]
pub struct NullAudio;

impl SpeechEngine for NullAudio {
    fn say(&self, text: &str) {
        log::debug!("say (no speech engine): {}", text);
    }
}

impl SoundPlayer for NullAudio {
    fn play(&self, path: &Path) {
        log::debug!("play (no sound player): {}", path.display());
    }
}

/// Process-wide audio lifecycle tied to protocol load/unload.
///
/// `stop` without a prior `start` is a no-op, not an error; protocols are
/// torn down on paths where the engine may never have started.
#[derive(Debug, Default)]
pub struct AudioLifecycle {
    started: AtomicBool,
}

impl AudioLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) {
        if !self.started.swap(true, Ordering::SeqCst) {
            log::debug!("Audio engine started");
        }
    }

    pub fn stop(&self) {
        if self.started.swap(false, Ordering::SeqCst) {
            log::debug!("Audio engine stopped");
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}
