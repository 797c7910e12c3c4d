//! Events emitted by the training session
//!
//! Worker threads never touch shared drawing state; they emit immutable
//! events that the UI-owning thread drains and renders.

use crate::core::shot::Shot;
use crate::targets::TagMap;

/// Event emitted by the session pipeline
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A laser spot was detected and recorded
    ShotDetected(Shot),
    /// A shot landed on a target region
    TargetHit {
        /// Internal name of the hit target
        target: String,
        tags: TagMap,
        shot: Shot,
    },
    /// Glare or a light source was flagged on the feed (once per session)
    InterferenceDetected {
        /// Fraction of the thresholded frame that was dark
        percent_dark: f64,
    },
    /// The camera missed too many consecutive frames; detection has stopped
    CameraDisconnected { missed_frames: u32 },
    /// Calibration mode ended without a lock ever being achieved
    CalibrationNeverLocked,
    /// A protocol asked for text on the feed
    TextOnFeed(String),
    /// A region command asked for an animation replay
    Animate { target: Option<String> },
}

/// Callback type for session events
pub type EventCallback = Box<dyn Fn(&SessionEvent) + Send + Sync>;

/// Event handler that can have multiple listeners
#[derive(Default)]
pub struct EventHandler {
    callbacks: Vec<EventCallback>,
}

impl EventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener for session events
    pub fn subscribe(&mut self, callback: EventCallback) {
        self.callbacks.push(callback);
    }

    /// Emit an event to all listeners
    pub fn emit(&self, event: &SessionEvent) {
        for callback in &self.callbacks {
            callback(event);
        }
    }

    pub fn has_listeners(&self) -> bool {
        !self.callbacks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_reaches_all_listeners() {
        let mut handler = EventHandler::new();
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let count = count.clone();
            handler.subscribe(Box::new(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            }));
        }

        handler.emit(&SessionEvent::TextOnFeed("ready".to_string()));
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(handler.has_listeners());
    }
}
