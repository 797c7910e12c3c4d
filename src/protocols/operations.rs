//! Operations facade exposed to training protocols
//!
//! Protocols never touch the canvas, the shot list widget, or the audio
//! engine directly; everything goes through [`ProtocolOps`]. The session
//! provides the real implementation, tests and degenerate hosts use
//! [`NullOps`].

use crate::core::shot::ShotItemId;

/// Handle to a target a protocol placed on the projector arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetHandle(pub String);

/// How a target centroid is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CentroidMode {
    /// Average of the member regions' bounding-box centers
    BoundingBox,
    /// Average of all outline vertices
    Vertices,
}

/// The narrow host surface a training protocol may call back into.
///
/// All methods are callable from protocol timer threads; implementations
/// must not require the caller to hold any session lock.
pub trait ProtocolOps: Send + Sync {
    /// Speak text through the host's TTS engine
    fn say(&self, text: &str);

    /// Play a sound file
    fn play_sound(&self, path: &str);

    /// Show text overlaid on the webcam feed
    fn show_text_on_feed(&self, text: &str);

    /// Add protocol-specific shot list columns after the defaults
    fn add_shot_list_columns(&self, names: &[&str], widths: &[u32]);

    /// Append values to a shot's row under the protocol columns
    fn append_shot_item_values(&self, item: ShotItemId, values: &[String]);

    /// Drop all protocol-specific columns (called by the host on destroy)
    fn revert_shot_list_columns(&self);

    /// Gate shot handling without stopping the detection loop
    fn pause_shot_detection(&self, pause: bool);

    /// Clear the session shot log and shot list
    fn clear_shots(&self);

    /// Request a full session reset
    fn reset(&self);

    /// Whether the projector arena window is open
    fn projector_arena_visible(&self) -> bool;

    /// Load a target definition by name onto the arena at `(x, y)`.
    /// Returns `None` when the definition cannot be found.
    fn add_projector_target(&self, name: &str, x: f64, y: f64) -> Option<TargetHandle>;

    /// Remove a target previously added to the arena
    fn delete_projector_target(&self, handle: &TargetHandle);

    /// Arena canvas dimensions in its own coordinate space
    fn projector_arena_dimensions(&self) -> (u32, u32);

    /// Centroid of a loaded target's regions, on either canvas
    fn calculate_target_centroid(&self, target: &str, mode: CentroidMode) -> Option<(f64, f64)>;
}

/// Facade that ignores everything; used when no host is attached
#[derive(Debug, Default)]
pub struct NullOps;

impl ProtocolOps for NullOps {
    fn say(&self, text: &str) {
        log::debug!("say: {}", text);
    }
    fn play_sound(&self, _path: &str) {}
    fn show_text_on_feed(&self, _text: &str) {}
    fn add_shot_list_columns(&self, _names: &[&str], _widths: &[u32]) {}
    fn append_shot_item_values(&self, _item: ShotItemId, _values: &[String]) {}
    fn revert_shot_list_columns(&self) {}
    fn pause_shot_detection(&self, _pause: bool) {}
    fn clear_shots(&self) {}
    fn reset(&self) {}
    fn projector_arena_visible(&self) -> bool {
        false
    }
    fn add_projector_target(&self, _name: &str, _x: f64, _y: f64) -> Option<TargetHandle> {
        None
    }
    fn delete_projector_target(&self, _handle: &TargetHandle) {}
    fn projector_arena_dimensions(&self) -> (u32, u32) {
        (0, 0)
    }
    fn calculate_target_centroid(&self, _target: &str, _mode: CentroidMode) -> Option<(f64, f64)> {
        None
    }
}
