//! Training protocols
//!
//! A protocol is a pluggable scoring/session state machine driven by shot
//! and hit events. This module defines the plugin contract
//! ([`TrainingProtocol`] + [`ProtocolFactory`]), the host-facing lifecycle
//! driver ([`ProtocolRuntime`]), the registry protocols are selected from,
//! and the narrow [`operations`] facade a protocol may call back into.

pub mod operations;
mod registry;
mod runtime;

// Built-in protocols
pub mod shoot_dont_shoot;
pub mod timed_holster;

pub use operations::{CentroidMode, NullOps, ProtocolOps, TargetHandle};
pub use registry::ProtocolRegistry;
pub use runtime::{CancellationToken, ProtocolRuntime, ProtocolState};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::shot::{Shot, ShotItemId};
use crate::hits::HitRegion;
use crate::targets::TargetSnapshot;

/// Descriptive metadata for a protocol, shown in menus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolInfo {
    pub name: String,
    pub version: String,
    pub creator: String,
    pub description: String,
}

/// The contract a live protocol instance must satisfy.
///
/// Instances are driven from the session thread; any background round
/// timers a protocol spawns must wait on its [`CancellationToken`] so that
/// `destroy` can interrupt them and join before returning.
pub trait TrainingProtocol: Send {
    /// Called for every recorded shot, after any `on_hit` for the same shot
    fn on_shot(&mut self, shot: &Shot, item: ShotItemId, is_hit: bool);

    /// Called when a shot lands on a target region, before `on_shot`
    fn on_hit(&mut self, hit: &HitRegion, shot: &Shot, item: ShotItemId);

    /// Restore the protocol to its initial running state with a fresh
    /// snapshot of the currently loaded targets
    fn reset(&mut self, targets: &[TargetSnapshot]);

    /// Tear down. Must not return until background threads have observed
    /// cancellation; no callback may fire afterwards.
    fn destroy(&mut self);
}

/// Boxed protocol instance
pub type BoxedProtocol = Box<dyn TrainingProtocol>;

/// Factory for creating protocol instances
pub trait ProtocolFactory: Send + Sync {
    /// Unique identifier, used for selection
    fn id(&self) -> &'static str;

    /// Protocol metadata
    fn info(&self) -> ProtocolInfo;

    /// Create a live instance. A protocol that cannot find the targets it
    /// depends on must still return an instance, degraded to a no-op that
    /// announces the requirement.
    fn create(&self, ops: Arc<dyn ProtocolOps>, targets: &[TargetSnapshot]) -> BoxedProtocol;
}
