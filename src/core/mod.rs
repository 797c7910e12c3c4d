//! Core session types
//!
//! This module contains the session-level pieces of the engine:
//! - [`Shot`] / [`ShotLog`] - detection events and the append-only log
//! - [`Session`] - the per-shot pipeline and protocol orchestration
//! - [`SessionEvent`] - immutable events posted back to the UI thread

mod events;
mod session;
pub mod shot;

pub use events::{EventCallback, EventHandler, SessionEvent};
pub use session::{Collaborators, Session};
pub use shot::{
    LaserColor, NullShotList, RecordingShotList, Shot, ShotItemId, ShotListSink, ShotLog,
};
