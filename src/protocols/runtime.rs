//! Protocol lifecycle
//!
//! Exactly one training protocol is live at a time. The runtime drives the
//! lifecycle (load, shot/hit dispatch, reset, destroy) and guarantees that a
//! destroyed protocol fires no further callbacks: protocol worker threads
//! wait on a [`CancellationToken`] instead of sleeping, and `destroy`
//! implementations join them before returning.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::operations::ProtocolOps;
use super::{BoxedProtocol, ProtocolInfo, ProtocolRegistry};
use crate::core::shot::{Shot, ShotItemId};
use crate::hits::HitRegion;
use crate::targets::TargetSnapshot;
use crate::{Result, TrainerError};

/// Interruptible cancellation signal shared with protocol worker threads.
///
/// Waits wake immediately on `cancel`, never blocking a destroy behind a
/// full round timer.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation and wake every waiter
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        *cancelled = true;
        self.inner.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Block for up to `timeout`. Returns `true` if cancellation was
    /// observed, `false` if the full timeout elapsed.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut cancelled = self.inner.cancelled.lock();

        while !*cancelled {
            if self.inner.condvar.wait_until(&mut cancelled, deadline).timed_out() {
                return *cancelled;
            }
        }

        true
    }
}

/// Lifecycle state of the loaded protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    /// No protocol loaded
    Unloaded,
    /// Factory is constructing the instance
    Initializing,
    /// Accepting shot/hit callbacks
    Running,
    /// A reset is in flight; shot callbacks are held off
    Resetting,
    /// Torn down; terminal for the instance
    Destroyed,
}

/// Host-side driver for the single live protocol
pub struct ProtocolRuntime {
    protocol: Option<BoxedProtocol>,
    info: Option<ProtocolInfo>,
    ops: Option<Arc<dyn ProtocolOps>>,
    state: ProtocolState,
}

impl ProtocolRuntime {
    pub fn new() -> Self {
        Self {
            protocol: None,
            info: None,
            ops: None,
            state: ProtocolState::Unloaded,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.protocol.is_some()
    }

    pub fn info(&self) -> Option<&ProtocolInfo> {
        self.info.as_ref()
    }

    /// Load a protocol by id, tearing down any previous one first.
    ///
    /// The old instance is fully destroyed (threads joined, columns
    /// reverted) before the new one initializes.
    pub fn load(
        &mut self,
        registry: &ProtocolRegistry,
        id: &str,
        ops: Arc<dyn ProtocolOps>,
        targets: &[TargetSnapshot],
    ) -> Result<()> {
        let factory = registry
            .get(id)
            .ok_or_else(|| TrainerError::ProtocolNotFound(id.to_string()))?;

        if self.is_loaded() {
            self.unload();
        }

        let info = factory.info();
        log::info!("Loading training protocol '{}' v{}", info.name, info.version);

        self.state = ProtocolState::Initializing;
        let protocol = factory.create(ops.clone(), targets);

        self.protocol = Some(protocol);
        self.info = Some(info);
        self.ops = Some(ops);
        self.state = ProtocolState::Running;

        Ok(())
    }

    /// Dispatch one resolved shot. `on_hit` precedes `on_shot` when a target
    /// was hit.
    pub fn handle_shot(&mut self, shot: &Shot, item: ShotItemId, hit: Option<&HitRegion>) {
        if self.state != ProtocolState::Running {
            return;
        }
        let Some(protocol) = self.protocol.as_mut() else {
            return;
        };

        if let Some(hit) = hit {
            protocol.on_hit(hit, shot, item);
        }
        protocol.on_shot(shot, item, hit.is_some());
    }

    /// Reset the protocol with a fresh snapshot of the current targets
    pub fn reset(&mut self, targets: &[TargetSnapshot]) {
        if self.state != ProtocolState::Running {
            return;
        }
        let Some(protocol) = self.protocol.as_mut() else {
            return;
        };

        self.state = ProtocolState::Resetting;
        protocol.reset(targets);
        self.state = ProtocolState::Running;
    }

    /// Destroy the live protocol. Returns only after the instance has
    /// confirmed its background threads observed cancellation.
    pub fn unload(&mut self) {
        if let Some(mut protocol) = self.protocol.take() {
            self.state = ProtocolState::Destroyed;
            protocol.destroy();

            if let Some(ops) = &self.ops {
                ops.revert_shot_list_columns();
            }

            if let Some(info) = &self.info {
                log::info!("Training protocol '{}' destroyed", info.name);
            }
        }

        self.info = None;
        self.ops = None;
        self.state = ProtocolState::Unloaded;
    }
}

impl Default for ProtocolRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProtocolRuntime {
    fn drop(&mut self) {
        self.unload();
    }
}
