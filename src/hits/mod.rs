//! Hit resolution
//!
//! Maps a detected shot coordinate to the target region it hit, executing
//! any region commands along the way.
//!
//! Resolution runs two passes over the regions under the point:
//! 1. A topmost-first scan. Every internally-named region encountered runs
//!    its command list; the first *visible* internally-named region is the
//!    canonical hit and ends the scan. An image region whose pixel under the
//!    point is fully transparent is skipped (shots pass through its holes).
//! 2. A sweep that fires commands for every hidden (`visible:false`) command
//!    region under the point, so hidden trigger regions fire even when a
//!    visible region above them already reported the hit.
//!
//! A region's commands execute at most once per shot.

mod commands;

pub use commands::RegionCommand;

use std::collections::HashSet;

use crate::targets::{RegionId, RegionStore, TagMap};

/// Sink for the side effects a region command may request
pub trait CommandOps {
    fn reset(&mut self);
    fn play_sound(&mut self, path: &str);
    fn animate(&mut self, target: Option<&str>);
}

/// The resolved hit reported to the active protocol
#[derive(Debug, Clone)]
pub struct HitRegion {
    pub region: RegionId,
    /// Internal name of the target the region belongs to
    pub target: String,
    pub tags: TagMap,
}

/// Resolves shot coordinates against a region store
#[derive(Debug, Default)]
pub struct HitResolver;

impl HitResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a shot at `(x, y)`, executing region commands via `ops`.
    /// Returns the topmost hit region, or `None` for a miss.
    pub fn resolve(
        &self,
        store: &RegionStore,
        x: f64,
        y: f64,
        ops: &mut dyn CommandOps,
    ) -> Option<HitRegion> {
        let overlapping = store.find_overlapping(x, y);
        let mut executed: HashSet<RegionId> = HashSet::new();
        let mut hit = None;

        for &id in &overlapping {
            let Some(region) = store.get(id) else {
                continue;
            };
            if region.is_background() {
                continue;
            }

            let Some(target) = region.internal_name() else {
                continue;
            };

            // Shots pass through the transparent parts of image targets
            if region.is_transparent_at(x, y) {
                continue;
            }

            if !region.tags.commands().is_empty() {
                self.execute_commands(region.tags.commands(), ops);
                executed.insert(id);
            }

            if region.visible {
                hit = Some(HitRegion {
                    region: id,
                    target: target.to_string(),
                    tags: region.tags.clone(),
                });
                break;
            }
        }

        // Hidden trigger regions fire even when something above them was hit
        for &id in &overlapping {
            if executed.contains(&id) {
                continue;
            }
            let Some(region) = store.get(id) else {
                continue;
            };

            if !region.visible && !region.tags.commands().is_empty() {
                self.execute_commands(region.tags.commands(), ops);
            }
        }

        hit
    }

    /// Execute a region's command list in order
    pub fn execute_commands(&self, commands: &[String], ops: &mut dyn CommandOps) {
        for raw in commands {
            match RegionCommand::parse(raw) {
                Some(RegionCommand::Reset) => ops.reset(),
                Some(RegionCommand::PlaySound(path)) => ops.play_sound(&path),
                Some(RegionCommand::Animate(target)) => ops.animate(target.as_deref()),
                None => {}
            }
        }
    }
}
