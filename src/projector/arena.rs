//! Projector arena surface
//!
//! The arena owns its own region store in its own coordinate space. Shots
//! remapped by the [`ArenaMapper`](super::ArenaMapper) resolve here instead
//! of on the feed.

use crate::hits::{CommandOps, HitRegion, HitResolver};
use crate::targets::{RegionRecord, RegionStore, TargetSnapshot};

/// The projector-driven display surface
pub struct Arena {
    store: RegionStore,
    width: u32,
    height: u32,
    visible: bool,
    resolver: HitResolver,
}

impl Arena {
    pub fn new(width: u32, height: u32) -> Self {
        let mut store = RegionStore::new();
        store.add_background(
            vec![(0.0, 0.0), (width as f64, height as f64)],
            "gray15",
        );

        Self {
            store,
            width,
            height,
            visible: false,
            resolver: HitResolver::new(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn store(&self) -> &RegionStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RegionStore {
        &mut self.store
    }

    /// Load a target definition onto the arena as authored
    pub fn add_target(&mut self, definition: &str, records: &[RegionRecord]) -> String {
        self.store.add_target(definition, records)
    }

    /// Load a target definition with its geometry translated to `(x, y)`
    pub fn add_target_at(
        &mut self,
        definition: &str,
        records: &[RegionRecord],
        x: f64,
        y: f64,
    ) -> String {
        let shifted: Vec<RegionRecord> = records
            .iter()
            .map(|record| {
                let mut record = record.clone();
                for (i, coord) in record.coords.iter_mut().enumerate() {
                    *coord += if i % 2 == 0 { x } else { y };
                }
                record
            })
            .collect();

        self.store.add_target(definition, &shifted)
    }

    pub fn delete_target(&mut self, internal_name: &str) -> bool {
        self.store.delete_target(internal_name)
    }

    pub fn aggregate_targets(&self) -> Vec<TargetSnapshot> {
        self.store.aggregate_targets()
    }

    /// Resolve a shot already remapped into arena coordinates
    pub fn handle_shot(&self, x: f64, y: f64, ops: &mut dyn CommandOps) -> Option<HitRegion> {
        self.resolver.resolve(&self.store, x, y, ops)
    }

    /// Restore all image targets to the first frame of their animations
    pub fn reset(&mut self) {
        log::debug!("Arena animations reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopOps;

    impl CommandOps for NoopOps {
        fn reset(&mut self) {}
        fn play_sound(&mut self, _path: &str) {}
        fn animate(&mut self, _target: Option<&str>) {}
    }

    fn record() -> RegionRecord {
        RegionRecord {
            tags: vec!["_shape:rectangle".to_string(), "points:5".to_string()],
            coords: vec![0.0, 0.0, 50.0, 50.0],
            fill: "black".to_string(),
        }
    }

    #[test]
    fn test_translated_target_hits_at_offset() {
        let mut arena = Arena::new(600, 480);
        let name = arena.add_target_at("hostile", &[record()], 200.0, 100.0);

        let mut ops = NoopOps;
        let hit = arena.handle_shot(225.0, 125.0, &mut ops).unwrap();
        assert_eq!(hit.target, name);

        // Original, untranslated position does not hit
        assert!(arena.handle_shot(25.0, 25.0, &mut ops).is_none());
    }

    #[test]
    fn test_delete_target_clears_regions() {
        let mut arena = Arena::new(600, 480);
        let name = arena.add_target("hostile", &[record()]);

        assert!(arena.delete_target(&name));
        let mut ops = NoopOps;
        assert!(arena.handle_shot(25.0, 25.0, &mut ops).is_none());
    }

    #[test]
    fn test_background_never_resolves() {
        let arena = Arena::new(600, 480);
        let mut ops = NoopOps;
        assert!(arena.handle_shot(300.0, 240.0, &mut ops).is_none());
    }
}
