//! Region store
//!
//! Owns every region drawn on one canvas, in paint order. The store answers
//! the hit-resolution queries (topmost-first overlap scans) and carries the
//! target bookkeeping: each loaded target file becomes a [`Target`] whose
//! regions share a session-unique internal name.

use std::collections::HashMap;

use super::file::{RegionRecord, region_from_record};
use super::region::{Region, RegionId, RegionKind};
use super::tags::{BACKGROUND_KEY, TagMap};

/// A named collection of regions loaded together from one target definition
#[derive(Debug, Clone)]
pub struct Target {
    /// The definition this target was loaded from (file stem)
    pub definition: String,
    /// Session-unique name (`target<N>`) shared by all member regions
    pub internal_name: String,
    /// Member regions in paint order
    pub regions: Vec<RegionId>,
}

/// Read-only copy of a target's name and region tags, safe to hand to
/// protocol threads
#[derive(Debug, Clone)]
pub struct TargetSnapshot {
    pub name: String,
    pub regions: Vec<TagMap>,
}

/// All regions on one canvas, in paint order (last = topmost)
#[derive(Debug, Default)]
pub struct RegionStore {
    regions: HashMap<RegionId, Region>,
    order: Vec<RegionId>,
    targets: Vec<Target>,
    selected: Option<RegionId>,
    next_id: u64,
    next_target: u64,
}

impl RegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> RegionId {
        let id = RegionId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a free-standing region on top of the paint order
    pub fn add_region(
        &mut self,
        kind: RegionKind,
        points: Vec<(f64, f64)>,
        fill: impl Into<String>,
        tags: TagMap,
    ) -> RegionId {
        let id = self.allocate_id();
        let region = Region::new(id, kind, points, fill.into(), tags);
        self.regions.insert(id, region);
        self.order.push(id);
        id
    }

    /// Add the canvas background; it is never selectable and never a target
    pub fn add_background(&mut self, points: Vec<(f64, f64)>, fill: impl Into<String>) -> RegionId {
        let mut tags = TagMap::new();
        tags.insert(BACKGROUND_KEY, "true");
        self.add_region(RegionKind::Rectangle, points, fill, tags)
    }

    /// Load a target definition, re-tagging every region with a fresh
    /// session-unique internal name. Returns that name.
    pub fn add_target(&mut self, definition: &str, records: &[RegionRecord]) -> String {
        let internal_name = format!("target{}", self.next_target);
        self.next_target += 1;

        let mut members = Vec::with_capacity(records.len());
        for record in records {
            let id = self.allocate_id();
            let region = region_from_record(record, id, &internal_name);
            self.regions.insert(id, region);
            self.order.push(id);
            members.push(id);
        }

        log::debug!(
            "Loaded target '{}' as {} ({} regions)",
            definition,
            internal_name,
            members.len()
        );

        self.targets.push(Target {
            definition: definition.to_string(),
            internal_name: internal_name.clone(),
            regions: members,
        });

        internal_name
    }

    /// Delete a target and all of its regions
    pub fn delete_target(&mut self, internal_name: &str) -> bool {
        let Some(pos) = self
            .targets
            .iter()
            .position(|t| t.internal_name == internal_name)
        else {
            return false;
        };

        let target = self.targets.remove(pos);
        for id in &target.regions {
            self.regions.remove(id);
            self.order.retain(|o| o != id);
            if self.selected == Some(*id) {
                self.selected = None;
            }
        }

        true
    }

    pub fn get(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(&id)
    }

    pub fn get_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.regions.get_mut(&id)
    }

    /// Number of regions including any background
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn target(&self, internal_name: &str) -> Option<&Target> {
        self.targets
            .iter()
            .find(|t| t.internal_name == internal_name)
    }

    /// Regions containing the point, topmost first (reverse paint order)
    pub fn find_overlapping(&self, x: f64, y: f64) -> Vec<RegionId> {
        self.order
            .iter()
            .rev()
            .filter(|id| {
                self.regions
                    .get(*id)
                    .map(|r| r.contains(x, y))
                    .unwrap_or(false)
            })
            .copied()
            .collect()
    }

    /// Whether the region is the canvas background
    pub fn is_background(&self, id: RegionId) -> bool {
        self.regions
            .get(&id)
            .map(|r| r.is_background())
            .unwrap_or(false)
    }

    /// Move a region one step toward the top of the paint order.
    /// Only the two affected entries swap.
    pub fn bring_forward(&mut self, id: RegionId) {
        if let Some(pos) = self.order.iter().position(|o| *o == id) {
            if pos + 1 < self.order.len() {
                self.order.swap(pos, pos + 1);
            }
        }
    }

    /// Move a region one step toward the bottom of the paint order
    pub fn send_backward(&mut self, id: RegionId) {
        if let Some(pos) = self.order.iter().position(|o| *o == id) {
            if pos > 0 {
                self.order.swap(pos, pos - 1);
            }
        }
    }

    /// Update the selection. Purely cosmetic: z-order and tags are untouched.
    /// Backgrounds are never selectable.
    pub fn select(&mut self, id: Option<RegionId>) {
        match id {
            Some(id) if self.is_background(id) => {}
            Some(id) if self.regions.contains_key(&id) => self.selected = Some(id),
            Some(_) => {}
            None => self.selected = None,
        }
    }

    pub fn selected(&self) -> Option<RegionId> {
        self.selected
    }

    /// Read-only snapshots of every loaded target, for protocol threads
    pub fn aggregate_targets(&self) -> Vec<TargetSnapshot> {
        self.targets
            .iter()
            .map(|target| TargetSnapshot {
                name: target.internal_name.clone(),
                regions: target
                    .regions
                    .iter()
                    .filter_map(|id| self.regions.get(id))
                    .map(|r| r.tags.clone())
                    .collect(),
            })
            .collect()
    }

    /// Centroid of a target's regions: the average of all bounding-box
    /// centers, or of all outline vertices
    pub fn target_centroid(&self, internal_name: &str, vertices: bool) -> Option<(f64, f64)> {
        let target = self.target(internal_name)?;
        let mut sum = (0.0, 0.0);
        let mut count = 0usize;

        for id in &target.regions {
            let Some(region) = self.regions.get(id) else {
                continue;
            };

            if vertices {
                for &(x, y) in &region.points {
                    sum.0 += x;
                    sum.1 += y;
                    count += 1;
                }
            } else {
                let (min_x, min_y, max_x, max_y) = region.bounds();
                sum.0 += (min_x + max_x) / 2.0;
                sum.1 += (min_y + max_y) / 2.0;
                count += 1;
            }
        }

        if count == 0 {
            return None;
        }
        Some((sum.0 / count as f64, sum.1 / count as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(store: &mut RegionStore, name: &str) -> RegionId {
        let mut tags = TagMap::new();
        tags.insert("name", name);
        store.add_region(
            RegionKind::Rectangle,
            vec![(0.0, 0.0), (100.0, 100.0)],
            "black",
            tags,
        )
    }

    fn record(tags: &[&str]) -> RegionRecord {
        RegionRecord {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            coords: vec![0.0, 0.0, 50.0, 50.0],
            fill: "black".to_string(),
        }
    }

    #[test]
    fn test_find_overlapping_topmost_first() {
        let mut store = RegionStore::new();
        let a = rect(&mut store, "a");
        let b = rect(&mut store, "b");
        let c = rect(&mut store, "c");

        assert_eq!(store.find_overlapping(50.0, 50.0), vec![c, b, a]);
        assert!(store.find_overlapping(200.0, 200.0).is_empty());
    }

    #[test]
    fn test_bring_forward_swaps_adjacent_pair() {
        let mut store = RegionStore::new();
        let a = rect(&mut store, "a");
        let b = rect(&mut store, "b");
        let c = rect(&mut store, "c");

        store.bring_forward(a);
        assert_eq!(store.find_overlapping(50.0, 50.0), vec![c, a, b]);

        // Topmost region cannot go further up
        store.bring_forward(c);
        assert_eq!(store.find_overlapping(50.0, 50.0), vec![c, a, b]);
    }

    #[test]
    fn test_send_backward() {
        let mut store = RegionStore::new();
        let a = rect(&mut store, "a");
        let b = rect(&mut store, "b");

        store.send_backward(b);
        assert_eq!(store.find_overlapping(50.0, 50.0), vec![a, b]);

        store.send_backward(b);
        assert_eq!(store.find_overlapping(50.0, 50.0), vec![a, b]);
    }

    #[test]
    fn test_selection_is_cosmetic() {
        let mut store = RegionStore::new();
        let a = rect(&mut store, "a");
        let b = rect(&mut store, "b");

        store.select(Some(a));
        assert_eq!(store.selected(), Some(a));
        assert_eq!(store.find_overlapping(50.0, 50.0), vec![b, a]);

        store.select(None);
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn test_background_not_selectable() {
        let mut store = RegionStore::new();
        let bg = store.add_background(vec![(0.0, 0.0), (640.0, 480.0)], "gray15");

        store.select(Some(bg));
        assert_eq!(store.selected(), None);
        assert!(store.is_background(bg));
    }

    #[test]
    fn test_add_target_assigns_unique_internal_names() {
        let mut store = RegionStore::new();
        let records = vec![record(&["_shape:rectangle", "_internal_name:target", "points:5"])];

        let first = store.add_target("bullseye", &records);
        let second = store.add_target("bullseye", &records);

        assert_eq!(first, "target0");
        assert_eq!(second, "target1");

        let snapshots = store.aggregate_targets();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].regions[0].internal_name(), Some("target0"));
        assert_eq!(snapshots[1].regions[0].internal_name(), Some("target1"));
    }

    #[test]
    fn test_delete_target_removes_member_regions() {
        let mut store = RegionStore::new();
        let records = vec![
            record(&["_shape:rectangle"]),
            record(&["_shape:oval"]),
        ];

        let name = store.add_target("double", &records);
        assert_eq!(store.len(), 2);

        assert!(store.delete_target(&name));
        assert!(store.is_empty());
        assert!(store.find_overlapping(25.0, 25.0).is_empty());

        assert!(!store.delete_target("target99"));
    }

    #[test]
    fn test_target_centroid() {
        let mut store = RegionStore::new();
        let name = store.add_target("single", &[record(&["_shape:rectangle"])]);

        // Record spans (0,0)-(50,50)
        assert_eq!(store.target_centroid(&name, false), Some((25.0, 25.0)));
        assert_eq!(store.target_centroid(&name, true), Some((25.0, 25.0)));
        assert_eq!(store.target_centroid("target99", false), None);
    }
}
