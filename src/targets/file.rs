//! Target definition files
//!
//! A target file is a serialized ordered list of region records. The record
//! schema (flat tag list, flat coordinate list, fill colour) is what the
//! target editor has always written; keep it stable so old files load.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::region::{Region, RegionId, kind_from_tags};
use super::tags::TagMap;
use crate::Result;

/// One persisted region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionRecord {
    /// Flat `key:value` tag list
    pub tags: Vec<String>,
    /// Flat coordinate list, `[x0, y0, x1, y1, ...]`
    pub coords: Vec<f64>,
    /// Fill colour name
    pub fill: String,
}

impl RegionRecord {
    /// Snapshot a live region back into its persisted form
    pub fn from_region(region: &Region) -> Self {
        Self {
            tags: region.tags.flatten(),
            coords: region
                .points
                .iter()
                .flat_map(|&(x, y)| [x, y])
                .collect(),
            fill: region.fill.clone(),
        }
    }
}

/// Load an ordered list of region records from a target file
pub fn load_target_file(path: &Path) -> Result<Vec<RegionRecord>> {
    let file = File::open(path)?;
    let records = serde_json::from_reader(BufReader::new(file))?;
    Ok(records)
}

/// Save an ordered list of region records to a target file
pub fn save_target_file(path: &Path, records: &[RegionRecord]) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), records)?;
    Ok(())
}

/// Materialize a record into a region.
///
/// Any internal target name persisted in the file is stripped and replaced
/// with `internal_name` so multiple loaded copies of the same definition
/// cannot collide.
pub(crate) fn region_from_record(
    record: &RegionRecord,
    id: RegionId,
    internal_name: &str,
) -> Region {
    let mut tags = TagMap::parse_tags(&record.tags);
    tags.strip_internal_name();
    tags.set_internal_name(internal_name);

    let kind = kind_from_tags(&tags);
    let points = record
        .coords
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect();

    Region::new(id, kind, points, record.fill.clone(), tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::region::RegionKind;

    #[test]
    fn test_record_materialization_retags_internal_name() {
        let record = RegionRecord {
            tags: vec![
                "_shape:rectangle".to_string(),
                "_internal_name:target".to_string(),
                "points:5".to_string(),
            ],
            coords: vec![0.0, 0.0, 10.0, 10.0],
            fill: "black".to_string(),
        };

        let region = region_from_record(&record, RegionId(1), "target7");
        assert_eq!(region.kind, RegionKind::Rectangle);
        assert_eq!(region.internal_name(), Some("target7"));
        assert_eq!(region.tags.get("points"), Some("5"));
        assert_eq!(region.points, vec![(0.0, 0.0), (10.0, 10.0)]);
    }

    #[test]
    fn test_record_round_trip() {
        let record = RegionRecord {
            tags: vec!["_shape:oval".to_string(), "points:10".to_string()],
            coords: vec![5.0, 5.0, 25.0, 15.0],
            fill: "red".to_string(),
        };

        let region = region_from_record(&record, RegionId(0), "target0");
        let back = RegionRecord::from_region(&region);

        assert_eq!(back.coords, record.coords);
        assert_eq!(back.fill, record.fill);
        assert!(back.tags.contains(&"points:10".to_string()));
        assert!(back.tags.contains(&"_internal_name:target0".to_string()));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = std::env::temp_dir().join("dryfire-target-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("round_trip.target");

        let records = vec![RegionRecord {
            tags: vec!["_shape:rectangle".to_string()],
            coords: vec![0.0, 0.0, 1.0, 1.0],
            fill: "black".to_string(),
        }];

        save_target_file(&path, &records).unwrap();
        let loaded = load_target_file(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].coords, records[0].coords);

        std::fs::remove_file(&path).ok();
    }
}
