//! Shot events and the session shot log

use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Colour of a detected laser spot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaserColor {
    Red,
    Green,
}

impl FromStr for LaserColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "red" => Ok(LaserColor::Red),
            "green" => Ok(LaserColor::Green),
            _ => Err(format!("unknown laser color: {}", s)),
        }
    }
}

impl std::fmt::Display for LaserColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaserColor::Red => write!(f, "red"),
            LaserColor::Green => write!(f, "green"),
        }
    }
}

/// One immutable detection event
#[derive(Debug, Clone, PartialEq)]
pub struct Shot {
    /// Pixel position in the originating canvas's coordinate space
    pub pos: (f64, f64),
    pub color: LaserColor,
    /// Seconds since the first shot of the session (0.0 for the first)
    pub timestamp_secs: f64,
    /// Rendering-only marker radius
    pub marker_radius: u32,
}

/// Append-only session shot log.
///
/// The timer starts at the first recorded shot; `clear` discards the log and
/// the timer together.
#[derive(Debug, Default)]
pub struct ShotLog {
    shots: Vec<Shot>,
    timer_start: Option<Instant>,
}

impl ShotLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new shot, stamping it relative to the session's first shot
    pub fn record(&mut self, pos: (f64, f64), color: LaserColor, marker_radius: u32) -> Shot {
        let timestamp_secs = match self.timer_start {
            None => {
                self.timer_start = Some(Instant::now());
                0.0
            }
            Some(start) => start.elapsed().as_secs_f64(),
        };

        let shot = Shot {
            pos,
            color,
            timestamp_secs,
            marker_radius,
        };
        self.shots.push(shot.clone());
        shot
    }

    pub fn shots(&self) -> &[Shot] {
        &self.shots
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    /// Discard the log and the session timer
    pub fn clear(&mut self) {
        self.shots.clear();
        self.timer_start = None;
    }
}

/// Handle for one row in the host's shot list widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotItemId(pub usize);

/// Host-side shot list (the scoring table next to the feed).
///
/// Protocols may add extra columns; the host reverts to the default
/// `("Time", "Laser")` set when a protocol is destroyed.
pub trait ShotListSink: Send + Sync {
    /// Append a row for a new shot, returning its handle
    fn add_shot(&self, shot: &Shot) -> ShotItemId;

    /// Append extra column values to an existing row
    fn append_values(&self, item: ShotItemId, values: &[String]);

    /// Add protocol-specific columns after the defaults
    fn add_columns(&self, names: &[&str], widths: &[u32]);

    /// Drop all protocol-specific columns and their cell data
    fn revert_columns(&self);

    /// Remove every row
    fn clear(&self);
}

/// Shot list that ignores everything; the default when no GUI is attached
#[derive(Debug, Default)]
pub struct NullShotList;

impl ShotListSink for NullShotList {
    fn add_shot(&self, _shot: &Shot) -> ShotItemId {
        ShotItemId(0)
    }
    fn append_values(&self, _item: ShotItemId, _values: &[String]) {}
    fn add_columns(&self, _names: &[&str], _widths: &[u32]) {}
    fn revert_columns(&self) {}
    fn clear(&self) {}
}

/// In-memory shot list, used by tests and headless sessions
#[derive(Debug, Default)]
pub struct RecordingShotList {
    inner: parking_lot::Mutex<RecordingShotListInner>,
}

#[derive(Debug, Default)]
struct RecordingShotListInner {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RecordingShotList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.inner.lock().rows.clone()
    }

    pub fn columns(&self) -> Vec<String> {
        self.inner.lock().columns.clone()
    }
}

impl ShotListSink for RecordingShotList {
    fn add_shot(&self, shot: &Shot) -> ShotItemId {
        let mut inner = self.inner.lock();
        inner.rows.push(vec![
            format!("{:.2}", shot.timestamp_secs),
            shot.color.to_string(),
        ]);
        ShotItemId(inner.rows.len() - 1)
    }

    fn append_values(&self, item: ShotItemId, values: &[String]) {
        let mut inner = self.inner.lock();
        if let Some(row) = inner.rows.get_mut(item.0) {
            row.extend_from_slice(values);
        }
    }

    fn add_columns(&self, names: &[&str], _widths: &[u32]) {
        let mut inner = self.inner.lock();
        for name in names {
            inner.columns.push(name.to_string());
        }
    }

    fn revert_columns(&self) {
        let mut inner = self.inner.lock();
        inner.columns.clear();
        for row in &mut inner.rows {
            row.truncate(2);
        }
    }

    fn clear(&self) {
        self.inner.lock().rows.clear();
    }
}
