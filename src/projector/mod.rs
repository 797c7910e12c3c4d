//! Projector arena support
//!
//! The arena is a secondary calibrated display with its own coordinate
//! space. Camera-space shots landing inside the calibrated bounding box are
//! remapped into arena space and resolved against the arena's own region
//! store.

mod arena;
mod calibrator;

pub use arena::Arena;
pub use calibrator::ProjectorCalibrator;

/// Camera-space bounding box of the projected arena
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationBox {
    pub min: (f64, f64),
    pub max: (f64, f64),
}

impl CalibrationBox {
    pub fn new(min: (f64, f64), max: (f64, f64)) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max.0 - self.min.0
    }

    pub fn height(&self) -> f64 {
        self.max.1 - self.min.1
    }

    /// Strict containment; shots on the border are not arena shots
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x > self.min.0 && x < self.max.0 && y > self.min.1 && y < self.max.1
    }
}

/// The last locked calibration, if any
#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationState {
    locked: Option<CalibrationBox>,
}

impl CalibrationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&mut self, bbox: CalibrationBox) {
        log::info!(
            "Calibration locked: ({:.0},{:.0})-({:.0},{:.0})",
            bbox.min.0,
            bbox.min.1,
            bbox.max.0,
            bbox.max.1
        );
        self.locked = Some(bbox);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.is_some()
    }

    pub fn bbox(&self) -> Option<CalibrationBox> {
        self.locked
    }

    pub fn clear(&mut self) {
        self.locked = None;
    }
}

/// Maps camera-space shot coordinates into arena space
#[derive(Debug, Clone, Copy, Default)]
pub struct ArenaMapper {
    calibration: CalibrationState,
}

impl ArenaMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calibration(&self) -> &CalibrationState {
        &self.calibration
    }

    pub fn set_lock(&mut self, bbox: CalibrationBox) {
        self.calibration.lock(bbox);
    }

    pub fn is_locked(&self) -> bool {
        self.calibration.is_locked()
    }

    /// Remap a camera-space point into arena space.
    ///
    /// Returns `None` when calibration was never locked, the box is
    /// degenerate, or the point falls outside it; such shots stay on the
    /// feed.
    pub fn to_arena(&self, x: f64, y: f64, arena_dims: (u32, u32)) -> Option<(f64, f64)> {
        let bbox = self.calibration.bbox()?;
        if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            return None;
        }
        if !bbox.contains(x, y) {
            return None;
        }

        let x_scale = arena_dims.0 as f64 / bbox.width();
        let y_scale = arena_dims.1 as f64 / bbox.height();

        Some(((x - bbox.min.0) * x_scale, (y - bbox.min.1) * y_scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlocked_mapper_forwards_nothing() {
        let mapper = ArenaMapper::new();
        assert!(!mapper.is_locked());
        assert_eq!(mapper.to_arena(100.0, 100.0, (600, 480)), None);
    }

    #[test]
    fn test_points_outside_box_are_not_remapped() {
        let mut mapper = ArenaMapper::new();
        mapper.set_lock(CalibrationBox::new((100.0, 100.0), (300.0, 200.0)));

        assert_eq!(mapper.to_arena(50.0, 150.0, (600, 480)), None);
        assert_eq!(mapper.to_arena(100.0, 150.0, (600, 480)), None);
        assert_eq!(mapper.to_arena(350.0, 150.0, (600, 480)), None);
    }

    #[test]
    fn test_remap_translates_and_scales() {
        let mut mapper = ArenaMapper::new();
        mapper.set_lock(CalibrationBox::new((100.0, 100.0), (300.0, 200.0)));

        // Box is 200x100 camera pixels, arena is 600x480
        let (x, y) = mapper.to_arena(200.0, 150.0, (600, 480)).unwrap();
        assert!((x - 300.0).abs() < 1e-9);
        assert!((y - 240.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_box_rejected() {
        let mut mapper = ArenaMapper::new();
        mapper.set_lock(CalibrationBox::new((100.0, 100.0), (100.0, 100.0)));
        assert_eq!(mapper.to_arena(100.0, 100.0, (600, 480)), None);
    }
}
