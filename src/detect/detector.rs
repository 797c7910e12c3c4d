//! Laser spot detection
//!
//! Per frame: grayscale + binary threshold, then a 3x3 tile partition with a
//! min/max search per tile. A tile whose thresholded min equals its max has
//! no spot; otherwise the max location is a candidate, classified by the
//! colour-channel ratios of a small circular patch on the original frame.
//!
//! Interference (glare or a bright light source) is checked until it is
//! seen once: if too little of the thresholded frame is dark the session is
//! flagged, and the user may opt into a short thresholded-view overlay.

use std::sync::Arc;

use image::{GrayImage, RgbImage};

use crate::config::AppConfig;
use crate::core::LaserColor;

/// Milliseconds of interference visualization after the user opts in
const INTERFERENCE_VIEW_MS: u32 = 2500;

/// One localized laser spot, before session handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotCandidate {
    /// Full-frame pixel position
    pub pos: (u32, u32),
    pub color: LaserColor,
}

/// Result of one detection pass
#[derive(Debug, Default)]
pub struct DetectionOutcome {
    pub candidates: Vec<ShotCandidate>,
    /// Dark-pixel fraction, set only on the tick interference was first seen
    pub interference: Option<f64>,
}

/// Asks the operator whether to render the interference overlay.
/// The GUI shows a yes/no dialog; headless hosts decline.
pub trait InterferencePrompt: Send + Sync {
    fn confirm_visualization(&self, percent_dark: f64) -> bool;
}

/// Prompt that always declines the overlay
#[derive(Debug, Default)]
pub struct NoPrompt;

impl InterferencePrompt for NoPrompt {
    fn confirm_visualization(&self, _percent_dark: f64) -> bool {
        false
    }
}

/// Sticky per-session interference tracking
#[derive(Debug, Default)]
struct InterferenceState {
    seen: bool,
    visualization_ticks: u32,
}

/// Locates and classifies laser spots on camera frames
pub struct ShotDetector {
    intensity_threshold: u8,
    color_dominance: f64,
    darkness_min: f64,
    ignore_color: Option<LaserColor>,
    sample_radius: i32,
    visualization_ticks_per_flag: u32,
    interference: InterferenceState,
    prompt: Arc<dyn InterferencePrompt>,
}

impl ShotDetector {
    pub fn new(config: &AppConfig, prompt: Arc<dyn InterferencePrompt>) -> Self {
        Self {
            intensity_threshold: config.laser_intensity,
            color_dominance: config.color_dominance,
            darkness_min: config.interference_darkness_min,
            ignore_color: config.ignore_laser_color,
            sample_radius: 10,
            visualization_ticks_per_flag: INTERFERENCE_VIEW_MS / config.detection_rate.max(1),
            interference: InterferenceState::default(),
            prompt,
        }
    }

    /// Run one detection pass over a frame
    pub fn detect(&mut self, frame: &RgbImage) -> DetectionOutcome {
        let mut outcome = DetectionOutcome::default();
        let thresholded = self.threshold(frame);

        // Only check for glare until we have warned once this session
        if !self.interference.seen {
            outcome.interference = self.check_interference(&thresholded);
        }

        for pos in tile_maxima(&thresholded) {
            let Some(color) = self.classify_color(frame, pos) else {
                // No dominant channel: probably not a laser trainer
                continue;
            };

            if self.ignore_color == Some(color) {
                continue;
            }

            outcome.candidates.push(ShotCandidate { pos, color });
        }

        outcome
    }

    /// Whether interference has been seen this session
    pub fn interference_seen(&self) -> bool {
        self.interference.seen
    }

    /// Consume one interference-visualization tick, if any remain.
    /// The render loop shows the thresholded frame while this returns true.
    pub fn take_visualization_tick(&mut self) -> bool {
        if self.interference.visualization_ticks > 0 {
            self.interference.visualization_ticks -= 1;
            true
        } else {
            false
        }
    }

    /// Grayscale + binary threshold (255 where intensity >= cutoff)
    fn threshold(&self, frame: &RgbImage) -> GrayImage {
        let gray = image::imageops::grayscale(frame);
        let cutoff = self.intensity_threshold;

        GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            if gray.get_pixel(x, y).0[0] >= cutoff {
                image::Luma([255u8])
            } else {
                image::Luma([0u8])
            }
        })
    }

    fn check_interference(&mut self, thresholded: &GrayImage) -> Option<f64> {
        let total = (thresholded.width() * thresholded.height()) as f64;
        if total == 0.0 {
            return None;
        }

        let dark = thresholded.pixels().filter(|p| p.0[0] == 0).count() as f64;
        let percent_dark = dark / total;

        if percent_dark >= self.darkness_min {
            return None;
        }

        self.interference.seen = true;
        log::warn!(
            "Glare or light source detected. {:.4} of the image is dark.",
            percent_dark
        );

        if self.prompt.confirm_visualization(percent_dark) {
            self.interference.visualization_ticks = self.visualization_ticks_per_flag;
        }

        Some(percent_dark)
    }

    /// Average colour of a circular patch on the original frame, compared by
    /// channel ratio. A channel must dominate both others by the configured
    /// margin or the spot is rejected.
    fn classify_color(&self, frame: &RgbImage, pos: (u32, u32)) -> Option<LaserColor> {
        let (r, g, b) = mean_circle(frame, pos, self.sample_radius)?;
        let dominance = 1.0 + self.color_dominance;

        if g > 0.0 && b > 0.0 && r / g > dominance && r / b > dominance {
            return Some(LaserColor::Red);
        }

        if r > 0.0 && b > 0.0 && g / r > dominance && g / b > dominance {
            return Some(LaserColor::Green);
        }

        None
    }
}

/// Partition the frame into a 3x3 grid (last row/column absorbs the
/// remainder) and return the max location of every tile whose min and max
/// differ.
fn tile_maxima(thresholded: &GrayImage) -> Vec<(u32, u32)> {
    let width = thresholded.width();
    let height = thresholded.height();
    let mut maxima = Vec::new();

    if width == 0 || height == 0 {
        return maxima;
    }

    let sub_w = width / 3;
    let sub_h = height / 3;

    for tile_y in 0..3u32 {
        for tile_x in 0..3u32 {
            let x0 = tile_x * sub_w;
            let y0 = tile_y * sub_h;
            let x1 = if tile_x == 2 { width } else { x0 + sub_w };
            let y1 = if tile_y == 2 { height } else { y0 + sub_h };

            let mut min = u8::MAX;
            let mut max = u8::MIN;
            let mut max_loc = (x0, y0);

            for y in y0..y1 {
                for x in x0..x1 {
                    let value = thresholded.get_pixel(x, y).0[0];
                    if value < min {
                        min = value;
                    }
                    if value > max {
                        max = value;
                        max_loc = (x, y);
                    }
                }
            }

            // Uniform tile: nothing detected
            if min != max {
                maxima.push(max_loc);
            }
        }
    }

    maxima
}

/// Mean RGB over the circular patch of `radius` around `pos`, clipped to
/// the frame
fn mean_circle(frame: &RgbImage, pos: (u32, u32), radius: i32) -> Option<(f64, f64, f64)> {
    let (cx, cy) = (pos.0 as i32, pos.1 as i32);
    let (width, height) = (frame.width() as i32, frame.height() as i32);

    let mut sum = (0.0, 0.0, 0.0);
    let mut count = 0u32;

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let x = cx + dx;
            let y = cy + dy;
            if x < 0 || y < 0 || x >= width || y >= height {
                continue;
            }

            let pixel = frame.get_pixel(x as u32, y as u32).0;
            sum.0 += pixel[0] as f64;
            sum.1 += pixel[1] as f64;
            sum.2 += pixel[2] as f64;
            count += 1;
        }
    }

    if count == 0 {
        return None;
    }

    let n = count as f64;
    Some((sum.0 / n, sum.1 / n, sum.2 / n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use parking_lot::Mutex;

    fn detector() -> ShotDetector {
        ShotDetector::new(&AppConfig::default(), Arc::new(NoPrompt))
    }

    /// Frame filled with a dim colour plus a bright patch
    fn frame_with_patch(
        dims: (u32, u32),
        background: [u8; 3],
        patch: [u8; 3],
        center: (u32, u32),
        half: u32,
    ) -> RgbImage {
        RgbImage::from_fn(dims.0, dims.1, |x, y| {
            let inside = x + half >= center.0
                && x <= center.0 + half
                && y + half >= center.1
                && y <= center.1 + half;
            if inside { Rgb(patch) } else { Rgb(background) }
        })
    }

    /// Paint a realistic laser spot: a saturated core pixel bright enough to
    /// pass the intensity threshold, surrounded by a 5x5 coloured fringe that
    /// tilts the channel means
    fn paint_laser_spot(frame: &mut RgbImage, center: (u32, u32), color: LaserColor) {
        let (fringe, core) = match color {
            LaserColor::Red => (Rgb([200, 80, 80]), Rgb([255, 235, 235])),
            LaserColor::Green => (Rgb([80, 200, 80]), Rgb([235, 255, 235])),
        };

        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                let x = (center.0 as i32 + dx) as u32;
                let y = (center.1 as i32 + dy) as u32;
                frame.put_pixel(x, y, fringe);
            }
        }
        frame.put_pixel(center.0, center.1, core);
    }

    #[test]
    fn test_tile_partition_covers_whole_frame() {
        // 641x481 leaves remainders; the last tiles must absorb them, so a
        // spot in the frame's bottom-right corner is still found
        let mut frame = GrayImage::new(641, 481);
        assert!(tile_maxima(&frame).is_empty());

        frame.put_pixel(640, 480, image::Luma([255u8]));
        assert_eq!(tile_maxima(&frame), vec![(640, 480)]);
    }

    #[test]
    fn test_uniform_tiles_produce_no_candidates() {
        let mut detector = detector();

        let dark = RgbImage::new(90, 90);
        assert!(detector.detect(&dark).candidates.is_empty());

        let bright = RgbImage::from_pixel(90, 90, Rgb([255, 255, 255]));
        // All-bright frame: every tile is uniform, no candidates (it flags
        // interference instead)
        let outcome = detector.detect(&bright);
        assert!(outcome.candidates.is_empty());
    }

    #[test]
    fn test_laser_spot_located_at_its_core() {
        let mut detector = detector();
        let mut frame = RgbImage::from_pixel(640, 480, Rgb([10, 10, 10]));
        paint_laser_spot(&mut frame, (100, 100), LaserColor::Red);

        let outcome = detector.detect(&frame);
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.candidates[0].pos, (100, 100));
        assert_eq!(outcome.candidates[0].color, LaserColor::Red);
    }

    #[test]
    fn test_spots_detected_in_each_tile_independently() {
        let mut detector = detector();
        // Spots in two different tiles of a 640x480 frame
        let mut frame = RgbImage::from_pixel(640, 480, Rgb([10, 10, 10]));
        paint_laser_spot(&mut frame, (50, 50), LaserColor::Red);
        paint_laser_spot(&mut frame, (400, 300), LaserColor::Green);

        let outcome = detector.detect(&frame);
        let positions: Vec<_> = outcome.candidates.iter().map(|c| c.pos).collect();
        assert!(positions.contains(&(50, 50)));
        assert!(positions.contains(&(400, 300)));
    }

    #[test]
    fn test_color_classification_is_symmetric() {
        let detector = detector();

        let red = frame_with_patch((100, 100), [10, 10, 10], [250, 200, 200], (50, 50), 2);
        let green = frame_with_patch((100, 100), [10, 10, 10], [200, 250, 200], (50, 50), 2);

        assert_eq!(
            detector.classify_color(&red, (50, 50)),
            Some(LaserColor::Red)
        );
        assert_eq!(
            detector.classify_color(&green, (50, 50)),
            Some(LaserColor::Green)
        );
    }

    #[test]
    fn test_no_dominant_channel_rejected() {
        let mut detector = detector();
        // Bright white spot: passes the threshold but no channel dominates
        let mut frame = RgbImage::from_pixel(640, 480, Rgb([10, 10, 10]));
        frame.put_pixel(100, 100, Rgb([255, 255, 255]));

        assert!(detector.detect(&frame).candidates.is_empty());
    }

    #[test]
    fn test_ignored_color_dropped() {
        let config = AppConfig {
            ignore_laser_color: Some(LaserColor::Red),
            ..AppConfig::default()
        };
        let mut detector = ShotDetector::new(&config, Arc::new(NoPrompt));

        let mut frame = RgbImage::from_pixel(640, 480, Rgb([10, 10, 10]));
        paint_laser_spot(&mut frame, (100, 100), LaserColor::Red);

        assert!(detector.detect(&frame).candidates.is_empty());
    }

    struct RecordingPrompt {
        asked: Mutex<Vec<f64>>,
        answer: bool,
    }

    impl InterferencePrompt for RecordingPrompt {
        fn confirm_visualization(&self, percent_dark: f64) -> bool {
            self.asked.lock().push(percent_dark);
            self.answer
        }
    }

    #[test]
    fn test_interference_flagged_once_and_sticky() {
        let prompt = Arc::new(RecordingPrompt {
            asked: Mutex::new(Vec::new()),
            answer: true,
        });
        let mut detector = ShotDetector::new(&AppConfig::default(), prompt.clone());

        // Half the frame is above the threshold: far less than 99% dark
        let glare = RgbImage::from_fn(90, 90, |x, _| {
            if x < 45 { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) }
        });

        let first = detector.detect(&glare);
        assert!(first.interference.is_some());
        assert!(detector.interference_seen());
        assert_eq!(prompt.asked.lock().len(), 1);

        // Sticky: never flagged or prompted again this session
        let second = detector.detect(&glare);
        assert!(second.interference.is_none());
        assert_eq!(prompt.asked.lock().len(), 1);
    }

    #[test]
    fn test_interference_visualization_tick_budget() {
        let prompt = Arc::new(RecordingPrompt {
            asked: Mutex::new(Vec::new()),
            answer: true,
        });
        // 100ms detection rate: 2500/100 = 25 ticks of overlay
        let mut detector = ShotDetector::new(&AppConfig::default(), prompt);

        let glare = RgbImage::from_pixel(90, 90, Rgb([255, 255, 255]));
        detector.detect(&glare);

        let mut ticks = 0;
        while detector.take_visualization_tick() {
            ticks += 1;
        }
        assert_eq!(ticks, 25);
    }

    #[test]
    fn test_dark_frame_is_not_interference() {
        let mut detector = detector();
        let dark = RgbImage::new(90, 90);

        assert!(detector.detect(&dark).interference.is_none());
        assert!(!detector.interference_seen());
    }
}
