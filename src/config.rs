//! Application configuration
//!
//! All tunables live in one immutable [`AppConfig`] built at startup from
//! the settings file plus CLI overrides, then passed by reference into each
//! component. Values are range-validated both when the file is loaded and
//! when an interactive edit is committed; a bad value blocks the commit, it
//! never corrupts running state.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::core::LaserColor;
use crate::{Result, TrainerError};

pub const DEFAULT_DETECTION_RATE: u32 = 100; // ms
pub const DEFAULT_LASER_INTENSITY: u8 = 230;
pub const DEFAULT_MARKER_RADIUS: u32 = 2; // px
pub const DEFAULT_VIRTUAL_MAGAZINE: u32 = 7;
pub const DEFAULT_MALFUNCTION_PROBABILITY: f64 = 10.0;
/// A channel must beat both others by this relative margin to classify
pub const DEFAULT_COLOR_DOMINANCE: f64 = 0.02;
/// Fraction of the thresholded frame that must be dark, or interference is
/// flagged
pub const DEFAULT_INTERFERENCE_DARKNESS_MIN: f64 = 0.99;

/// Immutable application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub debug: bool,
    /// Shot detection interval in milliseconds
    pub detection_rate: u32,
    /// Grayscale threshold for laser detection (1-255)
    pub laser_intensity: u8,
    /// Shot marker radius in pixels (1-20)
    pub marker_radius: u32,
    /// Shots of this colour are dropped entirely
    pub ignore_laser_color: Option<LaserColor>,
    pub use_virtual_magazine: bool,
    /// Rounds per virtual magazine (1-45)
    pub virtual_magazine: u32,
    pub use_malfunctions: bool,
    /// Probability of a simulated malfunction per shot, in percent (0.1-99.9)
    pub malfunction_probability: f64,
    /// Camera index (0-2)
    pub vidcam: u32,
    pub color_dominance: f64,
    pub interference_darkness_min: f64,
    /// Directory target definitions are loaded from
    pub targets_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: false,
            detection_rate: DEFAULT_DETECTION_RATE,
            laser_intensity: DEFAULT_LASER_INTENSITY,
            marker_radius: DEFAULT_MARKER_RADIUS,
            ignore_laser_color: None,
            use_virtual_magazine: false,
            virtual_magazine: DEFAULT_VIRTUAL_MAGAZINE,
            use_malfunctions: false,
            malfunction_probability: DEFAULT_MALFUNCTION_PROBABILITY,
            vidcam: 0,
            color_dominance: DEFAULT_COLOR_DOMINANCE,
            interference_darkness_min: DEFAULT_INTERFERENCE_DARKNESS_MIN,
            targets_dir: PathBuf::from("targets"),
        }
    }
}

impl AppConfig {
    /// Load the settings file if it exists, falling back to defaults.
    /// Every present key is range-validated.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let settings: SettingsFile = toml::from_str(&raw)?;
        Self::from_settings(settings)
    }

    /// Apply a parsed settings file on top of the defaults
    pub fn from_settings(settings: SettingsFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(rate) = settings.detection_rate {
            config.detection_rate = check_rate(rate)?;
        }
        if let Some(intensity) = settings.laser_intensity {
            config.laser_intensity = check_intensity(intensity)?;
        }
        if let Some(radius) = settings.marker_radius {
            config.marker_radius = check_radius(radius)?;
        }
        if let Some(color) = settings.ignore_laser_color.as_deref() {
            config.ignore_laser_color = check_ignore_color(color)?;
        }
        if let Some(use_magazine) = settings.use_virtual_magazine {
            config.use_virtual_magazine = use_magazine;
        }
        if let Some(magazine) = settings.virtual_magazine {
            config.virtual_magazine = check_virtual_magazine(magazine)?;
        }
        if let Some(use_malfunctions) = settings.use_malfunctions {
            config.use_malfunctions = use_malfunctions;
        }
        if let Some(probability) = settings.malfunction_probability {
            config.malfunction_probability = check_malfunctions(probability)?;
        }
        if let Some(vidcam) = settings.vidcam {
            config.vidcam = check_vidcam(vidcam)?;
        }

        Ok(config)
    }

    /// Overlay validated command line arguments
    pub fn with_args(mut self, args: &CliArgs) -> Result<Self> {
        self.debug = self.debug || args.debug;

        if let Some(rate) = args.detection_rate {
            self.detection_rate = check_rate(rate)?;
        }
        if let Some(intensity) = args.laser_intensity {
            self.laser_intensity = check_intensity(intensity)?;
        }
        if let Some(radius) = args.marker_radius {
            self.marker_radius = check_radius(radius)?;
        }
        if let Some(vidcam) = args.vidcam {
            self.vidcam = check_vidcam(vidcam)?;
        }
        if let Some(color) = args.ignore_laser_color.as_deref() {
            self.ignore_laser_color = check_ignore_color(color)?;
        }
        if let Some(rounds) = args.use_virtual_magazine {
            self.use_virtual_magazine = true;
            self.virtual_magazine = check_virtual_magazine(rounds)?;
        }
        if let Some(probability) = args.use_malfunctions {
            self.use_malfunctions = true;
            self.malfunction_probability = check_malfunctions(probability)?;
        }

        Ok(self)
    }

    /// Persist with the settings file key names
    pub fn save(&self, path: &Path) -> Result<()> {
        let settings = SettingsFile {
            detection_rate: Some(self.detection_rate),
            laser_intensity: Some(self.laser_intensity as u32),
            marker_radius: Some(self.marker_radius),
            ignore_laser_color: Some(match self.ignore_laser_color {
                None => "none".to_string(),
                Some(color) => color.to_string(),
            }),
            use_virtual_magazine: Some(self.use_virtual_magazine),
            virtual_magazine: Some(self.virtual_magazine),
            use_malfunctions: Some(self.use_malfunctions),
            malfunction_probability: Some(self.malfunction_probability),
            vidcam: Some(self.vidcam),
        };

        let raw = toml::to_string(&settings)
            .map_err(|e| TrainerError::InvalidSetting {
                key: "settings",
                reason: e.to_string(),
            })?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

/// On-disk settings, with the historical key names
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(rename = "detectionrate", skip_serializing_if = "Option::is_none")]
    pub detection_rate: Option<u32>,
    #[serde(rename = "laserintensity", skip_serializing_if = "Option::is_none")]
    pub laser_intensity: Option<u32>,
    #[serde(rename = "markerradius", skip_serializing_if = "Option::is_none")]
    pub marker_radius: Option<u32>,
    #[serde(rename = "ignorelasercolor", skip_serializing_if = "Option::is_none")]
    pub ignore_laser_color: Option<String>,
    #[serde(rename = "usevirtualmagazine", skip_serializing_if = "Option::is_none")]
    pub use_virtual_magazine: Option<bool>,
    #[serde(rename = "virtualmagazine", skip_serializing_if = "Option::is_none")]
    pub virtual_magazine: Option<u32>,
    #[serde(rename = "usemalfunctions", skip_serializing_if = "Option::is_none")]
    pub use_malfunctions: Option<bool>,
    #[serde(rename = "malfunctionprobability", skip_serializing_if = "Option::is_none")]
    pub malfunction_probability: Option<f64>,
    #[serde(rename = "vidcam", skip_serializing_if = "Option::is_none")]
    pub vidcam: Option<u32>,
}

/// Command line flags. Any flag given here overrides the settings file.
#[derive(Debug, Default, Parser)]
#[command(name = "dryfire", about = "Laser dry-fire training")]
pub struct CliArgs {
    /// Turn on debug log messages and click-to-shoot
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Rate at which shots are detected, in milliseconds. Set this to about
    /// how long your laser trainer stays on per shot, typically 100 ms
    #[arg(short = 'r', long)]
    pub detection_rate: Option<u32>,

    /// Intensity threshold for detecting the laser [1,255]. Set as high as
    /// possible while still detecting shots
    #[arg(short = 'i', long)]
    pub laser_intensity: Option<u32>,

    /// Radius of shot markers in pixels [1,20]
    #[arg(short = 'm', long)]
    pub marker_radius: Option<u32>,

    /// Video camera to use [0,2]
    #[arg(short = 'v', long)]
    pub vidcam: Option<u32>,

    /// Laser colour to ignore (green or red). No colour is ignored by default
    #[arg(short = 'c', long)]
    pub ignore_laser_color: Option<String>,

    /// Turn on the virtual magazine and set the number of rounds it holds
    #[arg(short = 'u', long)]
    pub use_virtual_magazine: Option<u32>,

    /// Turn on malfunctions and set the probability of one happening
    #[arg(short = 'f', long)]
    pub use_malfunctions: Option<f64>,
}

fn check_rate(rate: u32) -> Result<u32> {
    if rate < 1 {
        return Err(TrainerError::InvalidSetting {
            key: "detectionrate",
            reason: "must be a number greater than 0".to_string(),
        });
    }
    Ok(rate)
}

fn check_intensity(intensity: u32) -> Result<u8> {
    if !(1..=255).contains(&intensity) {
        return Err(TrainerError::InvalidSetting {
            key: "laserintensity",
            reason: "must be a number between 1 and 255".to_string(),
        });
    }
    Ok(intensity as u8)
}

fn check_radius(radius: u32) -> Result<u32> {
    if !(1..=20).contains(&radius) {
        return Err(TrainerError::InvalidSetting {
            key: "markerradius",
            reason: "must be a number between 1 and 20".to_string(),
        });
    }
    Ok(radius)
}

fn check_vidcam(vidcam: u32) -> Result<u32> {
    if vidcam > 2 {
        return Err(TrainerError::InvalidSetting {
            key: "vidcam",
            reason: "must be a number between 0 and 2".to_string(),
        });
    }
    Ok(vidcam)
}

fn check_ignore_color(color: &str) -> Result<Option<LaserColor>> {
    match color.to_lowercase().as_str() {
        "none" => Ok(None),
        "red" => Ok(Some(LaserColor::Red)),
        "green" => Ok(Some(LaserColor::Green)),
        _ => Err(TrainerError::InvalidSetting {
            key: "ignorelasercolor",
            reason: "must be either \"green\" or \"red\"".to_string(),
        }),
    }
}

fn check_virtual_magazine(rounds: u32) -> Result<u32> {
    if !(1..=45).contains(&rounds) {
        return Err(TrainerError::InvalidSetting {
            key: "virtualmagazine",
            reason: "must be a number between 1 and 45".to_string(),
        });
    }
    Ok(rounds)
}

fn check_malfunctions(probability: f64) -> Result<f64> {
    if !(0.1..=99.9).contains(&probability) {
        return Err(TrainerError::InvalidSetting {
            key: "malfunctionprobability",
            reason: "must be a number between .1 and 99.9".to_string(),
        });
    }
    Ok(probability)
}
