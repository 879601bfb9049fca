use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{plog_debug, Error, Result};

/// How often and over how many samples progress is checked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StagnationCheck {
    /// Number of samples kept; displacement is measured against the oldest.
    pub window: usize,
    /// Check every `stride` ticks (1 = every tick).
    pub stride: u32,
    /// Squared displacement below which the agent counts as not moving.
    pub epsilon: f64,
}

impl StagnationCheck {
    /// Smallest usable window: the newest sample plus one to compare with.
    pub const MIN_WINDOW: usize = 2;

    pub fn every_tick(window: usize) -> Self {
        Self {
            window,
            stride: 1,
            epsilon: f64::EPSILON,
        }
    }

    pub fn every(window: usize, stride: u32) -> Self {
        Self {
            stride,
            ..Self::every_tick(window)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkTuning {
    /// Allowed drift of the stable coordinate.
    pub stable_slack: f64,
    /// Allowed altitude deviation from the walking plane.
    pub vertical_tolerance: f64,
    /// Distance at which the goal counts as reached.
    pub goal_tolerance: f64,
    pub stagnation: StagnationCheck,
    /// Assumed horizontal speeds for `jump_forward` (walk, sprint).
    pub jump_walk_speed: f64,
    pub jump_sprint_speed: f64,
    /// Allowed landing error for `jump_forward`.
    pub jump_landing_slack: f64,
}

impl Default for WalkTuning {
    fn default() -> Self {
        Self {
            stable_slack: 1.2,
            vertical_tolerance: 0.5,
            goal_tolerance: 0.5,
            stagnation: StagnationCheck::every_tick(5),
            jump_walk_speed: 0.216,
            jump_sprint_speed: 0.355,
            jump_landing_slack: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LadderTuning {
    pub lateral_slack: f64,
    pub goal_tolerance: f64,
    pub stagnation: StagnationCheck,
}

impl Default for LadderTuning {
    fn default() -> Self {
        Self {
            lateral_slack: 1.2,
            goal_tolerance: 0.5,
            stagnation: StagnationCheck::every(10, 10),
        }
    }
}

/// When to stop waiting after a boost and fire the next one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum AscentMode {
    /// Keep waiting while still climbing at least `min_vertical_speed`.
    Graceful { min_vertical_speed: f64 },
    /// Keep waiting while the boost lasts. With a `velocity_ceiling`, also
    /// hold off while still rising faster than it.
    Fast { velocity_ceiling: Option<f64> },
}

impl AscentMode {
    pub fn graceful() -> Self {
        AscentMode::Graceful {
            min_vertical_speed: 0.01,
        }
    }

    pub fn fast() -> Self {
        AscentMode::Fast {
            velocity_ceiling: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightTuning {
    pub lateral_slack: f64,
    pub goal_tolerance: f64,
    pub mode: AscentMode,
}

impl Default for FlightTuning {
    fn default() -> Self {
        Self {
            lateral_slack: 1.0,
            goal_tolerance: 0.5,
            mode: AscentMode::graceful(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CruiseTuning {
    /// Lateral distance from the anchor→target line that triggers a re-anchor.
    pub lateral_threshold: f64,
    /// Residual distance accepted on arrival.
    pub arrival_radius: f64,
    /// Horizontal speed below which the agent counts as stopped.
    pub speed_threshold: f64,
    /// Release forward intent when this close to the target.
    pub brake_distance: f64,
    /// Allowed altitude change during the cruise.
    pub altitude_slack: f64,
    /// Re-anchors allowed before the glide counts as pushed off course.
    pub max_reanchors: u32,
    pub stagnation: StagnationCheck,
}

impl Default for CruiseTuning {
    fn default() -> Self {
        Self {
            lateral_threshold: 1.0,
            arrival_radius: 0.5,
            speed_threshold: 0.05,
            brake_distance: 1.5,
            altitude_slack: 3.0,
            max_reanchors: 8,
            stagnation: StagnationCheck::every_tick(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandTuning {
    /// Height above the target altitude where the hover phase ends.
    pub safety_height: f64,
    /// Allowed horizontal displacement from the anchor while hovering.
    pub hover_radius: f64,
    /// Allowed horizontal displacement from the anchor in free fall.
    pub fall_radius: f64,
    /// Ticks spent on each scan heading before rotating.
    pub ticks_per_heading: u32,
    pub goal_tolerance: f64,
    pub stagnation: StagnationCheck,
}

impl Default for LandTuning {
    fn default() -> Self {
        Self {
            safety_height: 4.0,
            hover_radius: 1.0,
            fall_radius: 1.5,
            ticks_per_heading: 10,
            goal_tolerance: 0.5,
            stagnation: StagnationCheck::every_tick(10),
        }
    }
}

/// Thresholds for every control loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionTuning {
    pub walk: WalkTuning,
    pub ladder: LadderTuning,
    pub flight: FlightTuning,
    pub cruise: CruiseTuning,
    pub land: LandTuning,
}

impl MotionTuning {
    /// Reject stagnation windows too small to compare two samples.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("walk", &self.walk.stagnation),
            ("ladder", &self.ladder.stagnation),
            ("cruise", &self.cruise.stagnation),
            ("land", &self.land.stagnation),
        ];
        for (name, check) in checks {
            if check.window < StagnationCheck::MIN_WINDOW {
                return Err(Error::InvalidConfig(format!(
                    "motion.{}.stagnation.window must be at least {}, got {}",
                    name,
                    StagnationCheck::MIN_WINDOW,
                    check.window
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub debug: bool,
    /// Skip equipment and booster checks before flight.
    #[serde(default)]
    pub skip_validation: bool,
    #[serde(default)]
    pub motion: MotionTuning,
}

impl Config {
    pub fn home_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".tickpilot"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("tickpilot.toml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        plog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            plog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        config.motion.validate()?;
        plog_debug!(
            "Config loaded: debug={}, skip_validation={}",
            config.debug,
            config.skip_validation
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                plog_debug!("Creating config directory: {}", dir.display());
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        plog_debug!("Config saved to {}", path.display());
        Ok(())
    }
}
