//! Configuration for image-word match.

use chrono::Duration;
use match_engine::{ScoringRules, DEFAULT_WRONG_FLASH_MS, MAX_WRONG_FLASH_MS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const APP_NAME: &str = "image-word-match";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(self)?;
            std::fs::write(path, content)?;
        }
        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.config_dir().join("config.toml"))
    }

    pub fn db_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.data_dir().join("lessons.db"))
    }

    pub fn log_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.data_dir().join("image-word-match.log"))
    }

    pub fn to_scoring_rules(&self) -> ScoringRules {
        ScoringRules {
            points_per_match: self.scoring.points_per_match,
            wrong_penalty: self.scoring.wrong_penalty,
            bonus_window_ms: self.scoring.bonus_window_ms,
            bonus_points_per_second: self.scoring.bonus_points_per_second,
        }
    }

    /// Wrong-attempt highlight, kept within `0..=MAX_WRONG_FLASH_MS`.
    pub fn wrong_flash(&self) -> Duration {
        Duration::milliseconds(self.game.wrong_flash_ms.clamp(0, MAX_WRONG_FLASH_MS))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_wrong_flash")]
    pub wrong_flash_ms: i64,
    #[serde(default = "default_true")]
    pub seed_sample_lesson: bool,
}

fn default_wrong_flash() -> i64 { DEFAULT_WRONG_FLASH_MS }
fn default_true() -> bool { true }

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            wrong_flash_ms: DEFAULT_WRONG_FLASH_MS,
            seed_sample_lesson: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_points")]
    pub points_per_match: u32,
    #[serde(default = "default_penalty")]
    pub wrong_penalty: u32,
    #[serde(default = "default_bonus_window")]
    pub bonus_window_ms: i64,
    #[serde(default = "default_bonus_rate")]
    pub bonus_points_per_second: f64,
}

fn default_points() -> u32 { 100 }
fn default_penalty() -> u32 { 10 }
fn default_bonus_window() -> i64 { 60_000 }
fn default_bonus_rate() -> f64 { 0.5 }

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            points_per_match: 100,
            wrong_penalty: 10,
            bonus_window_ms: 60_000,
            bonus_points_per_second: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub show_readings: bool,
    #[serde(default = "default_true")]
    pub show_timer: bool,
    #[serde(default = "default_true")]
    pub show_meanings_on_result: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_readings: true,
            show_timer: true,
            show_meanings_on_result: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_level() }
    }
}
