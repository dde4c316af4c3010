use crate::error::{FsResult, ScoreError};
use crate::scoring::visibility::Visibility;
use clap::Args;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::Level;

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[command(flatten)]
    pub alignment: AlignmentParams,
    #[command(flatten)]
    pub scoring: ScoringParams,
    /// tracing filter used by the binary, the library never installs one
    #[arg(long, default_value = "info")]
    pub log_level: String,
    /// level diagnostic events are forwarded to tracing at
    #[arg(long, default_value = "info")]
    pub event_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alignment: AlignmentParams::default(),
            scoring: ScoringParams::default(),
            log_level: "info".to_string(),
            event_level: "info".to_string(),
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentParams {
    /// Sakoe-Chiba band half width in samples, 0 disables the band
    #[arg(long, default_value_t = 10)]
    pub dtw_radius: usize,
    #[arg(long, default_value_t = 2)]
    pub max_passes: usize,
    #[arg(long, default_value_t = 3)]
    pub min_element_len: usize,
    #[arg(long, default_value_t = 100)]
    pub max_split_steps: usize,
    #[arg(long, default_value_t = 10_000)]
    pub max_iterations: usize,
}

impl Default for AlignmentParams {
    fn default() -> Self {
        Self {
            dtw_radius: 10,
            max_passes: 2,
            min_element_len: 3,
            max_split_steps: 100,
            max_iterations: 10_000,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringParams {
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub visibility_enabled: bool,

    // b = base - factor * slope. Empirical, tune against reference scores.
    #[arg(long, default_value_t = 2.2)]
    pub visibility_base: f64,
    #[arg(long, default_value_t = 1.2)]
    pub visibility_slope: f64,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub apply_limits: bool,
    #[arg(long, default_value_t = 10.0)]
    pub max_score: f64,
    #[arg(long, default_value_t = 3)]
    pub difficulty: u8,
    #[arg(long, default_value_t = false)]
    pub truncate: bool,
    #[arg(long, default_value_t = 25.0)]
    pub template_freq: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            visibility_enabled: true,
            visibility_base: 2.2,
            visibility_slope: 1.2,
            apply_limits: true,
            max_score: 10.0,
            difficulty: 3,
            truncate: false,
            template_freq: 25.0,
        }
    }
}

impl ScoringParams {
    /// The visibility curve, `None` when visibility weighting is off.
    pub fn visibility(&self) -> Option<Visibility> {
        self.visibility_enabled.then(|| Visibility {
            base: self.visibility_base,
            slope: self.visibility_slope,
        })
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> FsResult<Self> {
        let content = fs::read_to_string(path)?;
        let cfg: Config = serde_json::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> FsResult<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn event_level(&self) -> FsResult<Level> {
        self.event_level.parse::<Level>().map_err(|_| {
            ScoreError::Config(format!("unknown event level {}", self.event_level))
        })
    }

    pub fn validate(&self) -> FsResult<()> {
        self.event_level()?;
        if !(1..=3).contains(&self.scoring.difficulty) {
            return Err(ScoreError::Config(format!(
                "difficulty must be 1, 2 or 3, got {}",
                self.scoring.difficulty
            )));
        }
        if self.alignment.min_element_len < 1 {
            return Err(ScoreError::Config(
                "min_element_len must be at least 1".to_string(),
            ));
        }
        if self.scoring.visibility_base <= 0.0 {
            return Err(ScoreError::Config(
                "visibility_base must be positive".to_string(),
            ));
        }
        if self.scoring.template_freq <= 0.0 {
            return Err(ScoreError::Config(
                "template_freq must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
