//! Configuration module

use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Legal ledger JSONL path; `None` keeps the ledger in memory
    pub ledger_path: Option<PathBuf>,

    /// Active Tier 1 (Probable) threshold
    pub tier1_threshold: f64,

    /// Active Tier 2 (Confirmed) threshold
    pub tier2_threshold: f64,

    /// Observed density at or above which a sample counts as a bloom
    pub bloom_density_cutoff: f64,

    /// Threshold search grid bounds and resolution
    pub grid_start: f64,
    pub grid_stop: f64,
    pub grid_step: f64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            ledger_path: env::var("LEDGER_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),

            tier1_threshold: float_var("TIER1_THRESHOLD", 0.85),
            tier2_threshold: float_var("TIER2_THRESHOLD", 0.93),
            bloom_density_cutoff: float_var("BLOOM_DENSITY_CUTOFF", 10.0),

            grid_start: float_var("GRID_START", 0.10),
            grid_stop: float_var("GRID_STOP", 0.99),
            grid_step: float_var("GRID_STEP", 0.01),
        }
    }
}

fn float_var(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
