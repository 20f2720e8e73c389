//! Engine configuration

use crate::report::ScoringConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the execution engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bounded wait for page navigation, in milliseconds.
    pub navigation_timeout_ms: u64,

    /// Bounded wait for element interactions (click/type/hover), in milliseconds.
    pub step_timeout_ms: u64,

    /// Maximum simultaneous browser sessions across concurrent runs.
    pub max_concurrent_sessions: usize,

    /// Analysis modules to score (e.g. "performance", "accessibility").
    pub enabled_modules: Vec<String>,

    /// Scenario document used by `execute_by_identifier`.
    pub scenario_path: Option<PathBuf>,

    /// Fixed clock + seeded randomness for byte-identical reports.
    pub deterministic: bool,

    /// Seed threaded into the simulation strategy when deterministic.
    pub seed: u64,

    /// Scoring penalties and thresholds.
    pub scoring: ScoringConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 10_000,
            step_timeout_ms: 5_000,
            max_concurrent_sessions: 4,
            enabled_modules: vec![
                "performance".to_string(),
                "accessibility".to_string(),
                "usability".to_string(),
            ],
            scenario_path: None,
            deterministic: false,
            seed: 0,
            scoring: ScoringConfig::default(),
        }
    }
}
