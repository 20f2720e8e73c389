//! Output-contract enforcement.
//!
//! [`Normalizer::normalize`] is a pure, total, idempotent function from any
//! JSON value to a well-formed [`AnalysisReport`]. Callers of the engine
//! handle exactly one shape under every failure condition.

use crate::clock::Clock;
use crate::executor::{StepResult, StepStatus};
use crate::report::{AnalysisReport, ModuleResult, ReportStatus};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Error recorded when the candidate is not a mapping at all.
const INVALID_REPORT: &str = "Invalid report data";

/// Fallback error for failure envelopes that carry none.
const GENERIC_FAILURE: &str = "Analysis failed";

/// Enforces the report schema and error envelope.
pub struct Normalizer {
    clock: Arc<Clock>,
}

impl Normalizer {
    pub fn new(clock: Arc<Clock>) -> Self {
        Self { clock }
    }

    /// Normalize an arbitrary candidate value into a well-formed report.
    ///
    /// Property: `normalize(normalize(x)) == normalize(x)` for any `x`.
    pub fn normalize(&self, candidate: &Value) -> AnalysisReport {
        let map = match candidate.as_object() {
            Some(map) => map,
            None => return self.failure_envelope(INVALID_REPORT),
        };

        let has_error = map.get("error").map(|e| !e.is_null()).unwrap_or(false);
        let failed = has_error
            || map
                .get("status")
                .and_then(Value::as_str)
                .map(|s| s == "failed")
                .unwrap_or(false);

        let analysis_id = map
            .get("analysisId")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("unknown")
            .to_string();
        let timestamp = map
            .get("timestamp")
            .and_then(parse_timestamp)
            .unwrap_or_else(|| self.clock.now());
        let overall_score = map
            .get("overallScore")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
            .clamp(0.0, 100.0);
        let total_issues = map
            .get("totalIssues")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let module_results = normalize_modules(map.get("moduleResults"));
        let scenario_results = normalize_steps(map.get("scenarioResults"));

        if failed {
            let error = map
                .get("error")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or(GENERIC_FAILURE)
                .to_string();
            let ui_error = map
                .get("uiError")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Analysis could not be completed: {}", error));
            AnalysisReport {
                analysis_id,
                timestamp,
                status: ReportStatus::Failed,
                overall_score,
                module_results,
                scenario_results,
                total_issues,
                error: Some(error),
                ui_error: Some(ui_error),
            }
        } else {
            AnalysisReport {
                analysis_id,
                timestamp,
                status: ReportStatus::Completed,
                overall_score,
                module_results,
                scenario_results,
                total_issues,
                error: None,
                ui_error: None,
            }
        }
    }

    /// Canonical failure envelope for unrecoverable candidates.
    pub fn failure_envelope(&self, error: &str) -> AnalysisReport {
        AnalysisReport {
            analysis_id: "unknown".to_string(),
            timestamp: self.clock.now(),
            status: ReportStatus::Failed,
            overall_score: 0.0,
            module_results: BTreeMap::new(),
            scenario_results: Vec::new(),
            total_issues: 0,
            error: Some(error.to_string()),
            ui_error: Some(format!("Analysis could not be completed: {}", error)),
        }
    }
}

/// Normalize with a wall clock; convenience for callers outside a run.
pub fn normalize(candidate: &Value) -> AnalysisReport {
    Normalizer::new(Arc::new(Clock::Wall)).normalize(candidate)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    serde_json::from_value(value.clone()).ok()
}

/// Coerce a `moduleResults` candidate: non-mapping input becomes an empty
/// map; individual malformed entries collapse to defaulted module results.
fn normalize_modules(value: Option<&Value>) -> BTreeMap<String, ModuleResult> {
    let map = match value.and_then(Value::as_object) {
        Some(map) => map,
        None => return BTreeMap::new(),
    };
    map.iter()
        .map(|(name, v)| {
            let module = serde_json::from_value::<ModuleResult>(v.clone())
                .unwrap_or_default();
            (name.clone(), module)
        })
        .collect()
}

/// Coerce a `scenarioResults` candidate: non-list input becomes an empty
/// list; malformed entries collapse to defaulted error placeholders so the
/// step count survives.
fn normalize_steps(value: Option<&Value>) -> Vec<StepResult> {
    let list = match value.and_then(Value::as_array) {
        Some(list) => list,
        None => return Vec::new(),
    };
    list.iter()
        .enumerate()
        .map(|(idx, v)| {
            serde_json::from_value::<StepResult>(v.clone()).unwrap_or(StepResult {
                step_number: idx + 1,
                action: "unknown".to_string(),
                target: String::new(),
                status: StepStatus::Error,
                duration_ms: 0,
                message: Some("malformed step result".to_string()),
            })
        })
        .collect()
}
