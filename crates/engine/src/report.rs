//! Report assembly and scoring.
//!
//! Converts step results, page metrics, and probe findings into per-module
//! scores and the single guaranteed-shape [`AnalysisReport`]. Penalty
//! constants are tunable configuration defaults, not contract.

use crate::executor::{StepResult, StepStatus};
use crate::metrics::PageMetrics;
use crate::probe::{Finding, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scoring penalties and thresholds. All values are heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Deduction per `Warning` step, applied to every module.
    pub warning_penalty: f64,

    /// Load-time boundary (ms) above which the large penalty applies.
    pub slow_load_ms: f64,
    pub slow_load_penalty: f64,

    /// Load-time boundary (ms) above which the moderate penalty applies.
    pub moderate_load_ms: f64,
    pub moderate_load_penalty: f64,

    /// Deduction per accessibility finding.
    pub accessibility_finding_penalty: f64,

    /// Deductions per craft-bug finding, scaled by severity.
    pub craft_penalty_low: f64,
    pub craft_penalty_medium: f64,
    pub craft_penalty_high: f64,

    /// Minimum score for a module to meet its threshold.
    pub module_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            warning_penalty: 5.0,
            slow_load_ms: 3_000.0,
            slow_load_penalty: 25.0,
            moderate_load_ms: 1_000.0,
            moderate_load_penalty: 10.0,
            accessibility_finding_penalty: 10.0,
            craft_penalty_low: 3.0,
            craft_penalty_medium: 5.0,
            craft_penalty_high: 10.0,
            module_threshold: 70.0,
        }
    }
}

impl ScoringConfig {
    fn craft_penalty(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Low => self.craft_penalty_low,
            Severity::Medium => self.craft_penalty_medium,
            Severity::High => self.craft_penalty_high,
        }
    }
}

/// Score and findings for one analysis module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleResult {
    pub score: f64,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub threshold_met: bool,
}

/// Terminal status of a whole analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Completed,
    Failed,
}

/// The single guaranteed-shape output of a run.
///
/// Always present with every field defaulted even when empty; the failure
/// envelope is this same type with `status = failed`, never a second shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub analysis_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: ReportStatus,
    pub overall_score: f64,
    pub module_results: BTreeMap<String, ModuleResult>,
    pub scenario_results: Vec<StepResult>,
    pub total_issues: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_error: Option<String>,
}

impl AnalysisReport {
    pub fn is_failed(&self) -> bool {
        self.status == ReportStatus::Failed
    }
}

/// Builds per-module scores from run artifacts.
pub struct ReportAssembler {
    scoring: ScoringConfig,
}

impl ReportAssembler {
    pub fn new(scoring: ScoringConfig) -> Self {
        Self { scoring }
    }

    /// Assemble one [`ModuleResult`] per enabled module.
    pub fn assemble(
        &self,
        step_results: &[StepResult],
        metrics: &PageMetrics,
        findings: &[Finding],
        enabled_modules: &[String],
    ) -> BTreeMap<String, ModuleResult> {
        enabled_modules
            .iter()
            .map(|module| {
                (
                    module.clone(),
                    self.score_module(module, step_results, metrics, findings),
                )
            })
            .collect()
    }

    fn score_module(
        &self,
        module: &str,
        step_results: &[StepResult],
        metrics: &PageMetrics,
        findings: &[Finding],
    ) -> ModuleResult {
        let total = step_results.len();
        let successful = count(step_results, StepStatus::Success);
        let warnings = count(step_results, StepStatus::Warning);

        let mut score = if total == 0 {
            0.0
        } else {
            100.0 * successful as f64 / total as f64
        };
        score -= self.scoring.warning_penalty * warnings as f64;

        let mut recommendations = Vec::new();
        if warnings > 0 {
            recommendations.push(format!(
                "{} step(s) needed fallback handling; review the scenario's selectors",
                warnings
            ));
        }

        if module == "performance" {
            if let Some(load) = metrics.load_time_ms {
                if load > self.scoring.slow_load_ms {
                    score -= self.scoring.slow_load_penalty;
                    recommendations
                        .push(format!("page load took {:.0} ms; reduce initial payload", load));
                } else if load > self.scoring.moderate_load_ms {
                    score -= self.scoring.moderate_load_penalty;
                    recommendations
                        .push(format!("page load took {:.0} ms; consider lazy loading", load));
                }
            }
        }

        let routed: Vec<Finding> = findings
            .iter()
            .filter(|f| f.module() == module)
            .cloned()
            .collect();
        for finding in &routed {
            if module == "accessibility" {
                score -= self.scoring.accessibility_finding_penalty;
            } else {
                score -= self.scoring.craft_penalty(finding.severity);
            }
        }
        if !routed.is_empty() {
            recommendations.push(format!(
                "address {} {} finding(s) surfaced by analysis",
                routed.len(),
                module
            ));
        }

        let score = round1(score.clamp(0.0, 100.0));
        ModuleResult {
            score,
            findings: routed,
            recommendations,
            threshold_met: score >= self.scoring.module_threshold,
        }
    }

    /// Arithmetic mean of enabled module scores; 0 when none are enabled.
    pub fn overall_score(modules: &BTreeMap<String, ModuleResult>) -> f64 {
        if modules.is_empty() {
            return 0.0;
        }
        let sum: f64 = modules.values().map(|m| m.score).sum();
        round1(sum / modules.len() as f64)
    }

    /// Findings across modules plus warning/error steps.
    pub fn total_issues(
        modules: &BTreeMap<String, ModuleResult>,
        step_results: &[StepResult],
    ) -> usize {
        let findings: usize = modules.values().map(|m| m.findings.len()).sum();
        let degraded = step_results
            .iter()
            .filter(|r| r.status != StepStatus::Success)
            .count();
        findings + degraded
    }
}

fn count(results: &[StepResult], status: StepStatus) -> usize {
    results.iter().filter(|r| r.status == status).count()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(number: usize, status: StepStatus) -> StepResult {
        StepResult {
            step_number: number,
            action: "click".to_string(),
            target: "#btn".to_string(),
            status,
            duration_ms: 10,
            message: None,
        }
    }

    fn assembler() -> ReportAssembler {
        ReportAssembler::new(ScoringConfig::default())
    }

    #[test]
    fn all_success_scores_full() {
        let steps = vec![step(1, StepStatus::Success), step(2, StepStatus::Success)];
        let modules = assembler().assemble(
            &steps,
            &PageMetrics::default(),
            &[],
            &["usability".to_string()],
        );
        assert_eq!(modules["usability"].score, 100.0);
        assert!(modules["usability"].threshold_met);
    }

    #[test]
    fn warnings_deduct_base_and_penalty() {
        // 1 of 2 successful (50.0) minus one warning penalty (5.0).
        let steps = vec![step(1, StepStatus::Success), step(2, StepStatus::Warning)];
        let modules = assembler().assemble(
            &steps,
            &PageMetrics::default(),
            &[],
            &["usability".to_string()],
        );
        assert_eq!(modules["usability"].score, 45.0);
        assert!(!modules["usability"].threshold_met);
    }

    #[test]
    fn slow_load_penalizes_performance_only() {
        let steps = vec![step(1, StepStatus::Success)];
        let metrics = PageMetrics {
            load_time_ms: Some(4_200.0),
            ..PageMetrics::default()
        };
        let modules = assembler().assemble(
            &steps,
            &metrics,
            &[],
            &["performance".to_string(), "usability".to_string()],
        );
        assert_eq!(modules["performance"].score, 75.0);
        assert_eq!(modules["usability"].score, 100.0);
        assert!(!modules["performance"].recommendations.is_empty());
    }

    #[test]
    fn craft_findings_scale_by_severity() {
        let steps = vec![step(1, StepStatus::Success)];
        let findings = vec![
            Finding {
                kind: "dead-click".to_string(),
                severity: Severity::High,
                message: "no response".to_string(),
                element: None,
                category: None,
            },
            Finding {
                kind: "jitter".to_string(),
                severity: Severity::Low,
                message: "minor shift".to_string(),
                element: None,
                category: None,
            },
        ];
        let modules =
            assembler().assemble(&steps, &PageMetrics::default(), &findings, &["usability".to_string()]);
        // 100 - 10 (high) - 3 (low)
        assert_eq!(modules["usability"].score, 87.0);
        assert_eq!(modules["usability"].findings.len(), 2);
    }

    #[test]
    fn scores_clamp_to_zero() {
        let steps: Vec<StepResult> = (1..=10).map(|i| step(i, StepStatus::Warning)).collect();
        let modules = assembler().assemble(
            &steps,
            &PageMetrics::default(),
            &[],
            &["usability".to_string()],
        );
        assert_eq!(modules["usability"].score, 0.0);
    }

    #[test]
    fn overall_is_mean_of_enabled() {
        let mut modules = BTreeMap::new();
        modules.insert("a".to_string(), ModuleResult { score: 80.0, ..Default::default() });
        modules.insert("b".to_string(), ModuleResult { score: 60.0, ..Default::default() });
        assert_eq!(ReportAssembler::overall_score(&modules), 70.0);
        assert_eq!(ReportAssembler::overall_score(&BTreeMap::new()), 0.0);
    }

    #[test]
    fn total_issues_counts_findings_and_degraded_steps() {
        let mut modules = BTreeMap::new();
        modules.insert(
            "usability".to_string(),
            ModuleResult {
                findings: vec![Finding {
                    kind: "x".to_string(),
                    severity: Severity::Low,
                    message: "m".to_string(),
                    element: None,
                    category: None,
                }],
                ..Default::default()
            },
        );
        let steps = vec![step(1, StepStatus::Warning), step(2, StepStatus::Error)];
        assert_eq!(ReportAssembler::total_issues(&modules, &steps), 3);
    }
}
