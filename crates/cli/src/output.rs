//! Report output formatting

use crate::OutputFormat;
use uxaudit_engine::AnalysisReport;

/// Print a report in the selected format.
pub fn print_report(report: &AnalysisReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(report)?);
        }
        OutputFormat::Plain => {
            println!("analysis: {}", report.analysis_id);
            println!("status: {:?}", report.status);
            println!("overall score: {:.1}", report.overall_score);
            println!("total issues: {}", report.total_issues);
            for (name, module) in &report.module_results {
                println!(
                    "  {}: {:.1} ({})",
                    name,
                    module.score,
                    if module.threshold_met { "ok" } else { "below threshold" }
                );
            }
            for step in &report.scenario_results {
                println!(
                    "  step {}: {} {} [{:?}] {} ms{}",
                    step.step_number,
                    step.action,
                    step.target,
                    step.status,
                    step.duration_ms,
                    step.message
                        .as_deref()
                        .map(|m| format!(" - {}", m))
                        .unwrap_or_default()
                );
            }
            if let Some(ui_error) = &report.ui_error {
                println!("error: {}", ui_error);
            }
        }
    }
    Ok(())
}
