//! End-to-end engine tests against the simulated browser strategy.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uxaudit_engine::{
    BrowserSurface, EngineConfig, Orchestrator, ReportCache, ReportStatus, SimulatedSurface,
    StepStatus, SurfaceFactory, SurfaceResult,
};

fn deterministic_config() -> EngineConfig {
    EngineConfig {
        deterministic: true,
        seed: 42,
        ..EngineConfig::default()
    }
}

fn orchestrator() -> Orchestrator {
    Orchestrator::simulated(deterministic_config())
}

fn smoke_document() -> Value {
    json!([
        {"action": "navigate", "target": "mock://app"},
        {"action": "click", "target": "#search"},
        {"action": "type", "target": "input#query", "text": "hello"}
    ])
}

#[tokio::test]
async fn completed_run_produces_full_report() {
    let report = orchestrator()
        .execute_for_url("mock://app", &smoke_document(), None)
        .await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.scenario_results.len(), 3);
    assert!(report
        .scenario_results
        .iter()
        .all(|r| r.status == StepStatus::Success));
    assert!(!report.module_results.is_empty());
    assert!(report.overall_score > 0.0);
    assert!(report.error.is_none());
}

#[tokio::test]
async fn step_order_is_preserved() {
    let report = orchestrator()
        .execute_for_url("mock://app", &smoke_document(), None)
        .await;
    let numbers: Vec<usize> = report.scenario_results.iter().map(|r| r.step_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[tokio::test]
async fn unknown_step_warns_and_run_continues() {
    let document = json!([
        {"action": "navigate", "target": "mock://app"},
        {"action": "teleport", "target": "#nowhere"},
        {"action": "click", "target": "#search"}
    ]);
    let report = orchestrator()
        .execute_for_url("mock://app", &document, None)
        .await;

    assert_eq!(report.scenario_results.len(), 3);
    assert_eq!(report.scenario_results[1].status, StepStatus::Warning);
    assert!(report.scenario_results[1]
        .message
        .as_deref()
        .unwrap_or("")
        .contains("teleport"));
    assert_eq!(report.scenario_results[2].status, StepStatus::Success);
}

#[tokio::test]
async fn missing_element_demotes_to_warning() {
    let document = json!([
        {"action": "navigate", "target": "mock://app"},
        {"action": "click", "target": "#missing"}
    ]);
    let report = orchestrator()
        .execute_for_url("mock://app", &document, None)
        .await;

    let click = &report.scenario_results[1];
    assert_eq!(click.status, StepStatus::Warning);
    assert!(click.message.as_deref().unwrap_or("").contains("continuing"));
    assert_eq!(report.status, ReportStatus::Completed);
}

#[tokio::test]
async fn malformed_document_yields_failure_envelope() {
    let report = orchestrator()
        .execute_for_url("mock://app", &json!(42), None)
        .await;

    assert_eq!(report.status, ReportStatus::Failed);
    assert!(!report.ui_error.as_deref().unwrap_or("").is_empty());
    assert!(report.scenario_results.is_empty());
    assert_eq!(report.overall_score, 0.0);
}

#[tokio::test]
async fn empty_steps_fail_before_any_execution() {
    let document = json!({"scenarios": [{"id": "1.1", "steps": []}]});
    let report = orchestrator()
        .execute_for_url("mock://app", &document, Some("1.1"))
        .await;

    assert_eq!(report.status, ReportStatus::Failed);
    assert!(report.scenario_results.is_empty());
}

#[tokio::test]
async fn unknown_identifier_fails_resolution() {
    let document = json!({"scenarios": [{"id": "1.1", "steps": [{"action": "wait", "ms": 1}]}]});
    let report = orchestrator()
        .execute_for_url("mock://app", &document, Some("9.9"))
        .await;

    assert_eq!(report.status, ReportStatus::Failed);
    assert!(report.error.as_deref().unwrap_or("").contains("9.9"));
}

#[tokio::test]
async fn session_crash_produces_partial_failed_report() {
    let document = json!([
        {"action": "navigate", "target": "mock://app"},
        {"action": "click", "target": "#search"},
        {"action": "click", "target": "#crash"},
        {"action": "click", "target": "#submit"},
        {"action": "hover", "target": "#menu"}
    ]);
    let report = orchestrator()
        .execute_for_url("mock://app", &document, None)
        .await;

    assert_eq!(report.status, ReportStatus::Failed);
    // Every step accounted for: 2 executed, crash, 2 not-executed.
    assert_eq!(report.scenario_results.len(), 5);
    assert_eq!(report.scenario_results[0].status, StepStatus::Success);
    assert_eq!(report.scenario_results[1].status, StepStatus::Success);
    assert_eq!(report.scenario_results[2].status, StepStatus::Error);
    assert!(report.scenario_results[4]
        .message
        .as_deref()
        .unwrap_or("")
        .contains("not executed"));
    assert!(!report.ui_error.as_deref().unwrap_or("").is_empty());
}

#[tokio::test]
async fn deterministic_runs_are_byte_identical() {
    let orch = orchestrator();
    let a = orch.execute_for_mock_app("wordpad").await;
    let b = orch.execute_for_mock_app("wordpad").await;

    let a_json = serde_json::to_string(&a).unwrap();
    let b_json = serde_json::to_string(&b).unwrap();
    assert_eq!(a_json, b_json);
}

#[tokio::test]
async fn mock_app_run_completes() {
    let report = orchestrator().execute_for_mock_app("calculator").await;
    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.analysis_id, "analysis-calculator");
    assert_eq!(report.scenario_results.len(), 5);
}

#[tokio::test]
async fn execute_by_identifier_reads_scenario_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "scenarios:\n  - id: \"1.1\"\n    name: search flow\n    steps:\n      - action: navigate\n        target: mock://app\n      - action: click\n        target: \"#search\"\n"
    )
    .unwrap();

    let config = EngineConfig {
        scenario_path: Some(file.path().to_path_buf()),
        ..deterministic_config()
    };
    let report = Orchestrator::simulated(config).execute_by_identifier("1.1").await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.analysis_id, "analysis-1.1");
    assert_eq!(report.scenario_results.len(), 2);
}

#[tokio::test]
async fn deterministic_identifier_runs_are_byte_identical() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "scenarios:\n  - id: \"2.1\"\n    steps:\n      - action: navigate\n        target: mock://app\n      - action: click\n        target: \"#search\"\n      - action: hover\n        target: \"#menu\"\n"
    )
    .unwrap();

    let config = EngineConfig {
        scenario_path: Some(file.path().to_path_buf()),
        ..deterministic_config()
    };
    let orch = Orchestrator::simulated(config);
    let a = orch.execute_by_identifier("2.1").await;
    let b = orch.execute_by_identifier("2.1").await;

    assert_eq!(a.analysis_id, "analysis-2.1");
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[tokio::test]
async fn execute_by_identifier_without_file_fails_cleanly() {
    let report = orchestrator().execute_by_identifier("1.1").await;
    assert_eq!(report.status, ReportStatus::Failed);
    assert!(!report.ui_error.as_deref().unwrap_or("").is_empty());
}

#[tokio::test]
async fn cached_report_is_returned_on_second_call() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "scenarios:\n  - id: cached\n    steps:\n      - action: navigate\n        target: mock://app\n"
    )
    .unwrap();

    let config = EngineConfig {
        scenario_path: Some(file.path().to_path_buf()),
        ..deterministic_config()
    };
    let cache = Arc::new(ReportCache::new(8, std::time::Duration::from_secs(60)));
    let orch = Orchestrator::simulated(config).with_cache(Arc::clone(&cache));

    let first = orch.execute_by_identifier("cached").await;
    assert_eq!(cache.len(), 1);
    let second = orch.execute_by_identifier("cached").await;
    assert_eq!(first, second);
}

/// Shares one simulated page across acquires and honors wait durations in
/// full, so a run can be observed (and cancelled) while a step is in flight.
struct SharedSurface {
    inner: Arc<SimulatedSurface>,
}

#[async_trait]
impl BrowserSurface for SharedSurface {
    async fn navigate(&self, url: &str) -> SurfaceResult<()> {
        self.inner.navigate(url).await
    }
    async fn click(&self, selector: &str) -> SurfaceResult<()> {
        self.inner.click(selector).await
    }
    async fn fill(&self, selector: &str, text: &str) -> SurfaceResult<()> {
        self.inner.fill(selector, text).await
    }
    async fn hover(&self, selector: &str) -> SurfaceResult<()> {
        self.inner.hover(selector).await
    }
    async fn evaluate(&self, script: &str) -> SurfaceResult<Value> {
        self.inner.evaluate(script).await
    }
    async fn wait_for(&self, ms: u64) -> SurfaceResult<()> {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(())
    }
    async fn close(&self) -> SurfaceResult<()> {
        self.inner.close().await
    }
}

struct SharedFactory {
    surface: Arc<SimulatedSurface>,
}

#[async_trait]
impl SurfaceFactory for SharedFactory {
    async fn acquire(&self, _base_url: &str) -> SurfaceResult<Box<dyn BrowserSurface>> {
        Ok(Box::new(SharedSurface {
            inner: Arc::clone(&self.surface),
        }))
    }
}

#[tokio::test]
async fn midrun_cancellation_fails_run_and_closes_surface() {
    let surface = Arc::new(SimulatedSurface::new(42));
    let factory = Arc::new(SharedFactory {
        surface: Arc::clone(&surface),
    });
    let orch = Orchestrator::new(deterministic_config(), factory);

    let document = json!([
        {"action": "navigate", "target": "mock://app"},
        {"action": "wait", "ms": 5_000}
    ]);
    let cancel = CancellationToken::new();
    let trigger = {
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        }
    };
    let (report, _) = tokio::join!(
        orch.execute_for_url_with("mock://app", &document, None, cancel),
        trigger
    );

    assert_eq!(report.status, ReportStatus::Failed);
    assert!(report.error.as_deref().unwrap_or("").contains("cancelled"));
    // The session handle is released even when the run is torn down mid-step.
    assert!(surface.is_closed());
}

#[tokio::test]
async fn pre_cancelled_run_returns_failed_envelope() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = orchestrator()
        .execute_for_url_with("mock://app", &smoke_document(), None, cancel)
        .await;

    assert_eq!(report.status, ReportStatus::Failed);
    assert!(report.error.as_deref().unwrap_or("").contains("cancelled"));
}

#[tokio::test]
async fn unreachable_page_is_an_error_step_not_a_crash() {
    let document = json!([
        {"action": "navigate", "target": "mock://unreachable"},
        {"action": "wait", "ms": 1}
    ]);
    let report = orchestrator()
        .execute_for_url("mock://unreachable", &document, None)
        .await;

    assert_eq!(report.scenario_results[0].status, StepStatus::Error);
    assert_eq!(report.scenario_results[1].status, StepStatus::Success);
    assert_eq!(report.status, ReportStatus::Completed);
}
