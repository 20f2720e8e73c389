//! Execution orchestration.
//!
//! Composes resolver, executor, metrics, probe, assembler, and normalizer.
//! Every entry point is total with respect to [`AnalysisReport`]: nothing
//! above step level escapes as an error, and the caller always receives a
//! normalized report. Failure containment happens in three tiers:
//!
//! 1. Resolution failure short-circuits to a failure report; no steps run.
//! 2. Step failure is data (a `Warning` result); the run continues.
//! 3. A lost browser session aborts remaining steps; a partial report is
//!    still assembled and marked failed.

use crate::cache::ReportCache;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{EngineError, ResolutionError};
use crate::executor::{StepExecutor, StepResult, StepStatus};
use crate::metrics::{MetricsCollector, PageMetrics};
use crate::normalize::Normalizer;
use crate::probe::{CraftBugProbe, ProbeReport};
use crate::report::{AnalysisReport, ReportAssembler, ReportStatus};
use crate::scenario::{self, Scenario, Step};
use crate::sim::{self, SimulatedProbe, SimulationFactory};
use crate::surface::{BrowserSurface, SurfaceFactory};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Top-level entry points for scenario execution.
pub struct Orchestrator {
    config: EngineConfig,
    factory: Arc<dyn SurfaceFactory>,
    probe: Option<Arc<dyn CraftBugProbe>>,
    cache: Option<Arc<ReportCache>>,
    clock: Arc<Clock>,
    sessions: Arc<Semaphore>,
    executor: StepExecutor,
    metrics: MetricsCollector,
    assembler: ReportAssembler,
    normalizer: Normalizer,
}

impl Orchestrator {
    /// Build an orchestrator around an injected surface strategy.
    pub fn new(config: EngineConfig, factory: Arc<dyn SurfaceFactory>) -> Self {
        let clock = Arc::new(Clock::for_mode(config.deterministic));
        let executor = StepExecutor::new(&config, Arc::clone(&clock));
        let metrics = MetricsCollector::new(config.step_timeout_ms);
        let assembler = ReportAssembler::new(config.scoring.clone());
        let normalizer = Normalizer::new(Arc::clone(&clock));
        let sessions = Arc::new(Semaphore::new(config.max_concurrent_sessions.max(1)));
        Self {
            config,
            factory,
            probe: None,
            cache: None,
            clock,
            sessions,
            executor,
            metrics,
            assembler,
            normalizer,
        }
    }

    /// Orchestrator wired to the simulation strategy end to end.
    pub fn simulated(config: EngineConfig) -> Self {
        let seed = config.deterministic.then_some(config.seed);
        let factory = Arc::new(SimulationFactory::new(seed));
        Self::new(config, factory).with_probe(Arc::new(SimulatedProbe::new(seed)))
    }

    pub fn with_probe(mut self, probe: Arc<dyn CraftBugProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_cache(mut self, cache: Arc<ReportCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Execute a caller-supplied document against a URL.
    pub async fn execute_for_url(
        &self,
        url: &str,
        document: &Value,
        identifier: Option<&str>,
    ) -> AnalysisReport {
        self.execute_for_url_with(url, document, identifier, CancellationToken::new())
            .await
    }

    /// Cancellable variant of [`Self::execute_for_url`].
    pub async fn execute_for_url_with(
        &self,
        url: &str,
        document: &Value,
        identifier: Option<&str>,
        cancel: CancellationToken,
    ) -> AnalysisReport {
        let outcome = async {
            let scenario = scenario::resolve(document, identifier)?;
            self.run(url, scenario, &cancel).await
        }
        .await;
        self.settle(outcome)
    }

    /// Execute the built-in (or configured) scenario for a mock application.
    pub async fn execute_for_mock_app(&self, app: &str) -> AnalysisReport {
        self.execute_for_mock_app_with(app, CancellationToken::new())
            .await
    }

    /// Cancellable variant of [`Self::execute_for_mock_app`].
    pub async fn execute_for_mock_app_with(
        &self,
        app: &str,
        cancel: CancellationToken,
    ) -> AnalysisReport {
        let document = self.mock_document(app);
        let url = format!("mock://{}", app);
        let outcome = async {
            let scenario = scenario::resolve(&document, Some(app))?;
            self.run(&url, scenario, &cancel).await
        }
        .await;
        self.settle(outcome)
    }

    /// Execute a scenario from the configured scenario file by identifier.
    pub async fn execute_by_identifier(&self, identifier: &str) -> AnalysisReport {
        self.execute_by_identifier_with(identifier, CancellationToken::new())
            .await
    }

    /// Cancellable variant of [`Self::execute_by_identifier`].
    pub async fn execute_by_identifier_with(
        &self,
        identifier: &str,
        cancel: CancellationToken,
    ) -> AnalysisReport {
        if let Some(cache) = &self.cache {
            if let Some(report) = cache.get(identifier) {
                info!(identifier, "returning cached report");
                return report;
            }
        }

        let outcome = async {
            let path = self
                .config
                .scenario_path
                .clone()
                .ok_or_else(|| ResolutionError::FileNotFound(PathBuf::from("<unconfigured>")))?;
            let scenario = scenario::resolve_file(&path, Some(identifier))?;
            let url = base_url(&scenario);
            self.run(&url, scenario, &cancel).await
        }
        .await;
        let report = self.settle(outcome);

        if let Some(cache) = &self.cache {
            if !report.is_failed() {
                cache.insert(identifier, report.clone());
            }
        }
        report
    }

    /// Convert a run outcome into the guaranteed report shape.
    fn settle(&self, outcome: Result<AnalysisReport, EngineError>) -> AnalysisReport {
        let candidate = outcome.and_then(|report| {
            serde_json::to_value(&report).map_err(|e| EngineError::Assembly(e.to_string()))
        });
        match candidate {
            // Normalization is the last touch on every success path.
            Ok(value) => self.normalizer.normalize(&value),
            Err(e) => {
                error!(error = %e, "run settled as failure");
                self.normalizer.failure_envelope(&e.to_string())
            }
        }
    }

    /// Resolve-free core: drive the steps, collect signals, assemble.
    async fn run(
        &self,
        url: &str,
        scenario: Scenario,
        cancel: &CancellationToken,
    ) -> Result<AnalysisReport, EngineError> {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            permit = self.sessions.acquire() => {
                permit.map_err(|_| EngineError::Cancelled)?
            }
        };

        let surface = self
            .factory
            .acquire(url)
            .await
            .map_err(|e| EngineError::AutomationFatal(e.to_string()))?;

        // The surface is owned by this run; close it on every exit path.
        let outcome: Result<_, EngineError> = async {
            let (step_results, fatal) = self.drive(surface.as_ref(), url, &scenario, cancel).await?;
            let (metrics, probe_report) = if fatal.is_none() {
                let metrics = self.metrics.collect(surface.as_ref()).await;
                let probe_report = self.probe_findings(surface.as_ref(), url).await;
                (metrics, probe_report)
            } else {
                // Session is gone; signals are best-effort empty.
                (PageMetrics::default(), ProbeReport::default())
            };
            Ok((step_results, fatal, metrics, probe_report))
        }
        .await;
        if let Err(e) = surface.close().await {
            warn!(error = %e, "surface close failed");
        }
        let (step_results, fatal, metrics, probe_report) = outcome?;

        let modules = self.assembler.assemble(
            &step_results,
            &metrics,
            &probe_report.findings,
            &self.config.enabled_modules,
        );
        let overall_score = ReportAssembler::overall_score(&modules);
        let total_issues = ReportAssembler::total_issues(&modules, &step_results);

        let (status, error, ui_error) = match fatal {
            Some(reason) => {
                let message = format!("browser session lost: {}", reason);
                let ui = format!("Analysis could not be completed: {}", message);
                (ReportStatus::Failed, Some(message), Some(ui))
            }
            None => (ReportStatus::Completed, None, None),
        };

        Ok(AnalysisReport {
            analysis_id: self.analysis_id(&scenario),
            timestamp: self.clock.now(),
            status,
            overall_score,
            module_results: modules,
            scenario_results: step_results,
            total_issues,
            error,
            ui_error,
        })
    }

    /// Step loop. Returns every produced result plus the fatal reason when
    /// the session died mid-run; steps never silently vanish.
    async fn drive(
        &self,
        surface: &dyn BrowserSurface,
        url: &str,
        scenario: &Scenario,
        cancel: &CancellationToken,
    ) -> Result<(Vec<StepResult>, Option<String>), EngineError> {
        info!(
            identifier = %scenario.identifier,
            steps = scenario.steps.len(),
            url,
            "executing scenario"
        );

        let mut results = Vec::with_capacity(scenario.steps.len());
        let mut fatal: Option<String> = None;

        for (index, step) in scenario.steps.iter().enumerate() {
            let step_number = index + 1;
            let executed = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                result = self.executor.execute(surface, step, step_number) => result,
            };
            match executed {
                Ok(result) => results.push(result),
                Err(EngineError::AutomationFatal(reason)) => {
                    results.push(not_executed(
                        step,
                        step_number,
                        &format!("browser session lost: {}", reason),
                    ));
                    for (later_index, later) in scenario.steps.iter().enumerate().skip(index + 1) {
                        results.push(not_executed(
                            later,
                            later_index + 1,
                            "not executed: browser session lost",
                        ));
                    }
                    fatal = Some(reason);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok((results, fatal))
    }

    async fn probe_findings(&self, surface: &dyn BrowserSurface, url: &str) -> ProbeReport {
        let probe = match &self.probe {
            Some(probe) => probe,
            None => {
                info!("no craft-bug probe configured, skipping heuristic analysis");
                return ProbeReport::default();
            }
        };
        match probe.analyze(surface, url).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "craft-bug probe failed, continuing without findings");
                ProbeReport::default()
            }
        }
    }

    fn analysis_id(&self, scenario: &Scenario) -> String {
        if self.config.deterministic {
            format!("analysis-{}", scenario.identifier)
        } else {
            format!("analysis-{}", Uuid::new_v4())
        }
    }

    /// Scenario document for a mock app: the configured file's entry when
    /// one exists, otherwise the built-in smoke scenario.
    fn mock_document(&self, app: &str) -> Value {
        if let Some(path) = &self.config.scenario_path {
            if let Ok(document) = scenario::load_document(path) {
                if scenario::resolve(&document, Some(app)).is_ok() {
                    return document;
                }
            }
        }
        sim::default_mock_document(app)
    }
}

fn base_url(scenario: &Scenario) -> String {
    scenario
        .steps
        .iter()
        .find_map(|step| match step {
            Step::Navigate { target } => Some(target.clone()),
            _ => None,
        })
        .unwrap_or_else(|| "about:blank".to_string())
}

fn not_executed(step: &Step, step_number: usize, message: &str) -> StepResult {
    StepResult {
        step_number,
        action: step.action().to_string(),
        target: step.target().to_string(),
        status: StepStatus::Error,
        duration_ms: 0,
        message: Some(message.to_string()),
    }
}
