//! UX Audit Engine
//!
//! Scenario resolution and execution for UX-quality testing of web
//! applications: normalizes heterogeneous scenario documents into one
//! canonical form, drives each step against a browser surface with
//! per-step timeout and fallback semantics, aggregates step outcomes and
//! collected signals into per-module scores, and guarantees callers a
//! well-formed report under every failure condition.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     ExecutionOrchestrator                    │
//! │   execute_for_url / execute_for_mock_app / execute_by_id     │
//! ├──────────────────────────────────────────────────────────────┤
//! │  raw document ── ScenarioResolver ──► canonical Scenario     │
//! │  Scenario ────── StepExecutor ──────► StepResult[]           │
//! │                    │ BrowserSurface (playwright | simulated) │
//! │  StepResult[] ──┬─ MetricsCollector ─┐                       │
//! │                 └─ CraftBugProbe ────┤                       │
//! │                       ReportAssembler ──► AnalysisReport     │
//! │                       SchemaNormalizer ─► guaranteed shape   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Step-level problems (a selector that never resolves) are data, not
//! control flow: they become `Warning` entries and the run continues.
//! Only a lost browser session aborts remaining steps, and even then a
//! partial report is assembled and marked failed.

pub mod cache;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod normalize;
pub mod orchestrator;
pub mod probe;
pub mod report;
pub mod scenario;
pub mod sim;
pub mod surface;

pub use cache::ReportCache;
pub use clock::Clock;
pub use config::EngineConfig;
pub use driver::{Browser, PlaywrightConfig, PlaywrightFactory, PlaywrightSurface};
pub use error::{EngineError, ResolutionError, Result};
pub use executor::{StepExecutor, StepResult, StepStatus};
pub use metrics::{MetricsCollector, PageMetrics};
pub use normalize::{normalize, Normalizer};
pub use orchestrator::Orchestrator;
pub use probe::{CraftBugProbe, Finding, NoopProbe, ProbeReport, Severity};
pub use report::{AnalysisReport, ModuleResult, ReportAssembler, ReportStatus, ScoringConfig};
pub use scenario::{resolve, resolve_file, DocumentShape, Scenario, Step};
pub use sim::{SimulatedProbe, SimulatedSurface, SimulationFactory};
pub use surface::{BrowserSurface, SurfaceError, SurfaceFactory, SurfaceResult};
