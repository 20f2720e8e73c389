//! Simulation strategy.
//!
//! A seeded, in-memory page model used by `execute_for_mock_app` and by
//! tests. Kept structurally separate from the real Playwright driver and
//! selected at orchestrator construction; scoring code never branches on
//! whether a run was simulated.

use crate::probe::{CraftBugProbe, Finding, ProbeReport, Severity};
use crate::surface::{BrowserSurface, SurfaceError, SurfaceFactory, SurfaceResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Selectors every mock app answers to. Anything else is "not on the page"
/// and exercises the executor's fallback path.
const DEFAULT_SELECTORS: &[&str] = &[
    "#search",
    "#submit",
    "#menu",
    "input#query",
    "button.primary",
    ".nav-link",
    "text=submit",
    "text=search",
];

/// Simulated sleeps are capped so wait steps don't slow test runs.
const MAX_SIM_SLEEP_MS: u64 = 5;

/// In-memory page session with deterministic, seeded behavior.
pub struct SimulatedSurface {
    rng: Mutex<StdRng>,
    selectors: Vec<String>,
    current_url: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl SimulatedSurface {
    pub fn new(seed: u64) -> Self {
        Self::with_selectors(seed, DEFAULT_SELECTORS.iter().map(|s| s.to_string()).collect())
    }

    pub fn with_selectors(seed: u64, selectors: Vec<String>) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            selectors,
            current_url: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> SurfaceResult<()> {
        if self.is_closed() {
            return Err(SurfaceError::SessionLost("surface closed".to_string()));
        }
        Ok(())
    }

    fn lookup(&self, selector: &str) -> SurfaceResult<()> {
        self.check_open()?;
        // "#crash" simulates a browser death mid-interaction.
        if selector == "#crash" {
            self.closed.store(true, Ordering::SeqCst);
            return Err(SurfaceError::SessionLost("simulated crash".to_string()));
        }
        if self.selectors.iter().any(|s| s == selector) {
            Ok(())
        } else {
            Err(SurfaceError::NotFound(selector.to_string()))
        }
    }
}

#[async_trait]
impl BrowserSurface for SimulatedSurface {
    async fn navigate(&self, url: &str) -> SurfaceResult<()> {
        self.check_open()?;
        if url.contains("unreachable") {
            return Err(SurfaceError::Timeout(format!("navigation to {}", url)));
        }
        if url.contains("crash") {
            self.closed.store(true, Ordering::SeqCst);
            return Err(SurfaceError::SessionLost("simulated crash on load".to_string()));
        }
        *self.current_url.lock() = Some(url.to_string());
        debug!(url, "simulated navigation");
        Ok(())
    }

    async fn click(&self, selector: &str) -> SurfaceResult<()> {
        self.lookup(selector)
    }

    async fn fill(&self, selector: &str, _text: &str) -> SurfaceResult<()> {
        self.lookup(selector)
    }

    async fn hover(&self, selector: &str) -> SurfaceResult<()> {
        self.lookup(selector)
    }

    async fn evaluate(&self, _script: &str) -> SurfaceResult<Value> {
        self.check_open()?;
        let mut rng = self.rng.lock();
        Ok(json!({
            "loadTimeMs": 600.0 + rng.gen_range(0..600) as f64,
            "domContentLoadedMs": 300.0 + rng.gen_range(0..300) as f64,
            "firstPaintMs": 150.0 + rng.gen_range(0..150) as f64,
            "domNodeCount": 200 + rng.gen_range(0..800),
        }))
    }

    async fn wait_for(&self, ms: u64) -> SurfaceResult<()> {
        self.check_open()?;
        tokio::time::sleep(std::time::Duration::from_millis(ms.min(MAX_SIM_SLEEP_MS))).await;
        Ok(())
    }

    async fn close(&self) -> SurfaceResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory for simulated sessions.
///
/// With a fixed seed every acquired surface behaves identically run to
/// run; without one each session gets fresh entropy.
pub struct SimulationFactory {
    seed: Option<u64>,
}

impl SimulationFactory {
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }
}

#[async_trait]
impl SurfaceFactory for SimulationFactory {
    async fn acquire(&self, base_url: &str) -> SurfaceResult<Box<dyn BrowserSurface>> {
        let seed = self.seed.unwrap_or_else(rand::random);
        debug!(base_url, seed, "acquiring simulated surface");
        Ok(Box::new(SimulatedSurface::new(seed)))
    }
}

/// Seeded probe producing findings from a fixed catalog.
pub struct SimulatedProbe {
    seed: Option<u64>,
}

impl SimulatedProbe {
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }
}

#[async_trait]
impl CraftBugProbe for SimulatedProbe {
    async fn analyze(
        &self,
        _surface: &dyn BrowserSurface,
        url: &str,
    ) -> SurfaceResult<ProbeReport> {
        let mut rng = StdRng::seed_from_u64(self.seed.unwrap_or_else(rand::random));
        let catalog = [
            Finding {
                kind: "layout-shift".to_string(),
                severity: Severity::Medium,
                message: format!("content shifts during load on {}", url),
                element: Some("main".to_string()),
                category: Some("performance".to_string()),
            },
            Finding {
                kind: "missing-alt-text".to_string(),
                severity: Severity::Low,
                message: "image without alternative text".to_string(),
                element: Some("img.hero".to_string()),
                category: Some("accessibility".to_string()),
            },
            Finding {
                kind: "dead-click".to_string(),
                severity: Severity::High,
                message: "click produced no visible response".to_string(),
                element: Some("#submit".to_string()),
                category: None,
            },
        ];
        let findings: Vec<Finding> = catalog
            .into_iter()
            .filter(|_| rng.gen_bool(0.5))
            .collect();
        Ok(ProbeReport {
            total_found: findings.len(),
            findings,
        })
    }
}

/// Built-in scenario document used when a mock app has no entry in the
/// configured scenario file.
pub fn default_mock_document(app: &str) -> Value {
    json!({
        "scenarios": [{
            "id": app,
            "name": format!("{} smoke scenario", app),
            "steps": [
                {"action": "navigate", "target": format!("mock://{}", app)},
                {"action": "click", "target": "#search"},
                {"action": "type", "target": "input#query", "text": "hello"},
                {"action": "hover", "target": "#menu"},
                {"action": "wait", "duration_ms": 100}
            ]
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_selectors_resolve() {
        let surface = SimulatedSurface::new(7);
        surface.navigate("mock://app").await.unwrap();
        assert!(surface.click("#search").await.is_ok());
        assert!(surface.click("#nope").await.is_err());
    }

    #[tokio::test]
    async fn crash_selector_kills_session() {
        let surface = SimulatedSurface::new(7);
        let err = surface.click("#crash").await.unwrap_err();
        assert!(err.is_fatal());
        assert!(surface.click("#search").await.unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn seeded_metrics_are_stable() {
        let a = SimulatedSurface::new(42).evaluate("x").await.unwrap();
        let b = SimulatedSurface::new(42).evaluate("x").await.unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn mock_document_resolves() {
        let doc = default_mock_document("wordpad");
        let scenario = crate::scenario::resolve(&doc, Some("wordpad")).unwrap();
        assert_eq!(scenario.identifier, "wordpad");
        assert_eq!(scenario.steps.len(), 5);
    }
}
