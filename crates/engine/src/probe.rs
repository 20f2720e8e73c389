//! Craft-bug probe capability.
//!
//! Heuristic UX-defect detection is an external collaborator. The engine
//! treats it as an opaque capability; a missing or failing probe degrades
//! to an empty findings list, never to a run failure.

use crate::surface::{BrowserSurface, SurfaceResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Severity of a heuristic finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One heuristic UX-defect finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    /// Analysis module this finding belongs to; defaults to "usability".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Finding {
    /// Module this finding routes to for scoring.
    pub fn module(&self) -> &str {
        self.category.as_deref().unwrap_or("usability")
    }
}

/// Probe output: a findings list plus its advertised count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub total_found: usize,
    pub findings: Vec<Finding>,
}

/// External heuristic-analysis capability.
#[async_trait]
pub trait CraftBugProbe: Send + Sync {
    async fn analyze(&self, surface: &dyn BrowserSurface, url: &str)
        -> SurfaceResult<ProbeReport>;
}

/// Probe used when the capability is absent.
pub struct NoopProbe;

#[async_trait]
impl CraftBugProbe for NoopProbe {
    async fn analyze(
        &self,
        _surface: &dyn BrowserSurface,
        _url: &str,
    ) -> SurfaceResult<ProbeReport> {
        Ok(ProbeReport::default())
    }
}
