//! Performance and page-shape metrics.
//!
//! Collected after step execution by evaluating a timing snippet through
//! the surface. Collection is best effort: an unsupported backend degrades
//! to an empty partial map and never fails the run.

use crate::surface::BrowserSurface;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// Timing snippet evaluated in the page. Returns whatever the backend can
/// supply; absent fields stay absent.
const METRICS_SCRIPT: &str = r#"(() => {
  const t = performance.timing || {};
  const paint = performance.getEntriesByType
    ? performance.getEntriesByType('paint').find(e => e.name === 'first-paint')
    : null;
  return {
    loadTimeMs: t.loadEventEnd && t.navigationStart ? t.loadEventEnd - t.navigationStart : null,
    domContentLoadedMs: t.domContentLoadedEventEnd && t.navigationStart
      ? t.domContentLoadedEventEnd - t.navigationStart : null,
    firstPaintMs: paint ? paint.startTime : null,
    domNodeCount: document.getElementsByTagName('*').length
  };
})()"#;

/// Best-effort page metrics. Every field is optional by design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetrics {
    pub load_time_ms: Option<f64>,
    pub dom_content_loaded_ms: Option<f64>,
    pub first_paint_ms: Option<f64>,
    pub dom_node_count: Option<u64>,
}

impl PageMetrics {
    /// Pick known fields out of a loosely-shaped evaluation result,
    /// ignoring anything wrong-typed.
    pub fn from_value(value: &Value) -> Self {
        Self {
            load_time_ms: value.get("loadTimeMs").and_then(Value::as_f64),
            dom_content_loaded_ms: value.get("domContentLoadedMs").and_then(Value::as_f64),
            first_paint_ms: value.get("firstPaintMs").and_then(Value::as_f64),
            dom_node_count: value.get("domNodeCount").and_then(Value::as_u64),
        }
    }
}

/// Pulls timing signals from the surface after execution.
pub struct MetricsCollector {
    timeout: Duration,
}

impl MetricsCollector {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Collect whatever the surface can report. Never fails.
    pub async fn collect(&self, surface: &dyn BrowserSurface) -> PageMetrics {
        match tokio::time::timeout(self.timeout, surface.evaluate(METRICS_SCRIPT)).await {
            Ok(Ok(value)) => PageMetrics::from_value(&value),
            Ok(Err(e)) => {
                warn!(error = %e, "metrics collection unsupported, continuing without");
                PageMetrics::default()
            }
            Err(_) => {
                warn!("metrics collection timed out, continuing without");
                PageMetrics::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn picks_known_fields() {
        let value = json!({"loadTimeMs": 812.0, "domNodeCount": 340, "firstPaintMs": null});
        let metrics = PageMetrics::from_value(&value);
        assert_eq!(metrics.load_time_ms, Some(812.0));
        assert_eq!(metrics.dom_node_count, Some(340));
        assert_eq!(metrics.first_paint_ms, None);
    }

    #[test]
    fn wrong_typed_fields_stay_absent() {
        let value = json!({"loadTimeMs": "fast", "domNodeCount": -3});
        assert_eq!(PageMetrics::from_value(&value), PageMetrics::default());
    }

    #[test]
    fn non_object_yields_empty_partial() {
        assert_eq!(PageMetrics::from_value(&json!(null)), PageMetrics::default());
    }
}
