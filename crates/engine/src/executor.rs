//! Step execution.
//!
//! Each step runs through a small state machine
//! (`Pending -> Running -> {Success, Warning, Error}`) and produces exactly
//! one [`StepResult`]. A single broken locator must never abort the whole
//! scenario: element timeouts get one text-locator fallback attempt and are
//! then demoted to `Warning`. Only a lost browser session escapes the loop.

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::scenario::Step;
use crate::surface::{BrowserSurface, SurfaceError, SurfaceResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Terminal status of one executed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Warning,
    Error,
}

/// Outcome of one executed step. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_number: usize,
    pub action: String,
    pub target: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Executes canonical steps against a browser surface.
pub struct StepExecutor {
    navigation_timeout: Duration,
    step_timeout: Duration,
    clock: Arc<Clock>,
}

impl StepExecutor {
    pub fn new(config: &EngineConfig, clock: Arc<Clock>) -> Self {
        Self {
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            step_timeout: Duration::from_millis(config.step_timeout_ms),
            clock,
        }
    }

    /// Execute one step. Errors only on an automation-fatal condition;
    /// every other outcome is data in the returned [`StepResult`].
    pub async fn execute(
        &self,
        surface: &dyn BrowserSurface,
        step: &Step,
        step_number: usize,
    ) -> Result<StepResult, EngineError> {
        debug!(step_number, action = step.action(), target = step.target(), "executing step");
        let stopwatch = self.clock.stopwatch();

        let (status, message) = match step {
            Step::Navigate { target } => self.navigate(surface, target).await?,
            Step::Click { target } => self.interact(surface, target, None).await?,
            Step::Type { target, text } => self.interact(surface, target, Some(text)).await?,
            Step::Hover { target } => self.hover(surface, target).await?,
            Step::Wait { duration_ms } => self.wait(surface, *duration_ms).await?,
            Step::Unknown { action, .. } => (
                StepStatus::Warning,
                Some(format!("unrecognized action '{}', step skipped", action)),
            ),
        };

        if status != StepStatus::Success {
            warn!(step_number, ?status, message = message.as_deref().unwrap_or(""), "step degraded");
        }

        Ok(StepResult {
            step_number,
            action: step.action().to_string(),
            target: step.target().to_string(),
            status,
            duration_ms: stopwatch.elapsed_ms(),
            message,
        })
    }

    async fn navigate(
        &self,
        surface: &dyn BrowserSurface,
        target: &str,
    ) -> Result<(StepStatus, Option<String>), EngineError> {
        match bounded(self.navigation_timeout, target, surface.navigate(target)).await {
            Ok(()) => Ok((StepStatus::Success, None)),
            Err(e) if e.is_fatal() => Err(EngineError::AutomationFatal(e.to_string())),
            // Error only on total failure to load; the run still continues.
            Err(e) => Ok((
                StepStatus::Error,
                Some(format!("failed to load '{}': {}", target, e)),
            )),
        }
    }

    /// Click/type policy: one bounded primary attempt by selector, then
    /// exactly one fallback by visible text, then demote to `Warning`.
    async fn interact(
        &self,
        surface: &dyn BrowserSurface,
        target: &str,
        text: Option<&str>,
    ) -> Result<(StepStatus, Option<String>), EngineError> {
        match self.attempt(surface, target, text).await {
            Ok(()) => return Ok((StepStatus::Success, None)),
            Err(e) if e.is_fatal() => return Err(EngineError::AutomationFatal(e.to_string())),
            Err(e) => debug!(target, error = %e, "primary locator failed, trying text fallback"),
        }

        if let Some(fallback) = text_fallback(target) {
            match self.attempt(surface, &fallback, text).await {
                Ok(()) => {
                    return Ok((
                        StepStatus::Success,
                        Some(format!("located '{}' by visible text", target)),
                    ))
                }
                Err(e) if e.is_fatal() => {
                    return Err(EngineError::AutomationFatal(e.to_string()))
                }
                Err(_) => {}
            }
        }

        Ok((
            StepStatus::Warning,
            Some(format!("element '{}' not found, continuing", target)),
        ))
    }

    /// One bounded click or fill attempt against a single locator.
    async fn attempt(
        &self,
        surface: &dyn BrowserSurface,
        selector: &str,
        text: Option<&str>,
    ) -> SurfaceResult<()> {
        let call = async {
            match text {
                Some(t) => surface.fill(selector, t).await,
                None => surface.click(selector).await,
            }
        };
        bounded(self.step_timeout, selector, call).await
    }

    async fn hover(
        &self,
        surface: &dyn BrowserSurface,
        target: &str,
    ) -> Result<(StepStatus, Option<String>), EngineError> {
        match bounded(self.step_timeout, target, surface.hover(target)).await {
            Ok(()) => Ok((StepStatus::Success, None)),
            Err(e) if e.is_fatal() => Err(EngineError::AutomationFatal(e.to_string())),
            Err(e) => Ok((
                StepStatus::Warning,
                Some(format!("hover target '{}' not ready: {}", target, e)),
            )),
        }
    }

    async fn wait(
        &self,
        surface: &dyn BrowserSurface,
        duration_ms: u64,
    ) -> Result<(StepStatus, Option<String>), EngineError> {
        match surface.wait_for(duration_ms).await {
            Err(e) if e.is_fatal() => Err(EngineError::AutomationFatal(e.to_string())),
            // A wait is always a success, even if the backend shortened it.
            _ => Ok((StepStatus::Success, None)),
        }
    }
}

/// Impose an engine-side timeout on a surface call.
async fn bounded<T>(
    limit: Duration,
    what: &str,
    fut: impl Future<Output = SurfaceResult<T>>,
) -> SurfaceResult<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(SurfaceError::Timeout(what.to_string())),
    }
}

/// Derive a visible-text locator from a CSS-ish selector.
///
/// `#submit-btn` becomes `text=submit btn`; selectors that carry no word
/// characters yield no fallback.
fn text_fallback(selector: &str) -> Option<String> {
    if selector.starts_with("text=") {
        return None;
    }
    let words: Vec<&str> = selector
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return None;
    }
    Some(format!("text={}", words.join(" ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_from_id_selector() {
        assert_eq!(text_fallback("#submit-btn"), Some("text=submit btn".to_string()));
    }

    #[test]
    fn fallback_from_class_chain() {
        assert_eq!(
            text_fallback("button.primary > span"),
            Some("text=button primary span".to_string())
        );
    }

    #[test]
    fn no_fallback_for_text_locator() {
        assert_eq!(text_fallback("text=Save"), None);
    }

    #[test]
    fn no_fallback_without_words() {
        assert_eq!(text_fallback("#>."), None);
    }

    #[test]
    fn step_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&StepStatus::Warning).unwrap(),
            "\"warning\""
        );
    }
}
