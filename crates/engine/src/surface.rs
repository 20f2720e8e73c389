//! Browser surface capability.
//!
//! The engine drives an abstract, automatable page session. Real execution
//! is backed by the Playwright sidecar in [`crate::driver`]; mock-app runs
//! use the seeded simulation in [`crate::sim`]. The two strategies are
//! selected at orchestrator construction through [`SurfaceFactory`].

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors raised by a browser surface call.
#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("element not found: {0}")]
    NotFound(String),

    /// The session itself is gone (browser crash, driver pipe closed).
    /// This is the only automation-fatal class; everything else is
    /// absorbed at step level.
    #[error("browser session lost: {0}")]
    SessionLost(String),

    #[error("driver protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SurfaceError {
    /// Whether this error aborts the remaining steps of a run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SurfaceError::SessionLost(_))
    }
}

/// Result type alias using [`SurfaceError`].
pub type SurfaceResult<T> = std::result::Result<T, SurfaceError>;

/// A live, automatable page session.
///
/// Every call is fallible; timeouts are imposed by the caller
/// ([`crate::executor::StepExecutor`]) rather than trusted to the backend.
#[async_trait]
pub trait BrowserSurface: Send + Sync {
    async fn navigate(&self, url: &str) -> SurfaceResult<()>;
    async fn click(&self, selector: &str) -> SurfaceResult<()>;
    async fn fill(&self, selector: &str, text: &str) -> SurfaceResult<()>;
    async fn hover(&self, selector: &str) -> SurfaceResult<()>;
    async fn evaluate(&self, script: &str) -> SurfaceResult<Value>;
    async fn wait_for(&self, ms: u64) -> SurfaceResult<()>;

    /// Release the session. Idempotent; called on every run exit path.
    async fn close(&self) -> SurfaceResult<()>;
}

/// Acquires one exclusively-owned surface per run.
#[async_trait]
pub trait SurfaceFactory: Send + Sync {
    async fn acquire(&self, base_url: &str) -> SurfaceResult<Box<dyn BrowserSurface>>;
}
