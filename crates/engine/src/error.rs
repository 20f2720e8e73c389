//! Error types for the audit engine

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving a raw scenario document.
///
/// All of these are fatal to a run: the orchestrator converts them into a
/// failure report before any step is attempted.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("scenario file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("scenario parse error: {0}")]
    Parse(String),

    #[error("unsupported scenario shape: {0}")]
    UnsupportedShape(String),

    #[error("scenario resolved to zero steps")]
    EmptySteps,

    #[error("scenario identifier not found: {0}")]
    IdentifierNotFound(String),
}

/// Engine-level errors.
///
/// Nothing step-level lives here: element timeouts and missing selectors
/// are demoted to `Warning` step results by the executor and never unwind
/// the call stack. Only run-fatal conditions appear.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("browser session lost: {0}")]
    AutomationFatal(String),

    #[error("run cancelled by caller")]
    Cancelled,

    #[error("report assembly failed: {0}")]
    Assembly(String),
}

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;
