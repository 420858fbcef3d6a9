//! Custom error types for pulsebench.
//!
//! Every failure class of the harness is an explicit enum variant. Callers
//! decide per class whether it is fatal (configuration), propagating
//! (sub-request), or recoverable (probe, degenerate measurement, metrics
//! persistence).

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the benchmark engine.
#[derive(Debug, Error)]
pub enum BenchError {
    // =========================================================================
    // Configuration Errors - Fail-Fast at Startup
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // =========================================================================
    // Fan-out Errors - All-or-Nothing
    // =========================================================================
    #[error("Sub-request failed: {0}")]
    SubRequest(#[from] SubRequestError),

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // =========================================================================
    // Measurement Errors
    // =========================================================================
    #[error("Probe unavailable: {0}")]
    Probe(#[from] ProbeError),

    #[error("Measurement error: {0}")]
    Measurement(#[from] MeasurementError),
}

/// Configuration errors prevent the process from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {name} (set the {env} environment variable)")]
    MissingSetting {
        name: &'static str,
        env: &'static str,
    },

    #[error("Invalid setting value: {field} = {value} - {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration parse error: {message}")]
    Parse { message: String },

    #[error("Unsupported database URL scheme: {url}")]
    UnsupportedStore { url: String },
}

/// Reference-speed probe failures. Recoverable: the sample is still produced
/// with `network_speed` unavailable.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("probe request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("probe request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("probe is disabled")]
    Disabled,
}

/// Measurement errors raised while deriving metrics.
#[derive(Debug, Error, PartialEq)]
pub enum MeasurementError {
    #[error("degenerate measurement: latency {latency_secs}s is not positive, requests_per_second is undefined")]
    Degenerate { latency_secs: f64 },
}

/// A single fan-out sub-request failed; the whole fan-out is aborted.
#[derive(Debug, Error)]
pub enum SubRequestError {
    #[error("GET {url} failed: {reason}")]
    HttpTransport { url: String, reason: String },

    #[error("GET {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("GET {url} returned a body that is not JSON: {reason}")]
    HttpDecode { url: String, reason: String },

    #[error("WebSocket send #{index} failed: {reason}")]
    WebSocketSend { index: usize, reason: String },

    #[error("Entity write failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Fan-out of width {width} exceeded its {timeout_ms}ms deadline")]
    DeadlineExceeded { width: usize, timeout_ms: u64 },
}

/// Persistence engine failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to open store at {url}: {reason}")]
    Open { url: String, reason: String },

    #[error("Write to collection '{collection}' rejected: {reason}")]
    Write { collection: String, reason: String },

    #[error("Read from collection '{collection}' failed: {reason}")]
    Read { collection: String, reason: String },

    #[error("Document encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Store task aborted: {reason}")]
    Task { reason: String },
}

/// Result type alias using BenchError.
pub type BenchResult<T> = Result<T, BenchError>;
