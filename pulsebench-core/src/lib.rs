//! Pulsebench Core Library
//!
//! Benchmark execution and metrics instrumentation engine. Provides the
//! fan-out runner, the instrumentation wrapper, resource snapshots, the
//! reference network probe, document stores and configuration parsing.

pub mod config;
pub mod entity;
pub mod error;
pub mod facade;
pub mod instrument;
pub mod metrics;
pub mod outcome;
pub mod probe;
pub mod runner;
pub mod snapshot;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigLoader, PolicyWidths, StoreLocation, WidthConfig};
pub use entity::SyntheticEntity;
pub use error::{
    BenchError, BenchResult, ConfigError, MeasurementError, ProbeError, StorageError,
    SubRequestError,
};
pub use facade::{Benchmark, BenchmarkSuite};
pub use instrument::{Instrumenter, Measured};
pub use metrics::{MetricsRecord, MetricsSample, METRICS_HEADER};
pub use outcome::{BenchmarkOutcome, MetricsCarrier};
pub use probe::{DisabledProbe, HttpProbe, NetworkProbe};
pub use runner::{BenchmarkRunner, MessageSink, OutboundFrame, SinkError};
pub use store::{DocumentStore, MemoryStore, SqliteStore};
pub use types::{BenchmarkKind, FanOutWidth, Policy, TargetUrl};
