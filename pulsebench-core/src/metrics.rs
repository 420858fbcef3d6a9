// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Metrics model: one measurement sample and its storage envelope.
//!
//! A [`MetricsSample`] travels inline on every instrumented response as the
//! `x-metrics` header; a [`MetricsRecord`] is the same sample persisted with
//! the operation that produced it.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{MeasurementError, StorageError};
use crate::store::{self, Document, DocumentStore};

/// Header under which the serialized sample is attached.
pub const METRICS_HEADER: &str = "x-metrics";

/// Method label recorded for every persisted sample.
pub const DEFAULT_METHOD: &str = "GET";

/// Latency substituted for a zero measurement (one nanosecond, the clock's
/// resolution).
pub const MIN_MEASURABLE_LATENCY: f64 = 1e-9;

/// Resource consumption of one instrumented operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSample {
    /// Seconds from instrumentation start to operation completion.
    pub latency: f64,
    /// Change in the number of logical processors visible to the process
    /// between start and end.
    ///
    /// This is not a CPU cycle count. It is almost always 0 and only moves
    /// when the process's CPU affinity or the host's online CPUs change
    /// during the operation. The name is kept for compatibility with
    /// existing consumers of the header and the stored records.
    pub cpu_cycle: i64,
    /// Change in resident memory in bytes; negative when memory was freed.
    pub memory: i64,
    /// Seconds attributed to the network-bound part of the operation. The
    /// operation is not split into phases, so this tracks `latency`.
    pub network_time: f64,
    /// Bytes per second measured against the reference probe, `None` when
    /// the probe was unavailable.
    pub network_speed: Option<f64>,
    /// Always `1 / latency`.
    pub requests_per_second: f64,
}

impl MetricsSample {
    /// Derive a sample from raw measurements.
    ///
    /// Fails with [`MeasurementError::Degenerate`] when `latency` is zero,
    /// since `requests_per_second` would be undefined.
    pub fn compute(
        latency: Duration,
        network_time: Duration,
        cpu_cycle: i64,
        memory: i64,
        network_speed: Option<f64>,
    ) -> Result<Self, MeasurementError> {
        let latency_secs = latency.as_secs_f64();
        if latency_secs <= 0.0 {
            return Err(MeasurementError::Degenerate { latency_secs });
        }
        Ok(Self::with_latency(
            latency_secs,
            network_time.as_secs_f64(),
            cpu_cycle,
            memory,
            network_speed,
        ))
    }

    /// Like [`compute`](Self::compute), but clamps a zero latency to
    /// [`MIN_MEASURABLE_LATENCY`]. Returns the sample and whether clamping
    /// happened.
    pub fn compute_clamped(
        latency: Duration,
        network_time: Duration,
        cpu_cycle: i64,
        memory: i64,
        network_speed: Option<f64>,
    ) -> (Self, Option<MeasurementError>) {
        match Self::compute(latency, network_time, cpu_cycle, memory, network_speed) {
            Ok(sample) => (sample, None),
            Err(err) => {
                let network_secs = network_time.as_secs_f64().max(MIN_MEASURABLE_LATENCY);
                let sample = Self::with_latency(
                    MIN_MEASURABLE_LATENCY,
                    network_secs,
                    cpu_cycle,
                    memory,
                    network_speed,
                );
                (sample, Some(err))
            }
        }
    }

    fn with_latency(
        latency: f64,
        network_time: f64,
        cpu_cycle: i64,
        memory: i64,
        network_speed: Option<f64>,
    ) -> Self {
        Self {
            latency,
            cpu_cycle,
            memory,
            network_time,
            network_speed,
            requests_per_second: 1.0 / latency,
        }
    }

    /// Render the `x-metrics` header value. An unavailable network speed is
    /// written as `0`.
    pub fn header_value(&self) -> String {
        format!(
            "latency={},cpu_cycle={},memory={}B,network_time={},network_speed={},requests_per_second={}",
            self.latency,
            self.cpu_cycle,
            self.memory,
            self.network_time,
            self.network_speed.unwrap_or(0.0),
            self.requests_per_second
        )
    }

    /// Parse an `x-metrics` header value back into a sample.
    ///
    /// A `network_speed` of `0` is read back as unavailable.
    pub fn parse_header(value: &str) -> Result<Self, HeaderParseError> {
        let mut latency = None;
        let mut cpu_cycle = None;
        let mut memory = None;
        let mut network_time = None;
        let mut network_speed = None;
        let mut requests_per_second = None;

        for (index, pair) in value.split(',').enumerate() {
            let (key, raw) = pair
                .split_once('=')
                .ok_or(HeaderParseError::MalformedPair { index })?;
            let raw = raw.trim();
            match key.trim() {
                "latency" => latency = Some(parse_float(key, raw)?),
                "cpu_cycle" => cpu_cycle = Some(parse_int(key, raw)?),
                "memory" => {
                    let bytes = raw
                        .strip_suffix('B')
                        .ok_or_else(|| HeaderParseError::InvalidNumber {
                            field: "memory".to_string(),
                            value: raw.to_string(),
                        })?;
                    memory = Some(parse_int(key, bytes)?)
                }
                "network_time" => network_time = Some(parse_float(key, raw)?),
                "network_speed" => network_speed = Some(parse_float(key, raw)?),
                "requests_per_second" => requests_per_second = Some(parse_float(key, raw)?),
                other => {
                    return Err(HeaderParseError::UnknownField {
                        field: other.to_string(),
                    })
                }
            }
        }

        let missing = |field: &'static str| HeaderParseError::MissingField { field };
        let network_speed = network_speed.ok_or_else(|| missing("network_speed"))?;
        Ok(Self {
            latency: latency.ok_or_else(|| missing("latency"))?,
            cpu_cycle: cpu_cycle.ok_or_else(|| missing("cpu_cycle"))?,
            memory: memory.ok_or_else(|| missing("memory"))?,
            network_time: network_time.ok_or_else(|| missing("network_time"))?,
            network_speed: (network_speed > 0.0).then_some(network_speed),
            requests_per_second: requests_per_second
                .ok_or_else(|| missing("requests_per_second"))?,
        })
    }
}

impl fmt::Display for MetricsSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header_value())
    }
}

fn parse_float(field: &str, raw: &str) -> Result<f64, HeaderParseError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| HeaderParseError::InvalidNumber {
            field: field.to_string(),
            value: raw.to_string(),
        })
}

fn parse_int(field: &str, raw: &str) -> Result<i64, HeaderParseError> {
    raw.parse::<i64>()
        .map_err(|_| HeaderParseError::InvalidNumber {
            field: field.to_string(),
            value: raw.to_string(),
        })
}

/// Errors from [`MetricsSample::parse_header`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum HeaderParseError {
    #[error("pair #{index} is not key=value")]
    MalformedPair { index: usize },

    #[error("field '{field}' has a non-numeric value '{value}'")]
    InvalidNumber { field: String, value: String },

    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    #[error("missing field '{field}'")]
    MissingField { field: &'static str },
}

/// A persisted sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub metrics: MetricsSample,
    /// Operation that produced the sample.
    pub endpoint: String,
    /// Transport verb of the operation.
    pub method: String,
    /// Unix time in seconds at record creation.
    #[serde(default = "unix_now")]
    pub timestamp: f64,
}

impl Document for MetricsRecord {
    const COLLECTION: &'static str = "metrics";
}

fn unix_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Build a record for a sample, stamped with the current time.
pub fn record(sample: MetricsSample, endpoint: &str, method: &str) -> MetricsRecord {
    MetricsRecord {
        metrics: sample,
        endpoint: endpoint.to_string(),
        method: method.to_string(),
        timestamp: unix_now(),
    }
}

/// Hand a record to the persistence engine.
pub async fn persist(
    store: &dyn DocumentStore,
    record: &MetricsRecord,
) -> Result<(), StorageError> {
    store::save_document(store, record).await
}

/// Every persisted record, oldest first.
pub async fn load_records(store: &dyn DocumentStore) -> Result<Vec<MetricsRecord>, StorageError> {
    store::find_documents(store).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn sample() -> MetricsSample {
        MetricsSample::compute(
            Duration::from_millis(250),
            Duration::from_millis(240),
            0,
            -4096,
            Some(1500.5),
        )
        .unwrap()
    }

    #[test]
    fn test_requests_per_second_is_inverse_latency() {
        let s = sample();
        assert_eq!(s.latency, 0.25);
        assert_eq!(s.requests_per_second, 4.0);
    }

    #[test]
    fn test_zero_latency_is_degenerate() {
        let result = MetricsSample::compute(Duration::ZERO, Duration::ZERO, 0, 0, None);
        assert_eq!(
            result.unwrap_err(),
            MeasurementError::Degenerate { latency_secs: 0.0 }
        );
    }

    #[test]
    fn test_zero_latency_clamped() {
        let (s, err) = MetricsSample::compute_clamped(Duration::ZERO, Duration::ZERO, 0, 0, None);
        assert!(err.is_some());
        assert_eq!(s.latency, MIN_MEASURABLE_LATENCY);
        assert_eq!(s.requests_per_second, 1.0 / MIN_MEASURABLE_LATENCY);
        assert!(s.requests_per_second.is_finite());
    }

    #[test]
    fn test_header_format() {
        let header = sample().header_value();
        assert_eq!(
            header,
            "latency=0.25,cpu_cycle=0,memory=-4096B,network_time=0.24,network_speed=1500.5,requests_per_second=4"
        );
    }

    #[test]
    fn test_header_parses_back() {
        let s = sample();
        let parsed = MetricsSample::parse_header(&s.header_value()).unwrap();
        assert_eq!(parsed, s);
    }

    #[test]
    fn test_unavailable_speed_renders_sentinel() {
        let s = MetricsSample::compute(
            Duration::from_millis(10),
            Duration::from_millis(10),
            0,
            0,
            None,
        )
        .unwrap();
        assert!(s.header_value().contains("network_speed=0,"));
        let parsed = MetricsSample::parse_header(&s.header_value()).unwrap();
        assert!(parsed.network_speed.is_none());
    }

    #[test]
    fn test_parse_header_errors() {
        assert!(matches!(
            MetricsSample::parse_header("latency=1"),
            Err(HeaderParseError::MissingField { .. })
        ));
        assert!(matches!(
            MetricsSample::parse_header("latency"),
            Err(HeaderParseError::MalformedPair { index: 0 })
        ));
        assert!(matches!(
            MetricsSample::parse_header(
                "latency=x,cpu_cycle=0,memory=0B,network_time=1,network_speed=0,requests_per_second=1"
            ),
            Err(HeaderParseError::InvalidNumber { .. })
        ));
        assert!(matches!(
            MetricsSample::parse_header(
                "latency=1,cpu_cycle=0,memory=0,network_time=1,network_speed=0,requests_per_second=1"
            ),
            Err(HeaderParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_record_stamps_time() {
        let before = unix_now();
        let r = record(sample(), "test_db", DEFAULT_METHOD);
        assert_eq!(r.endpoint, "test_db");
        assert_eq!(r.method, "GET");
        assert!(r.timestamp >= before);
    }

    #[test]
    fn test_record_serialization_keeps_null_speed() {
        let mut s = sample();
        s.network_speed = None;
        let json = serde_json::to_value(record(s, "http", DEFAULT_METHOD)).unwrap();
        assert!(json["metrics"]["network_speed"].is_null());
        assert_eq!(json["endpoint"], "http");
    }

    #[tokio::test]
    async fn test_persist_and_load() {
        let store = MemoryStore::new();
        persist(&store, &record(sample(), "http", DEFAULT_METHOD))
            .await
            .unwrap();
        let records = load_records(&store).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metrics, sample());
        assert_eq!(store.count("metrics"), 1);
    }
}
