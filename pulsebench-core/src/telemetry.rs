// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Process-wide Prometheus counters.
//!
//! Recoverable failures (probe, degenerate latency, metrics persistence) do
//! not reach the caller, so they are counted here as well as logged.

use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

lazy_static! {
    pub static ref BENCHMARK_RUNS: IntCounterVec = register_int_counter_vec!(
        "pulsebench_benchmark_runs_total",
        "Instrumented benchmark invocations by endpoint, policy and outcome",
        &["endpoint", "policy", "outcome"]
    )
    .expect("benchmark run counter registers once");
    pub static ref SUB_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "pulsebench_sub_requests_total",
        "Fan-out sub-requests dispatched by benchmark kind",
        &["kind"]
    )
    .expect("sub-request counter registers once");
    pub static ref PROBE_FAILURES: IntCounter = register_int_counter!(
        "pulsebench_probe_failures_total",
        "Reference probe requests that produced no network speed"
    )
    .expect("probe failure counter registers once");
    pub static ref DEGENERATE_MEASUREMENTS: IntCounter = register_int_counter!(
        "pulsebench_degenerate_measurements_total",
        "Measurements whose latency was zero and had to be clamped"
    )
    .expect("degenerate measurement counter registers once");
    pub static ref PERSIST_FAILURES: IntCounterVec = register_int_counter_vec!(
        "pulsebench_persist_failures_total",
        "Metrics records the persistence engine did not accept",
        &["endpoint"]
    )
    .expect("persist failure counter registers once");
}

/// Force registration so every series shows up before its first increment.
pub fn init() {
    lazy_static::initialize(&BENCHMARK_RUNS);
    lazy_static::initialize(&SUB_REQUESTS);
    lazy_static::initialize(&PROBE_FAILURES);
    lazy_static::initialize(&DEGENERATE_MEASUREMENTS);
    lazy_static::initialize(&PERSIST_FAILURES);
}

/// Encode the default registry in the Prometheus text format.
pub fn gather_text() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }

    String::from_utf8(buffer).unwrap_or_else(|_| String::from("Encoding error"))
}
