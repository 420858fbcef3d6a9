// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Instrumentation wrapper.
//!
//! [`Instrumenter`] takes a unit of work, runs it between two resource
//! snapshots, probes the network, and attaches the resulting
//! [`MetricsSample`] to the work's output under `x-metrics`. Three variants:
//!
//! | variant | wrapped call | persists |
//! |---|---|---|
//! | [`Instrumenter::instrument`], stateless policy | awaited, may overlap other calls | no |
//! | [`Instrumenter::instrument_blocking`] | synchronous closure run inline | no |
//! | [`Instrumenter::instrument`], stateful policy | awaited, may overlap other calls | yes |
//!
//! Errors from the wrapped operation are returned untouched, without metrics.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::error::BenchResult;
use crate::metrics::{self, MetricsSample, DEFAULT_METHOD, METRICS_HEADER};
use crate::outcome::MetricsCarrier;
use crate::probe::NetworkProbe;
use crate::snapshot::ResourceSnapshot;
use crate::store::DocumentStore;
use crate::telemetry;
use crate::types::Policy;

/// Output of a measured operation together with its sample.
#[derive(Debug, Clone)]
pub struct Measured<T> {
    pub output: T,
    pub sample: MetricsSample,
}

/// Wraps operations with resource measurement.
#[derive(Debug, Clone)]
pub struct Instrumenter {
    policy: Policy,
    probe: Arc<dyn NetworkProbe>,
    store: Option<Arc<dyn DocumentStore>>,
}

impl Instrumenter {
    /// Report metrics inline only.
    pub fn stateless(probe: Arc<dyn NetworkProbe>) -> Self {
        Self {
            policy: Policy::Stateless,
            probe,
            store: None,
        }
    }

    /// Report metrics inline and persist one record per call.
    pub fn stateful(probe: Arc<dyn NetworkProbe>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            policy: Policy::Stateful,
            probe,
            store: Some(store),
        }
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Run `operation`, annotate its output with `x-metrics`, and (stateful
    /// policy) persist the sample under `endpoint`.
    pub async fn instrument<T, F, Fut>(&self, endpoint: &str, operation: F) -> BenchResult<T>
    where
        T: MetricsCarrier,
        F: FnOnce() -> Fut,
        Fut: Future<Output = BenchResult<T>>,
    {
        self.measure(endpoint, operation)
            .await
            .map(|measured| measured.output)
    }

    /// Same as [`instrument`](Self::instrument) but also hands back the sample.
    pub async fn measure<T, F, Fut>(&self, endpoint: &str, operation: F) -> BenchResult<Measured<T>>
    where
        T: MetricsCarrier,
        F: FnOnce() -> Fut,
        Fut: Future<Output = BenchResult<T>>,
    {
        let start = ResourceSnapshot::capture();
        let network_start = Instant::now();

        let output = match operation().await {
            Ok(output) => output,
            Err(e) => {
                self.count_run(endpoint, "error");
                return Err(e);
            }
        };

        let sample = self
            .complete(endpoint, self.policy, start, network_start)
            .await;
        Ok(self.annotate(endpoint, output, sample))
    }

    /// Stateless-sequential variant: `operation` runs synchronously on the
    /// calling thread, blocking it until done. Never persists.
    pub async fn instrument_blocking<T, F>(
        &self,
        endpoint: &str,
        operation: F,
    ) -> BenchResult<Measured<T>>
    where
        T: MetricsCarrier,
        F: FnOnce() -> BenchResult<T>,
    {
        let start = ResourceSnapshot::capture();
        let network_start = Instant::now();

        let output = match operation() {
            Ok(output) => output,
            Err(e) => {
                self.count_run(endpoint, "error");
                return Err(e);
            }
        };

        let sample = self
            .complete(endpoint, Policy::Stateless, start, network_start)
            .await;
        Ok(self.annotate(endpoint, output, sample))
    }

    fn annotate<T: MetricsCarrier>(
        &self,
        endpoint: &str,
        mut output: T,
        sample: MetricsSample,
    ) -> Measured<T> {
        output.attach_metrics(METRICS_HEADER, sample.header_value());
        self.count_run(endpoint, "ok");
        Measured { output, sample }
    }

    /// Steps after the operation returned: closing snapshot, probe, derived
    /// metrics, persistence.
    async fn complete(
        &self,
        endpoint: &str,
        policy: Policy,
        start: ResourceSnapshot,
        network_start: Instant,
    ) -> MetricsSample {
        let network_time = network_start.elapsed();
        let end = ResourceSnapshot::capture();
        let latency = end.elapsed_since(&start);

        let network_speed = match self.probe.measure().await {
            Ok(speed) => Some(speed),
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "Network probe unavailable");
                telemetry::PROBE_FAILURES.inc();
                None
            }
        };

        let (sample, degenerate) = MetricsSample::compute_clamped(
            latency,
            network_time,
            end.cpu_delta(&start),
            end.memory_delta(&start),
            network_speed,
        );
        if let Some(e) = degenerate {
            tracing::warn!(endpoint = %endpoint, error = %e, "Latency clamped");
            telemetry::DEGENERATE_MEASUREMENTS.inc();
        }

        tracing::info!(
            endpoint = %endpoint,
            policy = %policy,
            latency = sample.latency,
            memory = sample.memory,
            requests_per_second = sample.requests_per_second,
            "Benchmark measured"
        );

        if let Some(store) = self.store.as_ref().filter(|_| policy.persists()) {
            let record = metrics::record(sample, endpoint, DEFAULT_METHOD);
            if let Err(e) = metrics::persist(store.as_ref(), &record).await {
                tracing::error!(
                    endpoint = %endpoint,
                    engine = store.engine(),
                    error = %e,
                    "Failed to persist metrics record"
                );
                telemetry::PERSIST_FAILURES
                    .with_label_values(&[endpoint])
                    .inc();
            }
        }

        sample
    }

    fn count_run(&self, endpoint: &str, outcome: &str) {
        telemetry::BENCHMARK_RUNS
            .with_label_values(&[endpoint, &self.policy.to_string(), outcome])
            .inc();
    }
}
