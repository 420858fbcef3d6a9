// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! The benchmark kinds as one capability set, per policy.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{Config, PolicyWidths};
use crate::entity::SyntheticEntity;
use crate::error::{BenchError, BenchResult, StorageError, SubRequestError};
use crate::instrument::Instrumenter;
use crate::outcome::BenchmarkOutcome;
use crate::probe::NetworkProbe;
use crate::runner::{BenchmarkRunner, MessageSink};
use crate::types::{BenchmarkKind, FanOutWidth, Policy};

/// Endpoint id of the sequential entity-synthesis benchmark.
pub const SYNTHESIZE_ENDPOINT: &str = "synthesize";

/// Benchmark operations exposed to the transport layer.
#[async_trait]
pub trait Benchmark: Send + Sync {
    /// HTTP fan-out against the target.
    async fn http(&self) -> BenchResult<BenchmarkOutcome>;

    /// Message fan-out over an already-open WebSocket.
    async fn websocket(&self, sink: &dyn MessageSink) -> BenchResult<BenchmarkOutcome>;

    /// Entity writes followed by a full collection read.
    async fn database(&self) -> BenchResult<BenchmarkOutcome>;
}

/// [`Benchmark`] implementation for one policy.
#[derive(Debug, Clone)]
pub struct BenchmarkSuite {
    instrumenter: Instrumenter,
    runner: Arc<BenchmarkRunner>,
    widths: PolicyWidths,
}

impl BenchmarkSuite {
    /// Persisting suite; records go to the runner's store.
    pub fn stateful(
        runner: Arc<BenchmarkRunner>,
        probe: Arc<dyn NetworkProbe>,
        widths: PolicyWidths,
    ) -> Self {
        let instrumenter = Instrumenter::stateful(probe, Arc::clone(runner.store()));
        Self {
            instrumenter,
            runner,
            widths,
        }
    }

    pub fn stateless(
        runner: Arc<BenchmarkRunner>,
        probe: Arc<dyn NetworkProbe>,
        widths: PolicyWidths,
    ) -> Self {
        Self {
            instrumenter: Instrumenter::stateless(probe),
            runner,
            widths,
        }
    }

    /// Suite for `policy` with the widths configured for it.
    pub fn for_policy(
        policy: Policy,
        config: &Config,
        runner: Arc<BenchmarkRunner>,
        probe: Arc<dyn NetworkProbe>,
    ) -> Self {
        let widths = config.widths.for_policy(policy);
        match policy {
            Policy::Stateful => Self::stateful(runner, probe, widths),
            Policy::Stateless => Self::stateless(runner, probe, widths),
        }
    }

    /// Override the width of one kind.
    pub fn with_width(mut self, kind: BenchmarkKind, width: FanOutWidth) -> Self {
        match kind {
            BenchmarkKind::Http => self.widths.http = width,
            BenchmarkKind::Websocket => self.widths.websocket = width,
            BenchmarkKind::Database => self.widths.database = width,
        }
        self
    }

    pub fn policy(&self) -> Policy {
        self.instrumenter.policy()
    }

    pub fn widths(&self) -> PolicyWidths {
        self.widths
    }

    /// Generate `widths.database` synthetic entities inline on the calling
    /// thread, without touching the store. Measured with the blocking
    /// variant, so never persisted regardless of policy.
    pub async fn synthesize(&self) -> BenchResult<BenchmarkOutcome> {
        let width = self.widths.database.value();
        let measured = self
            .instrumenter
            .instrument_blocking(SYNTHESIZE_ENDPOINT, || {
                let results = (0..width)
                    .map(|_| serde_json::to_value(SyntheticEntity::random()))
                    .collect::<Result<Vec<Value>, _>>()
                    .map_err(|e| SubRequestError::Storage(StorageError::Encoding(e)))?;
                Ok(BenchmarkOutcome::ok(results))
            })
            .await?;
        Ok(measured.output)
    }
}

#[async_trait]
impl Benchmark for BenchmarkSuite {
    async fn http(&self) -> BenchResult<BenchmarkOutcome> {
        let width = self.widths.http;
        self.instrumenter
            .instrument(BenchmarkKind::Http.endpoint(), || async move {
                let results = self.runner.http_fan_out(width).await?;
                Ok::<_, BenchError>(BenchmarkOutcome::ok(results))
            })
            .await
    }

    async fn websocket(&self, sink: &dyn MessageSink) -> BenchResult<BenchmarkOutcome> {
        let width = self.widths.websocket;
        self.instrumenter
            .instrument(BenchmarkKind::Websocket.endpoint(), || async move {
                let results = self.runner.websocket_fan_out(sink, width).await?;
                Ok::<_, BenchError>(BenchmarkOutcome::ok(results))
            })
            .await
    }

    async fn database(&self) -> BenchResult<BenchmarkOutcome> {
        let width = self.widths.database;
        self.instrumenter
            .instrument(BenchmarkKind::Database.endpoint(), || async move {
                let results = self.runner.database_fan_out(width).await?;
                Ok::<_, BenchError>(BenchmarkOutcome::ok(results))
            })
            .await
    }
}
