// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Process-wide wiring: one HTTP client, one store, one probe.

use std::sync::Arc;

use pulsebench_core::probe;
use pulsebench_core::store::{self, DocumentStore};
use pulsebench_core::{BenchmarkRunner, BenchmarkSuite, Config, NetworkProbe, Policy};
use reqwest::Client;

/// Shared dependencies built once from validated configuration.
#[derive(Debug, Clone)]
pub struct Harness {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    runner: Arc<BenchmarkRunner>,
    probe: Arc<dyn NetworkProbe>,
}

impl Harness {
    pub fn build(config: Config) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let client = Client::builder().build()?;
        let store = store::open(&config.store)?;
        let probe = probe::from_config(client.clone(), &config.probe);

        let runner = BenchmarkRunner::new(client, config.target_url.clone(), Arc::clone(&store))
            .with_fan_out_timeout(config.fan_out_timeout);

        tracing::info!(
            target = %runner.target(),
            engine = store.engine(),
            probe_enabled = config.probe.enabled,
            "Harness ready"
        );

        Ok(Self {
            config,
            store,
            runner: Arc::new(runner),
            probe,
        })
    }

    /// Benchmark suite for `policy` with its configured widths.
    pub fn suite(&self, policy: Policy) -> BenchmarkSuite {
        BenchmarkSuite::for_policy(
            policy,
            &self.config,
            Arc::clone(&self.runner),
            Arc::clone(&self.probe),
        )
    }
}
