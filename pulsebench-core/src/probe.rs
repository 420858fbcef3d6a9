// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Reference network-speed probe.
//!
//! After every instrumented operation one request is issued to a fixed,
//! externally reachable resource; its payload size over elapsed time is the
//! reported `network_speed`. The probe is independent of the target under
//! test.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;

use crate::config::ProbeConfig;
use crate::error::ProbeError;

/// Measures achievable network throughput in bytes per second.
#[async_trait]
pub trait NetworkProbe: Send + Sync + fmt::Debug {
    async fn measure(&self) -> Result<f64, ProbeError>;
}

/// Probe that downloads a fixed URL with a deadline.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(client: Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl NetworkProbe for HttpProbe {
    async fn measure(&self) -> Result<f64, ProbeError> {
        let timeout_ms = self.timeout.as_millis() as u64;
        let transport = |e: reqwest::Error| {
            if e.is_timeout() {
                ProbeError::Timeout {
                    url: self.url.clone(),
                    timeout_ms,
                }
            } else {
                ProbeError::Transport {
                    url: self.url.clone(),
                    reason: e.to_string(),
                }
            }
        };

        let start = Instant::now();
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(ProbeError::Status {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }

        let payload = response.bytes().await.map_err(transport)?;
        let elapsed = start.elapsed().as_secs_f64();

        // Keep the speed finite.
        Ok(payload.len() as f64 / elapsed.max(f64::EPSILON))
    }
}

/// Probe used when `probe.enabled` is false; always unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledProbe;

#[async_trait]
impl NetworkProbe for DisabledProbe {
    async fn measure(&self) -> Result<f64, ProbeError> {
        Err(ProbeError::Disabled)
    }
}

/// Build the probe described by the configuration.
pub fn from_config(client: Client, config: &ProbeConfig) -> Arc<dyn NetworkProbe> {
    if config.enabled {
        let probe = HttpProbe::new(client, config.url.clone(), config.timeout);
        tracing::debug!(
            url = probe.url(),
            timeout_ms = config.timeout.as_millis() as u64,
            "Network probe enabled"
        );
        Arc::new(probe)
    } else {
        Arc::new(DisabledProbe)
    }
}
