// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Concurrent fan-out against the target.
//!
//! Each fan-out dispatches N independent sub-operations at once and joins
//! them with `try_join_all`: slot `i` of the result is the `i`-th dispatched
//! sub-request, and the first failure aborts the whole batch. Remaining
//! in-flight sub-requests are dropped, no partial result is returned.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use num_bigint::BigUint;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::entity::SyntheticEntity;
use crate::error::SubRequestError;
use crate::store::{self, Document, DocumentStore};
use crate::telemetry;
use crate::types::{BenchmarkKind, FanOutWidth, TargetUrl};

/// The shared connection refused a message.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

/// Serialized send path onto one shared WebSocket connection.
///
/// `send_text` resolves only once the frame has been written to the socket
/// (or the write failed), never on mere enqueue.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send_text(&self, text: String) -> Result<(), SinkError>;
}

/// A text frame handed to the connection writer, with the channel the
/// writer resolves once the frame is on the wire.
#[derive(Debug)]
pub struct OutboundFrame {
    pub text: String,
    pub ack: oneshot::Sender<Result<(), SinkError>>,
}

impl OutboundFrame {
    pub fn new(text: String) -> (Self, oneshot::Receiver<Result<(), SinkError>>) {
        let (ack, written) = oneshot::channel();
        (Self { text, ack }, written)
    }

    /// Report the write result back to the sender. A sender that stopped
    /// waiting is not an error.
    pub fn resolve(self, result: Result<(), SinkError>) {
        let _ = self.ack.send(result);
    }
}

/// Bounded queue drained by a single writer task that owns the socket.
#[async_trait]
impl MessageSink for mpsc::Sender<OutboundFrame> {
    async fn send_text(&self, text: String) -> Result<(), SinkError> {
        let (frame, written) = OutboundFrame::new(text);
        mpsc::Sender::send(self, frame)
            .await
            .map_err(|_| SinkError("connection writer closed".to_string()))?;
        written
            .await
            .map_err(|_| SinkError("frame dropped before it was written".to_string()))?
    }
}

/// `{"id": i**i}` with the exact integer value.
pub fn power_message(index: usize) -> String {
    let base = BigUint::from(index);
    let exponent = u32::try_from(index).unwrap_or(u32::MAX);
    format!(r#"{{"id":{}}}"#, base.pow(exponent))
}

/// Issues fan-outs against one target with shared client and store.
#[derive(Debug, Clone)]
pub struct BenchmarkRunner {
    client: Client,
    target: TargetUrl,
    store: Arc<dyn DocumentStore>,
    fan_out_timeout: Option<Duration>,
}

impl BenchmarkRunner {
    pub fn new(client: Client, target: TargetUrl, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            client,
            target,
            store,
            fan_out_timeout: None,
        }
    }

    /// Abort any fan-out that runs longer than `timeout`.
    pub fn with_fan_out_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fan_out_timeout = timeout;
        self
    }

    pub fn target(&self) -> &TargetUrl {
        &self.target
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// GET `{target}{i}` for every `i < width`; each slot is the parsed body.
    pub async fn http_fan_out(&self, width: FanOutWidth) -> Result<Vec<Value>, SubRequestError> {
        let requests = (0..width.value()).map(|i| self.fetch(self.target.for_index(i)));
        self.join(BenchmarkKind::Http, width, try_join_all(requests))
            .await
    }

    /// Send `{"id": i**i}` for every `i < width` over the shared sink. Nothing
    /// is awaited from the peer, so every slot is `null`.
    pub async fn websocket_fan_out(
        &self,
        sink: &dyn MessageSink,
        width: FanOutWidth,
    ) -> Result<Vec<Value>, SubRequestError> {
        let sends = (0..width.value()).map(|i| async move {
            sink.send_text(power_message(i))
                .await
                .map(|_| Value::Null)
                .map_err(|e| SubRequestError::WebSocketSend {
                    index: i,
                    reason: e.to_string(),
                })
        });
        self.join(BenchmarkKind::Websocket, width, try_join_all(sends))
            .await
    }

    /// Save `width` fresh synthetic entities concurrently, then return the
    /// whole entity collection, including entities from earlier runs.
    pub async fn database_fan_out(&self, width: FanOutWidth) -> Result<Vec<Value>, SubRequestError> {
        let store = self.store.as_ref();
        let writes = (0..width.value()).map(|_| async move {
            let entity = SyntheticEntity::random();
            store::save_document(store, &entity).await
        });
        self.join(BenchmarkKind::Database, width, async {
            try_join_all(writes).await?;
            Ok::<_, SubRequestError>(store.find_all(SyntheticEntity::COLLECTION).await?)
        })
        .await
    }

    async fn fetch(&self, url: String) -> Result<Value, SubRequestError> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SubRequestError::HttpTransport {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubRequestError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_decode() {
                SubRequestError::HttpDecode {
                    url,
                    reason: e.to_string(),
                }
            } else {
                SubRequestError::HttpTransport {
                    url,
                    reason: e.to_string(),
                }
            }
        })
    }

    async fn join<F>(
        &self,
        kind: BenchmarkKind,
        width: FanOutWidth,
        fan_out: F,
    ) -> Result<Vec<Value>, SubRequestError>
    where
        F: Future<Output = Result<Vec<Value>, SubRequestError>>,
    {
        tracing::debug!(kind = %kind, width = width.value(), "Dispatching fan-out");
        telemetry::SUB_REQUESTS
            .with_label_values(&[kind.endpoint()])
            .inc_by(width.value() as u64);

        let result = match self.fan_out_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fan_out).await.unwrap_or_else(|_| {
                Err(SubRequestError::DeadlineExceeded {
                    width: width.value(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }),
            None => fan_out.await,
        };

        if let Err(e) = &result {
            tracing::warn!(kind = %kind, width = width.value(), error = %e, "Fan-out aborted");
        }
        result
    }
}
