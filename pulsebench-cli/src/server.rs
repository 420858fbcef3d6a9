// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! HTTP/WebSocket front end.
//!
//! Every benchmark route triggers one instrumented fan-out. HTTP routes carry
//! the metrics in the `x-metrics` response header; WebSocket routes send them
//! as a final `{"x-metrics": ...}` text frame before closing.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, Response, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use pulsebench_core::metrics::{self, METRICS_HEADER};
use pulsebench_core::store::DocumentStore;
use pulsebench_core::{
    telemetry, BenchError, Benchmark, BenchmarkOutcome, BenchmarkSuite, MessageSink, OutboundFrame,
    Policy, SinkError,
};

use crate::harness::Harness;

/// Frames buffered between the fan-out and the socket writer.
const WS_QUEUE_DEPTH: usize = 1024;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    stateful: Arc<BenchmarkSuite>,
    stateless: Arc<BenchmarkSuite>,
    store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn from_harness(harness: &Harness) -> Self {
        Self {
            stateful: Arc::new(harness.suite(Policy::Stateful)),
            stateless: Arc::new(harness.suite(Policy::Stateless)),
            store: Arc::clone(&harness.store),
        }
    }
}

#[derive(Debug, Error)]
enum ApiError {
    #[error(transparent)]
    Bench(#[from] BenchError),

    #[error("Response encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Response build failed: {0}")]
    Http(#[from] axum::http::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::Bench(BenchError::SubRequest(_)) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/http", get(stateful_http))
        .route("/ws", get(stateful_ws))
        .route("/database", get(stateful_database))
        .route("/stateless/http", get(stateless_http))
        .route("/stateless/ws", get(stateless_ws))
        .route("/stateless/database", get(stateless_database))
        .route("/stateless/synthesize", get(stateless_synthesize))
        .route("/records", get(records))
        .route("/metrics", get(prometheus_metrics))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl+C.
pub async fn serve(
    harness: &Harness,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    telemetry::init();
    let app = router(AppState::from_harness(harness));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Pulsebench listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello World" }))
}

async fn stateful_http(State(state): State<AppState>) -> Result<Response<Body>, ApiError> {
    outcome_response(state.stateful.http().await?)
}

async fn stateful_database(State(state): State<AppState>) -> Result<Response<Body>, ApiError> {
    outcome_response(state.stateful.database().await?)
}

async fn stateless_http(State(state): State<AppState>) -> Result<Response<Body>, ApiError> {
    outcome_response(state.stateless.http().await?)
}

async fn stateless_database(State(state): State<AppState>) -> Result<Response<Body>, ApiError> {
    outcome_response(state.stateless.database().await?)
}

async fn stateless_synthesize(State(state): State<AppState>) -> Result<Response<Body>, ApiError> {
    outcome_response(state.stateless.synthesize().await?)
}

async fn stateful_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| websocket_session(socket, state.stateful))
}

async fn stateless_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| websocket_session(socket, state.stateless))
}

async fn records(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let records = metrics::load_records(state.store.as_ref())
        .await
        .map_err(BenchError::from)?;
    Ok(Json(records))
}

async fn prometheus_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        telemetry::gather_text(),
    )
}

fn outcome_response(outcome: BenchmarkOutcome) -> Result<Response<Body>, ApiError> {
    let body = outcome.body()?;
    let mut builder = Response::builder()
        .status(outcome.status)
        .header(header::CONTENT_TYPE, outcome.media_type);
    for (name, value) in &outcome.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    Ok(builder.body(Body::from(body))?)
}

/// Drive one WebSocket fan-out. The socket's write half is owned by a single
/// writer task fed through a bounded queue, so concurrent sends never
/// interleave frames. Each frame is acked only after the socket write returns.
async fn websocket_session(socket: WebSocket, suite: Arc<BenchmarkSuite>) {
    let (mut sender, _receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<OutboundFrame>(WS_QUEUE_DEPTH);

    let writer = tokio::spawn(async move {
        while let Some(mut frame) = rx.recv().await {
            let text = std::mem::take(&mut frame.text);
            match sender.send(Message::Text(text.into())).await {
                Ok(()) => frame.resolve(Ok(())),
                Err(e) => {
                    tracing::debug!(error = %e, "WebSocket writer stopped");
                    frame.resolve(Err(SinkError(e.to_string())));
                    // Dropping the queue fails every frame still waiting in it.
                    return None;
                }
            }
        }
        Some(sender)
    });

    let final_frame = match suite.websocket(&tx).await {
        Ok(outcome) => {
            let mut frame = Map::new();
            frame.insert(
                METRICS_HEADER.to_string(),
                Value::String(outcome.header(METRICS_HEADER).unwrap_or_default().to_string()),
            );
            Value::Object(frame)
        }
        Err(e) => {
            tracing::warn!(policy = %suite.policy(), error = %e, "WebSocket benchmark failed");
            json!({ "error": e.to_string() })
        }
    };

    if let Err(e) = tx.send_text(final_frame.to_string()).await {
        tracing::debug!(error = %e, "WebSocket closed before the metrics frame");
    }
    drop(tx);

    match writer.await {
        Ok(Some(mut sender)) => {
            if let Err(e) = sender.send(Message::Close(None)).await {
                tracing::debug!(error = %e, "WebSocket close failed");
            }
        }
        Ok(None) => {}
        Err(e) => tracing::error!("WebSocket writer task failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use pulsebench_core::runner::power_message;
    use pulsebench_core::{ConfigLoader, MetricsSample};
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tower::ServiceExt;

    const CONFIG: &str = r#"
probe:
  enabled: false
widths:
  stateful: { http: 0, websocket: 4, database: 2 }
  stateless: { http: 1, websocket: 6, database: 3 }
"#;

    fn app() -> (Router, Arc<dyn DocumentStore>) {
        let config = ConfigLoader::load_string_with_env(CONFIG, |key| match key {
            "HTTP_URL" => Some("http://127.0.0.1:9/items/".to_string()),
            "DATABASE_URL" => Some("memory://".to_string()),
            _ => None,
        })
        .unwrap();
        let harness = Harness::build(config).unwrap();
        let store = Arc::clone(&harness.store);
        (router(AppState::from_harness(&harness)), store)
    }

    async fn get(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn spawn_server(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    /// Text frames received on `path` until the server closes the socket.
    async fn ws_frames(addr: SocketAddr, path: &str) -> Vec<String> {
        let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}{path}"))
            .await
            .unwrap();
        let mut frames = Vec::new();
        let read = async {
            while let Some(message) = socket.next().await {
                match message.unwrap() {
                    WsMessage::Text(text) => frames.push(text.to_string()),
                    WsMessage::Close(_) => break,
                    _ => {}
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(10), read)
            .await
            .unwrap();
        frames
    }

    fn metrics_frame(frame: &str) -> MetricsSample {
        let value: Value = serde_json::from_str(frame).unwrap();
        MetricsSample::parse_header(value[METRICS_HEADER].as_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_root_says_hello() {
        let (app, _) = app();
        let response = get(app, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "message": "Hello World" }));
    }

    #[tokio::test]
    async fn test_stateful_http_zero_width_sets_header_and_persists() {
        let (app, store) = app();
        let response = get(app.clone(), "/http").await;
        assert_eq!(response.status(), StatusCode::OK);

        let header = response
            .headers()
            .get(METRICS_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let sample = MetricsSample::parse_header(&header).unwrap();
        assert!(sample.latency > 0.0);
        assert_eq!(body_json(response).await, json!([]));

        let records = metrics::load_records(store.as_ref()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].endpoint, "http");

        let listed = body_json(get(app, "/records").await).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fan_out_is_bad_gateway() {
        let (app, store) = app();
        let response = get(app, "/stateless/http").await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_json(response).await["error"].is_string());
        assert!(store.find_all("metrics").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stateless_database_returns_entities() {
        let (app, store) = app();
        let response = get(app, "/stateless/database").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(METRICS_HEADER));
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 3);
        assert!(store.find_all("metrics").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stateful_ws_sends_messages_then_metrics() {
        let (app, store) = app();
        let addr = spawn_server(app).await;

        let frames = ws_frames(addr, "/ws").await;
        assert_eq!(frames.len(), 5);
        for frame in &frames[..4] {
            assert!(frame.starts_with(r#"{"id":"#), "unexpected frame {frame}");
        }
        assert!(frames.contains(&r#"{"id":27}"#.to_string()));
        assert!(metrics_frame(&frames[4]).latency > 0.0);

        let records = metrics::load_records(store.as_ref()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].endpoint, "websocket");
    }

    #[tokio::test]
    async fn test_stateless_ws_persists_nothing() {
        let (app, store) = app();
        let addr = spawn_server(app).await;

        let frames = ws_frames(addr, "/stateless/ws").await;
        assert_eq!(frames.len(), 7);
        let mut ids: Vec<&str> = frames[..6].iter().map(String::as_str).collect();
        ids.sort_unstable();
        let mut expected: Vec<String> = (0..6).map(power_message).collect();
        expected.sort_unstable();
        assert_eq!(ids, expected);
        assert!(metrics_frame(&frames[6]).network_speed.is_none());

        assert!(store.find_all("metrics").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cors_exposes_headers() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::ORIGIN, "http://dashboard.local")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_EXPOSE_HEADERS));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_exposes_counters() {
        let (app, _) = app();
        telemetry::init();
        let response = get(app, "/metrics").await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("pulsebench_probe_failures_total"));
    }
}
