// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Result of one benchmark run and the metadata bag metrics are attached to.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Media type of every benchmark body.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Anything the instrumentation wrapper can annotate with a header.
pub trait MetricsCarrier {
    fn attach_metrics(&mut self, header: &str, value: String);
}

/// Aggregated result of a fan-out: one JSON value per sub-request, in
/// dispatch order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkOutcome {
    pub status: u16,
    pub media_type: &'static str,
    pub results: Vec<Value>,
    pub headers: BTreeMap<String, String>,
}

impl BenchmarkOutcome {
    /// A successful JSON outcome.
    pub fn ok(results: Vec<Value>) -> Self {
        Self {
            status: 200,
            media_type: JSON_MEDIA_TYPE,
            results,
            headers: BTreeMap::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// JSON body as sent to the caller.
    pub fn body(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.results)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl MetricsCarrier for BenchmarkOutcome {
    fn attach_metrics(&mut self, header: &str, value: String) {
        self.headers.insert(header.to_string(), value);
    }
}
