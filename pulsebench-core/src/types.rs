// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! All types validate their invariants at creation time, so a loaded
//! configuration can be used without re-checking.

use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound on a single fan-out.
pub const MAX_FAN_OUT_WIDTH: usize = 100_000;

/// Validated base URL of the system under test.
/// Sub-request `i` is sent to `{base}{i}`, so the base is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl(String);

impl TargetUrl {
    /// Create a new TargetUrl, requiring an absolute http(s) URL.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();

        let parsed = Url::parse(&url).map_err(|e| ConfigError::InvalidValue {
            field: "http_url",
            value: url.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "http_url",
                value: url,
                reason: "Scheme must be http or https".to_string(),
            });
        }

        Ok(Self(url))
    }

    /// URL of the `index`-th sub-request.
    pub fn for_index(&self, index: usize) -> String {
        format!("{}{}", self.0, index)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated fan-out width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct FanOutWidth(usize);

impl FanOutWidth {
    /// Create a new FanOutWidth with bounds validation. Zero is allowed.
    pub fn new(width: usize) -> Result<Self, ConfigError> {
        if width > MAX_FAN_OUT_WIDTH {
            return Err(ConfigError::InvalidValue {
                field: "width",
                value: width.to_string(),
                reason: format!("Fan-out width must not exceed {}", MAX_FAN_OUT_WIDTH),
            });
        }
        Ok(Self(width))
    }

    /// Create without validation (for built-in defaults and tests).
    pub const fn new_unchecked(width: usize) -> Self {
        Self(width)
    }

    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for FanOutWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<usize> for FanOutWidth {
    type Error = ConfigError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FanOutWidth> for usize {
    fn from(width: FanOutWidth) -> Self {
        width.0
    }
}

/// Kind of benchmark workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkKind {
    Http,
    Websocket,
    Database,
}

impl BenchmarkKind {
    /// Identifier recorded as `endpoint` on persisted metrics.
    pub const fn endpoint(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Websocket => "websocket",
            Self::Database => "test_db",
        }
    }
}

impl fmt::Display for BenchmarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchmarkKind::Http => write!(f, "http"),
            BenchmarkKind::Websocket => write!(f, "websocket"),
            BenchmarkKind::Database => write!(f, "database"),
        }
    }
}

/// Whether a benchmark's metrics are persisted in addition to being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    Stateful,
    Stateless,
}

impl Policy {
    pub const fn persists(&self) -> bool {
        matches!(self, Self::Stateful)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Stateful => write!(f, "stateful"),
            Policy::Stateless => write!(f, "stateless"),
        }
    }
}
