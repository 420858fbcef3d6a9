// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `pulse serve` command - Start the HTTP/WebSocket server.

use std::net::SocketAddr;
use std::path::Path;

use pulsebench_core::ConfigError;

use super::{load_config, CommandResult};
use crate::harness::Harness;
use crate::server;

pub async fn execute(config_path: Option<&Path>, bind: Option<&str>) -> CommandResult {
    let config = load_config(config_path)?;

    let addr: SocketAddr = match bind {
        Some(bind) => bind.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::InvalidValue {
                field: "bind",
                value: bind.to_string(),
                reason: e.to_string(),
            }
        })?,
        None => config.bind,
    };

    let harness = Harness::build(config)?;
    server::serve(&harness, addr).await
}
