// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

use std::path::Path;

use pulsebench_core::{Config, ConfigLoader};

pub mod records;
pub mod run;
pub mod serve;
pub mod validate;

pub type CommandResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Load configuration from the given file, or from the environment alone.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config, pulsebench_core::ConfigError> {
    if let Some(path) = path {
        tracing::debug!(path = %path.display(), "Loading configuration file");
    }
    ConfigLoader::load(path)
}
