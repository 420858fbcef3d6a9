// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `pulse records` command - List and export persisted metrics records.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use pulsebench_core::metrics;
use pulsebench_core::store;
use pulsebench_core::MetricsRecord;
use thiserror::Error;

use super::{load_config, CommandResult};

/// Errors that can occur while exporting records.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write export file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize records: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub async fn execute(
    config_path: Option<&Path>,
    endpoint: Option<&str>,
    export: Option<&Path>,
) -> CommandResult {
    let config = load_config(config_path)?;
    let store = store::open(&config.store)?;

    let records = filter_by_endpoint(metrics::load_records(store.as_ref()).await?, endpoint);

    if let Some(path) = export {
        export_records(path, &records)?;
        println!("Exported {} record(s) to {}", records.len(), path.display());
        return Ok(());
    }

    if records.is_empty() {
        println!("No metrics records stored.");
        return Ok(());
    }

    println!(
        "{:<10} {:<6} {:>12} {:>14} {:>14} {:>18}",
        "ENDPOINT", "METHOD", "LATENCY (s)", "REQ/S", "MEMORY (B)", "TIMESTAMP"
    );
    for record in &records {
        println!(
            "{:<10} {:<6} {:>12.6} {:>14.3} {:>14} {:>18.3}",
            record.endpoint,
            record.method,
            record.metrics.latency,
            record.metrics.requests_per_second,
            record.metrics.memory,
            record.timestamp
        );
    }
    println!();
    println!("Total: {} record(s)", records.len());

    Ok(())
}

fn filter_by_endpoint(records: Vec<MetricsRecord>, endpoint: Option<&str>) -> Vec<MetricsRecord> {
    match endpoint {
        Some(endpoint) => records
            .into_iter()
            .filter(|record| record.endpoint == endpoint)
            .collect(),
        None => records,
    }
}

/// Write records as pretty JSON, creating parent directories as needed.
pub fn export_records(path: &Path, records: &[MetricsRecord]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}
