// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `pulse run` command - Run one benchmark in process.
//!
//! Useful to check a target before putting the server in front of it. The
//! metrics header is parsed back and printed field by field.

use std::path::Path;

use pulsebench_core::{
    Benchmark, BenchmarkKind, BenchmarkOutcome, FanOutWidth, MetricsSample, Policy,
    METRICS_HEADER,
};

use super::{load_config, CommandResult};
use crate::harness::Harness;
use crate::RunKind;

pub async fn execute(
    config_path: Option<&Path>,
    kind: RunKind,
    stateful: bool,
    width: Option<usize>,
) -> CommandResult {
    let config = load_config(config_path)?;
    let harness = Harness::build(config)?;

    let policy = if stateful {
        Policy::Stateful
    } else {
        Policy::Stateless
    };
    let width_kind = match kind {
        RunKind::Http => BenchmarkKind::Http,
        RunKind::Database | RunKind::Synthesize => BenchmarkKind::Database,
    };

    let mut suite = harness.suite(policy);
    if let Some(width) = width {
        suite = suite.with_width(width_kind, FanOutWidth::new(width)?);
    }

    tracing::info!(
        kind = ?kind,
        policy = %policy,
        width = suite.widths().for_kind(width_kind).value(),
        "Running benchmark"
    );

    let outcome = match kind {
        RunKind::Http => suite.http().await?,
        RunKind::Database => suite.database().await?,
        RunKind::Synthesize => suite.synthesize().await?,
    };

    print_outcome(&outcome)?;
    Ok(())
}

fn print_outcome(outcome: &BenchmarkOutcome) -> CommandResult {
    let header = outcome.header(METRICS_HEADER).unwrap_or_default();
    let sample = MetricsSample::parse_header(header)?;

    println!("Results:              {}", outcome.len());
    println!("Latency:              {:.6}s", sample.latency);
    println!("Requests per second:  {:.3}", sample.requests_per_second);
    println!("Network time:         {:.6}s", sample.network_time);
    match sample.network_speed {
        Some(speed) => println!("Network speed:        {:.0} B/s", speed),
        None => println!("Network speed:        unavailable"),
    }
    println!("Memory delta:         {} B", sample.memory);
    println!("Logical CPU delta:    {}", sample.cpu_cycle);
    println!();
    println!("{}: {}", METRICS_HEADER, header);
    Ok(())
}
