// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `pulse validate` command - Validate configuration.

use std::path::Path;

use pulsebench_core::{Config, Policy, PolicyWidths};

use super::{load_config, CommandResult};

pub async fn execute(file: Option<&Path>) -> CommandResult {
    match file {
        Some(path) => tracing::info!(file = %path.display(), "Validating configuration"),
        None => tracing::info!("Validating configuration from environment"),
    }

    match load_config(file) {
        Ok(config) => {
            print_config(&config);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}

fn print_config(config: &Config) {
    println!("✓ Configuration is valid");
    println!();
    println!("Target:");
    println!("  HTTP URL:      {}", config.target_url);
    println!("  Database URL:  {}", config.database_url);
    println!("  Bind:          {}", config.bind);
    match config.fan_out_timeout {
        Some(timeout) => println!("  Fan-out limit: {}ms", timeout.as_millis()),
        None => println!("  Fan-out limit: none"),
    }
    println!();
    println!("Probe:");
    if config.probe.enabled {
        println!(
            "  {} (timeout {}ms)",
            config.probe.url,
            config.probe.timeout.as_millis()
        );
    } else {
        println!("  disabled");
    }
    println!();
    println!("Fan-out widths:");
    for policy in [Policy::Stateful, Policy::Stateless] {
        print_widths(policy, config.widths.for_policy(policy));
    }
}

fn print_widths(policy: Policy, widths: PolicyWidths) {
    println!(
        "  - {:<9} http: {:<6} websocket: {:<6} database: {}",
        policy.to_string(),
        widths.http.value(),
        widths.websocket.value(),
        widths.database.value()
    );
}
