// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::process::ExitCode;

use anyhow::Context;
use the_conveyor::config::{load_and_validate_config, RuntimeBuilder};
use the_conveyor::engine::RunResult;
use tracing_subscriber::EnvFilter;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_summary(result: &RunResult) -> anyhow::Result<()> {
    println!();
    println!(
        "{:<24} {:>5} {:<10} {:>10} {:>10} {:>10}",
        "step", "copy", "state", "read", "written", "rejected"
    );
    println!("{}", "─".repeat(74));
    for status in &result.statuses {
        println!(
            "{:<24} {:>5} {:<10} {:>10} {:>10} {:>10}",
            status.step,
            status.copy,
            status.state.to_string(),
            status.lines_read,
            status.lines_written,
            status.lines_rejected
        );
        if let Some(error) = &status.error {
            println!("    ↳ {}", error);
        }
    }
    println!("{}", "─".repeat(74));
    println!("errors: {}   duration: {} ms", result.errors, result.duration_ms);
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(result).context("could not render run result")?
    );
    Ok(())
}

fn program_name(args: &[String]) -> &str {
    args.first().map_or("the-conveyor", String::as_str)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_logging("info");

    let args: Vec<String> = env::args().collect();
    let program = program_name(&args);
    let Some(config_file) = args.get(1) else {
        eprintln!("Usage: {} <transformation.yaml|toml>", program);
        eprintln!("Example: {} demos/range-check.yaml", program);
        return Ok(ExitCode::from(2));
    };

    let config = load_and_validate_config(config_file)
        .with_context(|| format!("could not load {}", config_file))?;
    let transformation = RuntimeBuilder::build(&config)
        .with_context(|| format!("could not prepare {}", config_file))?;

    let result = transformation
        .execute()
        .await
        .with_context(|| format!("could not run {}", config_file))?;
    print_summary(&result)?;

    if result.succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
