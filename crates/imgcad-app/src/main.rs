// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// imgcad: strip a white background and place the image in an AutoCAD drawing.
//
// Entry point. Initialises logging, parses the command line, picks the CAD
// host, runs the pipeline once, and maps the outcome to an exit code.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use imgcad_core::error::Result;
use imgcad_core::types::{RunReport, StageOutcome};
use imgcad_host::{CadHost, RecordingHost, host_for_platform};
use imgcad_pipeline::Pipeline;

use cli::Cli;

/// Every stage succeeded.
const EXIT_OK: u8 = 0;
/// The run finished but at least one stage failed.
const EXIT_STAGE_FAILED: u8 = 1;
/// The run could not start.
const EXIT_FATAL: u8 = 2;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!(image = %cli.image.display(), dry_run = cli.dry_run, "imgcad starting");

    match run(&cli) {
        Ok(report) => ExitCode::from(exit_code(&report)),
        Err(e) => {
            tracing::error!(error = %e, "An error occurred");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(cli: &Cli) -> Result<RunReport> {
    let config = cli.pipeline_config()?;

    let recorder = RecordingHost::new();
    let host: Box<dyn CadHost> = if cli.dry_run {
        Box::new(recorder.clone())
    } else {
        host_for_platform(&config.host)
    };
    tracing::info!(host = host.name(), "CAD host selected");

    let report = Pipeline::new(config).run(host.as_ref(), &cli.image)?;

    if cli.dry_run {
        for call in recorder.calls() {
            tracing::info!(?call, "recorded host call");
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(report)
}

fn exit_code(report: &RunReport) -> u8 {
    if report.is_success() {
        EXIT_OK
    } else {
        EXIT_STAGE_FAILED
    }
}

fn print_summary(report: &RunReport) {
    println!("run {}", report.run_id);
    for record in &report.stages {
        match &record.outcome {
            StageOutcome::Succeeded => println!("  {:<7} ok", record.stage),
            StageOutcome::Failed { error } => println!("  {:<7} FAILED  {error}", record.stage),
            StageOutcome::Skipped { reason } => {
                println!("  {:<7} skipped ({reason})", record.stage)
            }
        }
    }
    println!("transparent image: {}", report.paths.transparent.display());
    println!("drawing:           {}", report.paths.drawing.display());
}
