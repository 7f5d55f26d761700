// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line interface.

use std::path::PathBuf;

use clap::Parser;
use imgcad_core::config::StagePolicy;
use imgcad_core::error::Result;
use imgcad_core::PipelineConfig;

/// Strip the white background from an image and place it in an AutoCAD drawing
#[derive(Parser, Debug)]
#[command(name = "imgcad", version)]
#[command(about = "Insert a background-stripped raster into a new AutoCAD drawing", long_about = None)]
pub struct Cli {
    /// Source raster (JPEG, PNG, ...)
    pub image: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Drive an in-memory recording host instead of AutoCAD
    #[arg(long)]
    pub dry_run: bool,

    /// Stop the CAD stages after the first failure (close still runs)
    #[arg(long)]
    pub halt_on_error: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Configuration from `--config` (or defaults) with flag overrides applied.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        Ok(if self.halt_on_error {
            config.with_all_policies(StagePolicy::Halt)
        } else {
            config
        })
    }
}
