// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline orchestration.
//
// Order of one run:
//
//   source check -> session -> strip -> insert -> save -> reopen -> close
//
// A missing source or a failed session acquisition aborts the run with an
// error. Every later stage produces a `StageOutcome`; a failure either lets
// the run continue (`StagePolicy::Continue`) or skips the remaining stages
// up to close (`StagePolicy::Halt`). Close runs whenever a session was
// acquired. Reopen is only attempted after a successful save.

use std::path::Path;

use imgcad_core::config::{PipelineConfig, StagePolicy};
use imgcad_core::error::{ImgcadError, Result};
use imgcad_core::paths::OutputPaths;
use imgcad_core::types::{Point3, RunReport, StageKind, StageOutcome};
use imgcad_host::CadHost;
use tracing::{info, info_span, warn};

use crate::stages;

/// Runs the image-to-drawing workflow with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run against `source`, deriving output paths from the current time.
    pub fn run(&self, host: &dyn CadHost, source: &Path) -> Result<RunReport> {
        ensure_source(source)?;
        self.run_with_paths(host, OutputPaths::derive(source))
    }

    /// Run with pre-derived output paths.
    pub fn run_with_paths(&self, host: &dyn CadHost, paths: OutputPaths) -> Result<RunReport> {
        ensure_source(&paths.source)?;

        let mut run = Run::new(paths);
        let span = info_span!(
            "run",
            run_id = %run.report.run_id,
            source = %run.report.paths.source.display()
        );
        let _guard = span.enter();

        let (mut session, mut document) = stages::open_session(host)?;

        // Strip
        let stripped = stages::strip_background(&run.report.paths);
        if let Some(image) = run.settle(StageKind::Strip, self.config.strip_policy, stripped) {
            run.report.pixel_digest = Some(image.digest());
        }

        // Insert
        if run.proceed(StageKind::Insert) {
            let inserted =
                stages::insert_image(document.as_mut(), &run.report.paths.transparent, Point3::ORIGIN);
            if let Some(scale) = run.settle(StageKind::Insert, self.config.insert_policy, inserted) {
                run.report.raster_scale = Some(scale);
            }
        }

        // Save, then reopen only what was saved.
        let mut saved = false;
        if run.proceed(StageKind::Save) {
            let drawing = run.report.paths.drawing.clone();
            let result = stages::save_drawing(document.as_mut(), &drawing, self.config.on_collision);
            saved = run
                .settle(StageKind::Save, self.config.save_policy, result)
                .is_some();
        }

        if run.proceed(StageKind::Reopen) {
            if saved {
                let drawing = run.report.paths.drawing.clone();
                let reopened = stages::reopen_drawing(session.as_mut(), &drawing);
                // The reopened document stays open in the host.
                run.settle(StageKind::Reopen, StagePolicy::Continue, reopened);
            } else {
                run.skip(StageKind::Reopen, "drawing was not saved");
            }
        }

        // Close is unconditional once a session exists.
        let closed = stages::close_document(document.as_mut());
        run.settle(StageKind::Close, StagePolicy::Continue, closed);
        info!("CAD session released");

        let report = run.report;
        if report.is_success() {
            info!(drawing = %report.paths.drawing.display(), "Conversion complete");
        } else {
            warn!(failed = report.failures().count(), "Conversion finished with failures");
        }
        Ok(report)
    }
}

/// Run `source` through a pipeline built from `config`.
pub fn convert_image_to_drawing(
    host: &dyn CadHost,
    source: &Path,
    config: PipelineConfig,
) -> Result<RunReport> {
    Pipeline::new(config).run(host, source)
}

fn ensure_source(source: &Path) -> Result<()> {
    if source.exists() {
        Ok(())
    } else {
        Err(ImgcadError::SourceNotFound(source.to_path_buf()))
    }
}

/// Mutable state of one run.
struct Run {
    report: RunReport,
    /// First stage whose failure halted the run.
    halted_by: Option<StageKind>,
}

impl Run {
    fn new(paths: OutputPaths) -> Self {
        Self {
            report: RunReport::new(paths),
            halted_by: None,
        }
    }

    /// Whether `stage` should run; records it as skipped if not.
    fn proceed(&mut self, stage: StageKind) -> bool {
        match self.halted_by {
            None => true,
            Some(cause) => {
                self.skip(stage, &format!("{cause} stage failed"));
                false
            }
        }
    }

    fn skip(&mut self, stage: StageKind, reason: &str) {
        info!(%stage, reason, "Stage skipped");
        self.report.record(
            stage,
            StageOutcome::Skipped {
                reason: reason.to_owned(),
            },
        );
    }

    /// Record `result` for `stage` and apply `policy` on failure.
    fn settle<T>(&mut self, stage: StageKind, policy: StagePolicy, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.report.record(stage, StageOutcome::Succeeded);
                Some(value)
            }
            Err(err) => {
                warn!(%stage, error = %err, "Stage failed");
                self.report.record(
                    stage,
                    StageOutcome::Failed {
                        error: err.to_string(),
                    },
                );
                if policy == StagePolicy::Halt && self.halted_by.is_none() {
                    self.halted_by = Some(stage);
                }
                None
            }
        }
    }
}
