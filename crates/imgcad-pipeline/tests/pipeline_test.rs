// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end runs of the pipeline against the recording host.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imgcad_core::config::{CollisionPolicy, PipelineConfig, StagePolicy};
use imgcad_core::error::ImgcadError;
use imgcad_core::paths::OutputPaths;
use imgcad_core::types::{Point3, RasterScale, StageKind, StageOutcome};
use imgcad_host::{HostCall, HostOperation, RecordingHost, memory::INITIAL_DOCUMENT};
use imgcad_pipeline::{Pipeline, convert_image_to_drawing};

fn white_photo(dir: &Path) -> PathBuf {
    let source = dir.join("photo.png");
    RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]))
        .save(&source)
        .unwrap();
    source
}

fn stage(report: &imgcad_core::RunReport, kind: StageKind) -> StageOutcome {
    report.outcome(kind).cloned().expect("stage not recorded")
}

#[test]
fn white_photo_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let source = white_photo(dir.path());
    let host = RecordingHost::new();

    let report = convert_image_to_drawing(&host, &source, PipelineConfig::default()).unwrap();
    assert!(report.is_success(), "stages: {:?}", report.stages);

    // Transparent output: same size, fully transparent.
    let transparent = dir.path().join("photo_transparent.png");
    assert_eq!(report.paths.transparent, transparent);
    let out = image::open(&transparent).unwrap().to_rgba8();
    assert_eq!(out.dimensions(), (10, 10));
    assert!(out.pixels().all(|p| p.0[3] == 0));

    // Drawing path: photo_<YYYYMMDD>_<HHMMSS>.dwg next to the source.
    let drawing = report.paths.drawing.clone();
    assert_eq!(drawing.parent(), Some(dir.path()));
    let name = drawing.file_name().unwrap().to_str().unwrap();
    assert_eq!(name, format!("photo_{}.dwg", report.paths.timestamp));
    assert_eq!(report.paths.timestamp.len(), 15);

    assert_eq!(report.raster_scale, Some(RasterScale { x: 0.1, y: 0.1 }));

    let calls = host.calls();
    let saved_name = name.to_owned();
    assert_eq!(
        calls,
        vec![
            HostCall::Connect,
            HostCall::ActiveDocument {
                document: INITIAL_DOCUMENT.into()
            },
            HostCall::AddRaster {
                document: INITIAL_DOCUMENT.into(),
                image: transparent.clone(),
                insertion: Point3::ORIGIN,
                scale: RasterScale { x: 0.1, y: 0.1 },
            },
            HostCall::SaveAs {
                document: INITIAL_DOCUMENT.into(),
                path: drawing.clone(),
            },
            HostCall::Open {
                path: drawing.clone()
            },
            HostCall::Close {
                document: saved_name.clone(),
                save_changes: false,
            },
        ]
    );

    // Only the reopened drawing is left open, and it has focus.
    assert_eq!(host.open_documents(), vec![saved_name.clone()]);
    assert_eq!(host.active_document_name(), Some(saved_name));
}

#[test]
fn missing_source_has_no_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("C1.jpg");
    let host = RecordingHost::new();

    let err = Pipeline::default().run(&host, &source).unwrap_err();
    assert!(matches!(err, ImgcadError::SourceNotFound(ref p) if p == &source));
    assert!(host.calls().is_empty(), "host must not be touched");
    assert!(!dir.path().join("C1_transparent.png").exists());
}

#[test]
fn session_failure_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let source = white_photo(dir.path());
    let host = RecordingHost::new().failing(HostOperation::Connect);

    let err = Pipeline::default().run(&host, &source).unwrap_err();
    assert!(matches!(err, ImgcadError::Automation { .. }), "got {err:?}");
    assert!(!dir.path().join("photo_transparent.png").exists());
}

#[test]
fn failed_strip_continues_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("scan.png");
    std::fs::write(&source, b"definitely not a png").unwrap();
    let host = RecordingHost::new();

    let report = Pipeline::default().run(&host, &source).unwrap();

    assert!(stage(&report, StageKind::Strip).is_failure());
    // Insert is still attempted and fails on the missing transparent file.
    assert!(stage(&report, StageKind::Insert).is_failure());
    // The empty drawing is still saved, reopened, and the original closed.
    assert_eq!(stage(&report, StageKind::Save), StageOutcome::Succeeded);
    assert_eq!(stage(&report, StageKind::Reopen), StageOutcome::Succeeded);
    assert_eq!(stage(&report, StageKind::Close), StageOutcome::Succeeded);
    assert!(!report.is_success());
    assert!(report.pixel_digest.is_none());
}

#[test]
fn halt_policy_skips_to_close() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("scan.png");
    std::fs::write(&source, b"definitely not a png").unwrap();
    let host = RecordingHost::new();
    let config = PipelineConfig {
        strip_policy: StagePolicy::Halt,
        ..PipelineConfig::default()
    };

    let report = Pipeline::new(config).run(&host, &source).unwrap();

    assert!(stage(&report, StageKind::Strip).is_failure());
    for kind in [StageKind::Insert, StageKind::Save, StageKind::Reopen] {
        assert!(
            matches!(stage(&report, kind), StageOutcome::Skipped { ref reason } if reason == "strip stage failed"),
            "{kind} should be skipped"
        );
    }
    assert_eq!(stage(&report, StageKind::Close), StageOutcome::Succeeded);
    assert!(!host.calls().iter().any(|c| matches!(c, HostCall::SaveAs { .. })));
    assert!(matches!(host.calls().last(), Some(HostCall::Close { .. })));
}

#[test]
fn failed_save_skips_reopen_but_closes() {
    let dir = tempfile::tempdir().unwrap();
    let source = white_photo(dir.path());
    let host = RecordingHost::new().failing(HostOperation::SaveAs);

    let report = Pipeline::default().run(&host, &source).unwrap();

    assert_eq!(stage(&report, StageKind::Insert), StageOutcome::Succeeded);
    assert!(stage(&report, StageKind::Save).is_failure());
    assert!(matches!(
        stage(&report, StageKind::Reopen),
        StageOutcome::Skipped { .. }
    ));
    assert_eq!(stage(&report, StageKind::Close), StageOutcome::Succeeded);
    assert!(!host.calls().iter().any(|c| matches!(c, HostCall::Open { .. })));
}

#[test]
fn failed_close_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let source = white_photo(dir.path());
    let host = RecordingHost::new().failing(HostOperation::Close);

    let report = Pipeline::default().run(&host, &source).unwrap();
    assert!(stage(&report, StageKind::Close).is_failure());
    assert_eq!(report.failures().count(), 1);
}

#[test]
fn timestamp_collision_fails_save_unless_overwriting() {
    let dir = tempfile::tempdir().unwrap();
    let source = white_photo(dir.path());
    let paths = OutputPaths::with_timestamp(&source, "20260101_120000");
    std::fs::write(&paths.drawing, b"earlier run").unwrap();

    let host = RecordingHost::new();
    let report = Pipeline::default()
        .run_with_paths(&host, paths.clone())
        .unwrap();
    match stage(&report, StageKind::Save) {
        StageOutcome::Failed { error } => assert!(error.contains("already exists"), "{error}"),
        other => panic!("expected save failure, got {other:?}"),
    }

    let config = PipelineConfig {
        on_collision: CollisionPolicy::Overwrite,
        ..PipelineConfig::default()
    };
    let report = Pipeline::new(config).run_with_paths(&host, paths).unwrap();
    assert!(report.is_success(), "stages: {:?}", report.stages);
}

#[test]
fn repeated_runs_share_transparent_output() {
    let dir = tempfile::tempdir().unwrap();
    let source = white_photo(dir.path());
    let pipeline = Pipeline::default();

    let first = pipeline
        .run_with_paths(
            &RecordingHost::new(),
            OutputPaths::with_timestamp(&source, "20260101_120000"),
        )
        .unwrap();
    let second = pipeline
        .run_with_paths(
            &RecordingHost::new(),
            OutputPaths::with_timestamp(&source, "20260101_120001"),
        )
        .unwrap();

    assert_ne!(first.paths.drawing, second.paths.drawing);
    assert_eq!(first.paths.transparent, second.paths.transparent);
    assert!(first.pixel_digest.is_some());
    assert_eq!(first.pixel_digest, second.pixel_digest);
    assert_ne!(first.run_id, second.run_id);
}

#[test]
fn report_serializes_for_cli_output() {
    let dir = tempfile::tempdir().unwrap();
    let source = white_photo(dir.path());
    let report = Pipeline::default()
        .run(&RecordingHost::new(), &source)
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["stages"].as_array().unwrap().len(), 5);
    assert_eq!(json["stages"][0]["stage"], "strip");
    assert_eq!(json["stages"][0]["status"], "succeeded");
}
