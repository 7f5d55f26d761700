// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output path derivation: every artifact of a run lands next to the source
// image and is named after the source's base name.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

/// `chrono` format for the drawing timestamp (`YYYYMMDD_HHMMSS`).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Suffix appended to the base name of the transparent PNG.
pub const TRANSPARENT_SUFFIX: &str = "_transparent";

/// Extension of the saved drawing.
pub const DRAWING_EXTENSION: &str = "dwg";

/// All filesystem paths touched by one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPaths {
    /// The input raster.
    pub source: PathBuf,
    /// `<dir>/<base>_transparent.png`
    pub transparent: PathBuf,
    /// `<dir>/<base>_<YYYYMMDD_HHMMSS>.dwg`
    pub drawing: PathBuf,
    /// The timestamp embedded in `drawing`.
    pub timestamp: String,
}

impl OutputPaths {
    /// Derive the output paths for `source` using the current local time.
    pub fn derive(source: &Path) -> Self {
        Self::at(source, &Local::now())
    }

    /// Derive the output paths for `source` at a fixed instant.
    pub fn at<Tz: TimeZone>(source: &Path, when: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let timestamp = when.format(TIMESTAMP_FORMAT).to_string();
        Self::with_timestamp(source, &timestamp)
    }

    /// Derive the output paths for `source` with a pre-formatted timestamp.
    pub fn with_timestamp(source: &Path, timestamp: &str) -> Self {
        let dir = source.parent().unwrap_or_else(|| Path::new(""));
        let base = base_name(source);

        Self {
            source: source.to_path_buf(),
            transparent: dir.join(format!("{base}{TRANSPARENT_SUFFIX}.png")),
            drawing: dir.join(format!("{base}_{timestamp}.{DRAWING_EXTENSION}")),
            timestamp: timestamp.to_owned(),
        }
    }
}

/// File stem of `path`, or `"image"` when the path has none (e.g. `..`).
fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_owned())
}
