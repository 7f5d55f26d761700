// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the image-to-drawing pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::paths::OutputPaths;

/// Pixels per drawing unit when sizing an inserted raster.
pub const PIXELS_PER_UNIT: f64 = 100.0;

/// Unique identifier for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in drawing coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Components in the order the host expects for a point array.
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl std::fmt::Display for Point3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Horizontal and vertical scale applied to an inserted raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterScale {
    pub x: f64,
    pub y: f64,
}

impl RasterScale {
    /// Scale for an image of `width` x `height` pixels.
    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self {
            x: f64::from(width) / PIXELS_PER_UNIT,
            y: f64::from(height) / PIXELS_PER_UNIT,
        }
    }
}

/// The stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Remove the white background and write the transparent PNG.
    Strip,
    /// Add the transparent PNG to model space.
    Insert,
    /// Save the active document under the timestamped drawing path.
    Save,
    /// Open the saved drawing in the host.
    Reopen,
    /// Close the original document without saving.
    Close,
}

impl StageKind {
    pub const ALL: [StageKind; 5] = [
        StageKind::Strip,
        StageKind::Insert,
        StageKind::Save,
        StageKind::Reopen,
        StageKind::Close,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strip => "strip",
            Self::Insert => "insert",
            Self::Save => "save",
            Self::Reopen => "reopen",
            Self::Close => "close",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// What happened to one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    Succeeded,
    /// The stage ran and returned an error (rendered message).
    Failed { error: String },
    /// The stage was not attempted.
    Skipped { reason: String },
}

impl StageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// One entry in the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: StageKind,
    #[serde(flatten)]
    pub outcome: StageOutcome,
}

/// Summary of a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub paths: OutputPaths,
    /// Stage records in execution order.
    pub stages: Vec<StageRecord>,
    /// SHA-256 of the transparent image pixels, when the strip stage wrote one.
    pub pixel_digest: Option<String>,
    /// Scale passed to the host, when the insert stage computed one.
    pub raster_scale: Option<RasterScale>,
}

impl RunReport {
    pub fn new(paths: OutputPaths) -> Self {
        Self {
            run_id: RunId::new(),
            started_at: Utc::now(),
            paths,
            stages: Vec::with_capacity(StageKind::ALL.len()),
            pixel_digest: None,
            raster_scale: None,
        }
    }

    pub fn record(&mut self, stage: StageKind, outcome: StageOutcome) {
        self.stages.push(StageRecord { stage, outcome });
    }

    /// Outcome of `stage`, if it has been recorded.
    pub fn outcome(&self, stage: StageKind) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }

    /// True only when every stage ran and succeeded.
    pub fn is_success(&self) -> bool {
        self.stages.len() == StageKind::ALL.len()
            && self.stages.iter().all(|r| r.outcome.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &StageRecord> {
        self.stages.iter().filter(|r| r.outcome.is_failure())
    }
}
