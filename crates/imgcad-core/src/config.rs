// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ImgcadError, Result};

/// Programmatic identifier of the AutoCAD automation server.
pub const DEFAULT_PROG_ID: &str = "AutoCAD.Application";

/// What to do when the timestamped drawing path already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Fail the save stage with `DrawingExists`.
    #[default]
    Fail,
    /// Let the host overwrite the existing file.
    Overwrite,
}

/// Whether a failed stage stops the remaining CAD stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagePolicy {
    /// Record the failure and keep going.
    #[default]
    Continue,
    /// Record the failure and skip everything up to the close step.
    Halt,
}

/// Settings for connecting to the CAD host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Automation ProgID used to attach to or launch the host.
    pub prog_id: String,
    /// Make a newly launched host window visible.
    pub visible: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            prog_id: DEFAULT_PROG_ID.to_owned(),
            visible: true,
        }
    }
}

/// Settings for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub host: HostConfig,
    pub on_collision: CollisionPolicy,
    pub strip_policy: StagePolicy,
    pub insert_policy: StagePolicy,
    pub save_policy: StagePolicy,
}

impl PipelineConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|err| {
            ImgcadError::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        serde_json::from_str(&data).map_err(|err| {
            ImgcadError::Config(format!("invalid config {}: {}", path.display(), err))
        })
    }

    /// Write configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Set every stage policy to `policy`.
    pub fn with_all_policies(mut self, policy: StagePolicy) -> Self {
        self.strip_policy = policy;
        self.insert_policy = policy;
        self.save_policy = policy;
        self
    }
}
