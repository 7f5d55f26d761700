// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// imgcad: Core types, error definitions, and configuration shared across all crates.

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::PipelineConfig;
pub use error::ImgcadError;
pub use paths::OutputPaths;
pub use types::*;
