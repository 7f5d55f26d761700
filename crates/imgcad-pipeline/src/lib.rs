// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// imgcad-pipeline: Strip, insert, save, reopen, close.
//
// `stages` holds one function per step, each returning an explicit `Result`.
// `pipeline` runs them in order against one CAD session, records a
// `StageOutcome` per step, and applies the configured per-stage policy.

pub mod pipeline;
pub mod stages;

pub use pipeline::{Pipeline, convert_image_to_drawing};
