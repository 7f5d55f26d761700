// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// imgcad-host: CAD host automation abstractions.
//
// Defines the traits the pipeline drives (host → session → document) and the
// platform dispatch that picks an implementation. On Windows the host is
// AutoCAD reached through COM late binding; elsewhere a stub reports the host
// as unavailable. `RecordingHost` is an in-memory host for dry runs and tests.

pub mod memory;
pub mod traits;

#[cfg(windows)]
pub mod win32;

#[cfg(not(windows))]
pub mod stub;

pub use memory::{HostCall, HostOperation, RecordingHost};
pub use traits::{CadDocument, CadHost, CadSession};

use imgcad_core::config::HostConfig;

/// Returns the CAD host implementation for the target operating system.
pub fn host_for_platform(config: &HostConfig) -> Box<dyn CadHost> {
    #[cfg(windows)]
    {
        Box::new(win32::AutocadHost::new(config.clone()))
    }
    #[cfg(not(windows))]
    {
        Box::new(stub::StubHost::new(config.clone()))
    }
}
