// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub host for platforms without a CAD automation server.
//
// `connect` always returns `HostUnavailable`; the COM bridge lives in the
// `win32` module.

use imgcad_core::config::HostConfig;
use imgcad_core::error::{ImgcadError, Result};

use crate::traits::*;

/// No-op host returned on non-Windows platforms.
pub struct StubHost {
    config: HostConfig,
}

impl StubHost {
    pub fn new(config: HostConfig) -> Self {
        Self { config }
    }
}

impl CadHost for StubHost {
    fn name(&self) -> &str {
        "Unavailable (stub)"
    }

    fn connect(&self) -> Result<Box<dyn CadSession>> {
        tracing::warn!(
            prog_id = %self.config.prog_id,
            "CadHost::connect called on stub host"
        );
        Err(ImgcadError::HostUnavailable)
    }
}
