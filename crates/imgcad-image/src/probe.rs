// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::path::Path;

use imgcad_core::error::{ImgcadError, Result};
use tracing::debug;

/// Pixel dimensions of the raster at `path`, read from its header.
pub fn raster_dimensions(path: &Path) -> Result<(u32, u32)> {
    if !path.exists() {
        return Err(ImgcadError::SourceNotFound(path.to_path_buf()));
    }
    let (width, height) = image::image_dimensions(path).map_err(|err| {
        ImgcadError::ImageError(format!(
            "failed to read dimensions of {}: {}",
            path.display(),
            err
        ))
    })?;
    debug!(path = %path.display(), width, height, "Raster dimensions probed");
    Ok((width, height))
}
