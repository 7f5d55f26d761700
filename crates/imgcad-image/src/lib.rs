// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// imgcad-image: Raster processing for the image-to-drawing pipeline.
//
// Provides the white-background stripper (distance-from-white alpha mask),
// header-only dimension probing for the inserter, and a pixel digest used to
// compare the output of separate runs.

pub mod digest;
pub mod probe;
pub mod strip;

pub use digest::pixel_digest;
pub use probe::raster_dimensions;
pub use strip::{BackgroundStripper, TransparentImage, strip_file};
