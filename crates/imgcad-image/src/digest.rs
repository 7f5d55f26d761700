// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pixel fingerprinting: SHA-256 over decoded pixels, so two runs can be
// compared without depending on PNG encoder output.

use image::RgbaImage;
use sha2::{Digest, Sha256};

/// Hash the dimensions and raw RGBA samples of `image`, lowercase hex.
pub fn pixel_digest(image: &RgbaImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image.width().to_le_bytes());
    hasher.update(image.height().to_le_bytes());
    hasher.update(image.as_raw());
    hex::encode(hasher.finalize())
}
