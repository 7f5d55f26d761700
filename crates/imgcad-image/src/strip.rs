// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background stripper: turns "distance from white" into an alpha channel so
// that a scanned or photographed drawing on white paper can be laid over CAD
// geometry.

use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgba, RgbaImage};
use imgcad_core::error::{ImgcadError, Result};
use tracing::{debug, info, instrument};

use crate::digest::pixel_digest;

/// The background colour being removed: opaque white.
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Multiplier applied to the per-channel difference from white.
pub const GAIN: f32 = 2.0;

/// Offset applied after [`GAIN`]; suppresses near-white noise.
pub const OFFSET: f32 = -100.0;

/// Map one channel's absolute difference from white onto `[0, 255]`.
#[inline]
pub fn remap_difference(difference: u8) -> u8 {
    (GAIN * f32::from(difference) + OFFSET).clamp(0.0, 255.0) as u8
}

/// ITU-R 601-2 luma in 16.16 fixed point, rounded.
#[inline]
pub fn luma_601(r: u8, g: u8, b: u8) -> u8 {
    let l = u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000;
    (l >> 16) as u8
}

/// Opacity for a single source pixel.
///
/// The difference image is taken across all four channels, but the luma
/// collapse only reads colour, so the source alpha does not affect the mask.
#[inline]
pub fn mask_value(pixel: Rgba<u8>) -> u8 {
    let Rgba([r, g, b, _]) = pixel;
    let Rgba([br, bg, bb, _]) = BACKGROUND;
    luma_601(
        remap_difference(r.abs_diff(br)),
        remap_difference(g.abs_diff(bg)),
        remap_difference(b.abs_diff(bb)),
    )
}

/// Computes and applies the distance-from-white mask for one image.
///
/// ```ignore
/// let stripped = BackgroundStripper::open("C1.jpg")?.strip();
/// stripped.save("C1_transparent.png")?;
/// ```
pub struct BackgroundStripper {
    /// Source image converted to RGBA.
    image: RgbaImage,
}

impl BackgroundStripper {
    /// Load the source image. A missing file is reported as
    /// [`ImgcadError::SourceNotFound`] rather than a decode failure.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImgcadError::SourceNotFound(path.to_path_buf()));
        }
        let img = image::open(path).map_err(|err| {
            ImgcadError::ImageError(format!("failed to open {}: {}", path.display(), err))
        })?;
        info!(width = img.width(), height = img.height(), "Source image loaded");
        Ok(Self::from_dynamic(img))
    }

    /// Wrap an already-decoded image.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            image: image.to_rgba8(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The single-channel transparency mask, same size as the source.
    pub fn mask(&self) -> GrayImage {
        GrayImage::from_fn(self.image.width(), self.image.height(), |x, y| {
            Luma([mask_value(*self.image.get_pixel(x, y))])
        })
    }

    /// Replace the source alpha with the mask.
    #[instrument(skip(self), fields(width = self.width(), height = self.height()))]
    pub fn strip(self) -> TransparentImage {
        let mask = self.mask();
        let mut image = self.image;

        for (pixel, alpha) in image.pixels_mut().zip(mask.pixels()) {
            pixel.0[3] = alpha.0[0];
        }

        debug!(
            transparent = mask.pixels().filter(|m| m.0[0] == 0).count(),
            "Mask applied"
        );
        TransparentImage { image }
    }
}

/// RGBA output of the stripper.
#[derive(Debug, Clone)]
pub struct TransparentImage {
    image: RgbaImage,
}

impl TransparentImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    /// SHA-256 over dimensions and pixels, hex encoded.
    pub fn digest(&self) -> String {
        pixel_digest(&self.image)
    }

    /// Write as PNG regardless of the path's extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|err| {
                ImgcadError::ImageError(format!(
                    "failed to save image to {}: {}",
                    path.display(),
                    err
                ))
            })?;
        info!(path = %path.display(), "Transparent image saved");
        Ok(())
    }
}

/// Strip `source` and write the result to `output` as PNG.
///
/// Nothing is written when the source is missing or cannot be decoded.
#[instrument(skip_all, fields(source = %source.display(), output = %output.display()))]
pub fn strip_file(source: &Path, output: &Path) -> Result<TransparentImage> {
    let stripped = BackgroundStripper::open(source)?.strip();
    stripped.save(output)?;
    Ok(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn remap_suppresses_small_differences() {
        assert_eq!(remap_difference(0), 0);
        assert_eq!(remap_difference(50), 0);
        assert_eq!(remap_difference(51), 2);
        assert_eq!(remap_difference(100), 100);
        assert_eq!(remap_difference(178), 255);
        assert_eq!(remap_difference(255), 255);
    }

    #[test]
    fn luma_of_grey_is_identity() {
        for v in [0u8, 1, 77, 128, 254, 255] {
            assert_eq!(luma_601(v, v, v), v, "grey {v}");
        }
    }

    #[test]
    fn white_is_fully_transparent() {
        assert_eq!(mask_value(Rgba([255, 255, 255, 255])), 0);
    }

    #[test]
    fn black_is_fully_opaque() {
        assert_eq!(mask_value(Rgba([0, 0, 0, 255])), 255);
    }

    #[test]
    fn near_white_noise_is_transparent() {
        assert_eq!(mask_value(Rgba([240, 235, 250, 255])), 0);
    }

    #[test]
    fn source_alpha_does_not_affect_mask() {
        assert_eq!(
            mask_value(Rgba([10, 20, 30, 0])),
            mask_value(Rgba([10, 20, 30, 255]))
        );
    }

    #[test]
    fn strip_preserves_dimensions_and_colour() {
        let mut src = RgbImage::from_pixel(7, 3, image::Rgb([255, 255, 255]));
        src.put_pixel(2, 1, image::Rgb([0, 0, 0]));
        src.put_pixel(4, 2, image::Rgb([200, 30, 30]));

        let out = BackgroundStripper::from_dynamic(DynamicImage::ImageRgb8(src)).strip();
        let rgba = out.as_rgba();

        assert_eq!(rgba.dimensions(), (7, 3));
        assert_eq!(*rgba.get_pixel(0, 0), Rgba([255, 255, 255, 0]));
        assert_eq!(*rgba.get_pixel(2, 1), Rgba([0, 0, 0, 255]));

        // Colour channels come from the source, not the difference image.
        let red = rgba.get_pixel(4, 2);
        assert_eq!(&red.0[..3], &[200, 30, 30]);
        assert!(red.0[3] > 0, "red pixel should keep some opacity");
    }

    #[test]
    fn mask_matches_applied_alpha() {
        let src = RgbaImage::from_fn(16, 16, |x, y| Rgba([(x * 16) as u8, (y * 16) as u8, 128, 255]));
        let stripper = BackgroundStripper::from_dynamic(DynamicImage::ImageRgba8(src));
        let mask = stripper.mask();
        let out = stripper.strip();

        for (m, p) in mask.pixels().zip(out.as_rgba().pixels()) {
            assert_eq!(m.0[0], p.0[3]);
        }
    }

    #[test]
    fn strip_file_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photo.png");
        let output = dir.path().join("photo_transparent.png");
        RgbImage::from_pixel(10, 10, image::Rgb([255, 255, 255]))
            .save(&source)
            .unwrap();

        let stripped = strip_file(&source, &output).unwrap();
        assert_eq!((stripped.width(), stripped.height()), (10, 10));

        let reloaded = image::open(&output).unwrap();
        assert!(reloaded.color().has_alpha());
        let reloaded = reloaded.to_rgba8();
        assert_eq!(reloaded.dimensions(), (10, 10));
        assert!(reloaded.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn strip_file_missing_source_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("missing.jpg");
        let output = dir.path().join("missing_transparent.png");

        let err = strip_file(&source, &output).unwrap_err();
        assert!(matches!(err, ImgcadError::SourceNotFound(ref p) if p == &source));
        assert!(!output.exists());
    }

    #[test]
    fn strip_file_undecodable_source_is_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.png");
        let output = dir.path().join("broken_transparent.png");
        std::fs::write(&source, b"not an image").unwrap();

        let err = strip_file(&source, &output).unwrap_err();
        assert!(matches!(err, ImgcadError::ImageError(_)), "got {err:?}");
        assert!(!output.exists());
    }

    #[test]
    fn saved_output_is_png_whatever_the_extension() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("C1_transparent.dat");
        let src = RgbImage::from_pixel(4, 5, image::Rgb([0, 0, 0]));
        let out = BackgroundStripper::from_dynamic(DynamicImage::ImageRgb8(src)).strip();
        out.save(&output).unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, *out.as_rgba());
    }
}
