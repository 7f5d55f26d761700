// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Individual pipeline stages. Each takes the capability it needs (paths,
// session, document) explicitly and reports failure through its return value.

use std::path::Path;

use imgcad_core::config::CollisionPolicy;
use imgcad_core::error::{ImgcadError, Result};
use imgcad_core::paths::OutputPaths;
use imgcad_core::types::{Point3, RasterScale};
use imgcad_host::{CadDocument, CadHost, CadSession};
use imgcad_image::{TransparentImage, raster_dimensions, strip_file};
use tracing::{info, instrument};

/// Remove the white background of `paths.source` into `paths.transparent`.
#[instrument(skip_all, fields(source = %paths.source.display()))]
pub fn strip_background(paths: &OutputPaths) -> Result<TransparentImage> {
    info!("Processing image");
    strip_file(&paths.source, &paths.transparent)
}

/// Attach to (or launch) the host and take its active document as the
/// working document.
#[instrument(skip_all, fields(host = host.name()))]
pub fn open_session(
    host: &dyn CadHost,
) -> Result<(Box<dyn CadSession>, Box<dyn CadDocument>)> {
    let mut session = host.connect()?;
    let document = session.active_document()?;
    info!(document = %document.name().unwrap_or_default(), "CAD session started");
    Ok((session, document))
}

/// Insert `image` into model space at `insertion`, sized by its pixel
/// dimensions. Returns the scale that was passed to the host.
#[instrument(skip_all, fields(image = %image.display()))]
pub fn insert_image(
    document: &mut dyn CadDocument,
    image: &Path,
    insertion: Point3,
) -> Result<RasterScale> {
    let (width, height) = raster_dimensions(image)?;
    let scale = RasterScale::from_pixels(width, height);
    document.add_raster(image, insertion, scale)?;
    info!(
        %insertion,
        scale_x = scale.x,
        scale_y = scale.y,
        "Image inserted into model space"
    );
    Ok(scale)
}

/// Save the working document as `drawing`.
#[instrument(skip_all, fields(drawing = %drawing.display()))]
pub fn save_drawing(
    document: &mut dyn CadDocument,
    drawing: &Path,
    on_collision: CollisionPolicy,
) -> Result<()> {
    if drawing.exists() && on_collision == CollisionPolicy::Fail {
        return Err(ImgcadError::DrawingExists(drawing.to_path_buf()));
    }
    document.save_as(drawing)?;
    info!("Drawing saved");
    Ok(())
}

/// Open the saved drawing in the host.
#[instrument(skip_all, fields(drawing = %drawing.display()))]
pub fn reopen_drawing(session: &mut dyn CadSession, drawing: &Path) -> Result<Box<dyn CadDocument>> {
    let reopened = session.open_document(drawing)?;
    info!("Drawing reopened");
    Ok(reopened)
}

/// Close the working document, discarding unsaved changes.
#[instrument(skip_all)]
pub fn close_document(document: &mut dyn CadDocument) -> Result<()> {
    document.close(false)?;
    info!("Working document closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgcad_host::{HostCall, RecordingHost};

    #[test]
    fn insert_scales_by_pixel_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("plan.png");
        image::RgbaImage::new(320, 40).save(&image).unwrap();

        let host = RecordingHost::new();
        let (_session, mut document) = open_session(&host).unwrap();
        let scale = insert_image(document.as_mut(), &image, Point3::ORIGIN).unwrap();

        assert_eq!(scale, RasterScale { x: 3.2, y: 0.4 });
        assert!(host.calls().iter().any(|c| matches!(
            c,
            HostCall::AddRaster { insertion, .. } if *insertion == Point3::ORIGIN
        )));
    }

    #[test]
    fn insert_without_image_never_reaches_host() {
        let dir = tempfile::tempdir().unwrap();
        let host = RecordingHost::new();
        let (_session, mut document) = open_session(&host).unwrap();

        let err = insert_image(document.as_mut(), &dir.path().join("gone.png"), Point3::ORIGIN)
            .unwrap_err();
        assert!(matches!(err, ImgcadError::SourceNotFound(_)));
        assert!(!host.calls().iter().any(|c| matches!(c, HostCall::AddRaster { .. })));
    }

    #[test]
    fn save_refuses_existing_drawing() {
        let dir = tempfile::tempdir().unwrap();
        let drawing = dir.path().join("photo_20260101_000000.dwg");
        std::fs::write(&drawing, b"AC1032").unwrap();

        let host = RecordingHost::new();
        let (_session, mut document) = open_session(&host).unwrap();

        let err = save_drawing(document.as_mut(), &drawing, CollisionPolicy::Fail).unwrap_err();
        assert!(matches!(err, ImgcadError::DrawingExists(ref p) if p == &drawing));

        save_drawing(document.as_mut(), &drawing, CollisionPolicy::Overwrite).unwrap();
        assert!(matches!(host.calls().last(), Some(HostCall::SaveAs { .. })));
    }

    #[test]
    fn close_discards_changes() {
        let host = RecordingHost::new();
        let (_session, mut document) = open_session(&host).unwrap();
        close_document(document.as_mut()).unwrap();
        assert!(matches!(
            host.calls().last(),
            Some(HostCall::Close {
                save_changes: false,
                ..
            })
        ));
    }
}
