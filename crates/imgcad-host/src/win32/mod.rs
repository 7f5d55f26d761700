// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// AutoCAD bridge via COM late binding (`IDispatch`).
//
// The object model used here is the stable subset every AutoCAD release since
// 2000 exposes:
//
//   Application.ActiveDocument            -> Document
//   Application.Documents.Open(path)      -> Document
//   Document.ModelSpace.AddRaster(path, point, scale, rotation)
//   Document.SaveAs(path)
//   Document.Close(saveChanges)
//   Document.Name
//
// All calls run on the thread that called `connect`; the session owns a
// single-threaded apartment for that thread. None of the types here are
// `Send`.

#![cfg(windows)]

mod dispatch;

use std::path::Path;

use imgcad_core::config::HostConfig;
use imgcad_core::error::Result;
use imgcad_core::types::{Point3, RasterScale};
use tracing::{debug, info, instrument};

use crate::traits::*;
use dispatch::{Apartment, Dispatch, Variant};

/// Raster rotation passed to `AddRaster`, in radians.
const RASTER_ROTATION: f64 = 0.0;

/// AutoCAD reached through its registered automation server.
pub struct AutocadHost {
    config: HostConfig,
}

impl AutocadHost {
    pub fn new(config: HostConfig) -> Self {
        Self { config }
    }
}

impl CadHost for AutocadHost {
    fn name(&self) -> &str {
        "AutoCAD (COM)"
    }

    #[instrument(skip(self), fields(prog_id = %self.config.prog_id))]
    fn connect(&self) -> Result<Box<dyn CadSession>> {
        let apartment = Apartment::enter()?;
        let (application, attached) = Dispatch::attach_or_create(&self.config.prog_id, &apartment)?;

        if attached {
            info!("attached to running AutoCAD instance");
        } else {
            info!("launched new AutoCAD instance");
            if self.config.visible {
                application.put("Visible", Variant::from_bool(true))?;
            }
        }
        Ok(Box::new(AutocadSession { application }))
    }
}

/// A live `AcadApplication`.
pub struct AutocadSession {
    application: Dispatch,
}

impl CadSession for AutocadSession {
    fn active_document(&mut self) -> Result<Box<dyn CadDocument>> {
        let document = self.application.get_object("ActiveDocument")?;
        Ok(Box::new(AutocadDocument { document }))
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    fn open_document(&mut self, path: &Path) -> Result<Box<dyn CadDocument>> {
        let documents = self.application.get_object("Documents")?;
        let document = documents
            .call("Open", vec![Variant::from_os_str(path.as_os_str())?])?
            .into_dispatch(documents.apartment(), "Documents.Open")?;
        debug!("document opened");
        Ok(Box::new(AutocadDocument { document }))
    }
}

/// A live `AcadDocument`.
pub struct AutocadDocument {
    document: Dispatch,
}

impl CadDocument for AutocadDocument {
    fn name(&self) -> Result<String> {
        self.document.get("Name")?.into_string("Name")
    }

    /// AutoCAD sizes a raster by one scale factor and keeps its aspect ratio,
    /// so `scale.x` is passed and the height follows as `scale.y`.
    #[instrument(skip_all, fields(image = %image.display(), insertion = %insertion))]
    fn add_raster(&mut self, image: &Path, insertion: Point3, scale: RasterScale) -> Result<()> {
        let model_space = self.document.get_object("ModelSpace")?;
        let _raster = model_space.call(
            "AddRaster",
            vec![
                Variant::from_os_str(image.as_os_str())?,
                Variant::from_doubles(&insertion.to_array())?,
                Variant::from_f64(scale.x),
                Variant::from_f64(RASTER_ROTATION),
            ],
        )?;
        debug!(scale_x = scale.x, scale_y = scale.y, "raster added to model space");
        Ok(())
    }

    fn save_as(&mut self, path: &Path) -> Result<()> {
        self.document
            .call("SaveAs", vec![Variant::from_os_str(path.as_os_str())?])
            .map(drop)
    }

    fn close(&mut self, save_changes: bool) -> Result<()> {
        self.document
            .call("Close", vec![Variant::from_bool(save_changes)])
            .map(drop)
    }
}
