// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for driving a CAD host.
//
// Every call blocks until the host returns. Implementations are not required
// to be `Send`: COM objects live in the apartment that created them.

use std::path::Path;

use imgcad_core::error::Result;
use imgcad_core::types::{Point3, RasterScale};

/// Something that can hand out a live automation session.
pub trait CadHost {
    /// Human-readable host name (e.g. "AutoCAD (COM)").
    fn name(&self) -> &str;

    /// Attach to a running instance, or launch one if none is running.
    fn connect(&self) -> Result<Box<dyn CadSession>>;
}

/// A live, addressable host instance.
pub trait CadSession {
    /// The document that currently has focus.
    fn active_document(&mut self) -> Result<Box<dyn CadDocument>>;

    /// Open the drawing at `path`; the opened document becomes active.
    fn open_document(&mut self, path: &Path) -> Result<Box<dyn CadDocument>>;
}

/// One drawing inside a session.
pub trait CadDocument {
    /// Document name as reported by the host (e.g. "Drawing1.dwg").
    fn name(&self) -> Result<String>;

    /// Add a raster reference for `image` to model space.
    fn add_raster(&mut self, image: &Path, insertion: Point3, scale: RasterScale) -> Result<()>;

    /// Save the document under `path`.
    fn save_as(&mut self, path: &Path) -> Result<()>;

    /// Close the document, optionally saving pending changes.
    fn close(&mut self, save_changes: bool) -> Result<()>;
}
