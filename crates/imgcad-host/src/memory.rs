// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory CAD host that records every automation call.
//
// Backs `--dry-run` and the pipeline tests. It models just enough host
// behaviour to make call sequences meaningful: a fresh session starts with
// `Drawing1.dwg` active, `SaveAs` renames the document, `Open` only succeeds
// for paths that were saved in this host or exist on disk, and closing the
// active document hands focus to the most recently opened one still open.
// No drawing files are written.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use imgcad_core::error::{ImgcadError, Result};
use imgcad_core::types::{Point3, RasterScale};
use serde::Serialize;
use tracing::debug;

use crate::traits::*;

/// Name of the document a new session starts with.
pub const INITIAL_DOCUMENT: &str = "Drawing1.dwg";

/// Host operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostOperation {
    Connect,
    ActiveDocument,
    AddRaster,
    SaveAs,
    Open,
    Close,
}

impl HostOperation {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "Connect",
            Self::ActiveDocument => "ActiveDocument",
            Self::AddRaster => "AddRaster",
            Self::SaveAs => "SaveAs",
            Self::Open => "Documents.Open",
            Self::Close => "Close",
        }
    }
}

/// One recorded automation call, in the order it was made.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum HostCall {
    Connect,
    ActiveDocument {
        document: String,
    },
    AddRaster {
        document: String,
        image: PathBuf,
        insertion: Point3,
        scale: RasterScale,
    },
    SaveAs {
        document: String,
        path: PathBuf,
    },
    Open {
        path: PathBuf,
    },
    Close {
        document: String,
        save_changes: bool,
    },
}

#[derive(Debug)]
struct DocumentState {
    name: String,
    rasters: Vec<PathBuf>,
    closed: bool,
}

#[derive(Debug, Default)]
struct HostState {
    calls: Vec<HostCall>,
    failing: HashSet<HostOperation>,
    saved: HashSet<PathBuf>,
    documents: Vec<DocumentState>,
    active: Option<usize>,
}

impl HostState {
    fn check(&self, op: HostOperation) -> Result<()> {
        if self.failing.contains(&op) {
            return Err(ImgcadError::automation(op.as_str(), "injected failure"));
        }
        Ok(())
    }

    fn open(&mut self, name: String) -> usize {
        self.documents.push(DocumentState {
            name,
            rasters: Vec::new(),
            closed: false,
        });
        let index = self.documents.len() - 1;
        self.active = Some(index);
        index
    }

    fn document(&self, index: usize, op: HostOperation) -> Result<&DocumentState> {
        let doc = &self.documents[index];
        if doc.closed {
            return Err(ImgcadError::automation(
                op.as_str(),
                format!("document {} is closed", doc.name),
            ));
        }
        Ok(doc)
    }
}

fn lock_state(state: &Mutex<HostState>) -> Result<MutexGuard<'_, HostState>> {
    state
        .lock()
        .map_err(|_| ImgcadError::automation("recording host", "state lock poisoned"))
}

/// Recording host. Cloning shares the underlying state, so a test can keep
/// one handle for inspection while the pipeline drives another.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    state: Arc<Mutex<HostState>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future call of `op` fail with an automation error.
    pub fn failing(self, op: HostOperation) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.failing.insert(op);
        }
        self
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<HostCall> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    /// Names of documents that have not been closed, in open order.
    pub fn open_documents(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| {
                s.documents
                    .iter()
                    .filter(|d| !d.closed)
                    .map(|d| d.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Name of the active document, if any.
    pub fn active_document_name(&self) -> Option<String> {
        let state = self.state.lock().ok()?;
        state.active.map(|i| state.documents[i].name.clone())
    }

    /// Raster paths inserted into the document named `name`.
    pub fn rasters_in(&self, name: &str) -> Vec<PathBuf> {
        self.state
            .lock()
            .map(|s| {
                s.documents
                    .iter()
                    .filter(|d| d.name == name)
                    .flat_map(|d| d.rasters.iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl CadHost for RecordingHost {
    fn name(&self) -> &str {
        "Recording (in-memory)"
    }

    fn connect(&self) -> Result<Box<dyn CadSession>> {
        let mut state = lock_state(&self.state)?;
        state.calls.push(HostCall::Connect);
        state.check(HostOperation::Connect)?;

        if state.active.is_none() {
            state.open(INITIAL_DOCUMENT.to_owned());
        }
        debug!("recording session attached");
        Ok(Box::new(RecordingSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct RecordingSession {
    state: Arc<Mutex<HostState>>,
}

impl RecordingSession {
    fn document(&self, index: usize) -> Box<dyn CadDocument> {
        Box::new(RecordingDocument {
            state: Arc::clone(&self.state),
            index,
        })
    }
}

impl CadSession for RecordingSession {
    fn active_document(&mut self) -> Result<Box<dyn CadDocument>> {
        let index = {
            let mut state = lock_state(&self.state)?;
            let index = state.active.ok_or_else(|| {
                ImgcadError::automation(
                    HostOperation::ActiveDocument.as_str(),
                    "no document is open",
                )
            })?;
            let document = state.documents[index].name.clone();
            state.calls.push(HostCall::ActiveDocument { document });
            state.check(HostOperation::ActiveDocument)?;
            index
        };
        Ok(self.document(index))
    }

    fn open_document(&mut self, path: &Path) -> Result<Box<dyn CadDocument>> {
        let index = {
            let mut state = lock_state(&self.state)?;
            state.calls.push(HostCall::Open {
                path: path.to_path_buf(),
            });
            state.check(HostOperation::Open)?;

            if !state.saved.contains(path) && !path.exists() {
                return Err(ImgcadError::automation(
                    HostOperation::Open.as_str(),
                    format!("{} not found", path.display()),
                ));
            }
            state.open(file_name(path))
        };
        Ok(self.document(index))
    }
}

struct RecordingDocument {
    state: Arc<Mutex<HostState>>,
    index: usize,
}

impl CadDocument for RecordingDocument {
    fn name(&self) -> Result<String> {
        Ok(lock_state(&self.state)?.documents[self.index].name.clone())
    }

    fn add_raster(&mut self, image: &Path, insertion: Point3, scale: RasterScale) -> Result<()> {
        let mut state = lock_state(&self.state)?;
        let document = state.document(self.index, HostOperation::AddRaster)?.name.clone();
        state.calls.push(HostCall::AddRaster {
            document,
            image: image.to_path_buf(),
            insertion,
            scale,
        });
        state.check(HostOperation::AddRaster)?;

        if !image.exists() {
            return Err(ImgcadError::automation(
                HostOperation::AddRaster.as_str(),
                format!("file {} not found", image.display()),
            ));
        }
        state.documents[self.index].rasters.push(image.to_path_buf());
        Ok(())
    }

    fn save_as(&mut self, path: &Path) -> Result<()> {
        let mut state = lock_state(&self.state)?;
        let document = state.document(self.index, HostOperation::SaveAs)?.name.clone();
        state.calls.push(HostCall::SaveAs {
            document,
            path: path.to_path_buf(),
        });
        state.check(HostOperation::SaveAs)?;

        state.documents[self.index].name = file_name(path);
        state.saved.insert(path.to_path_buf());
        Ok(())
    }

    fn close(&mut self, save_changes: bool) -> Result<()> {
        let mut state = lock_state(&self.state)?;
        let document = state.document(self.index, HostOperation::Close)?.name.clone();
        state.calls.push(HostCall::Close {
            document,
            save_changes,
        });
        state.check(HostOperation::Close)?;

        state.documents[self.index].closed = true;
        if state.active == Some(self.index) {
            state.active = state.documents.iter().rposition(|d| !d.closed);
        }
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
