use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::config::RunFolders;

/// File categories discovered in the configured folders.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FileKind {
    Source,
    Document,
    EmbeddedOverlay,
    RasterOverlay,
}

impl FileKind {
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Source => &["psd", "tif", "tiff", "png", "jpg", "jpeg"],
            Self::Document => &["pdf"],
            Self::EmbeddedOverlay => &["tif", "tiff"],
            Self::RasterOverlay => &["jpg", "jpeg"],
        }
    }

    pub fn accepts(self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions()
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false)
    }
}

/// Regular, non-hidden files of `kind` directly inside `folder`, sorted.
pub fn list_files(folder: &Path, kind: FileKind) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let entries =
        fs::read_dir(folder).with_context(|| format!("failed to read {}", folder.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", folder.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        if !is_listed_name(&entry.file_name(), &path) {
            continue;
        }

        if kind.accepts(&path) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Hidden (`.`/`~`) and non-UTF-8 names never take part in a run.
fn is_listed_name(name: &OsStr, path: &Path) -> bool {
    match name.to_str() {
        Some(name) => !(name.starts_with('.') || name.starts_with('~')),
        None => {
            warn!(path = %path.display(), "skipping file with non-UTF-8 name");
            false
        }
    }
}

/// Auxiliary files every source document is matched against.
#[derive(Debug, Clone, Default)]
pub struct CandidateFileSet {
    pub documents: Vec<PathBuf>,
    pub embedded_overlays: Vec<PathBuf>,
    pub raster_overlays: Vec<PathBuf>,
}

impl CandidateFileSet {
    pub fn discover(folders: &RunFolders) -> Result<Self> {
        let candidates = Self {
            documents: list_optional(folders.document_folder.as_deref(), FileKind::Document)?,
            embedded_overlays: list_optional(
                folders.embedded_overlay_folder.as_deref(),
                FileKind::EmbeddedOverlay,
            )?,
            raster_overlays: list_optional(
                folders.raster_overlay_folder.as_deref(),
                FileKind::RasterOverlay,
            )?,
        };

        debug!(
            documents = candidates.documents.len(),
            embedded_overlays = candidates.embedded_overlays.len(),
            raster_overlays = candidates.raster_overlays.len(),
            "discovered candidate files"
        );
        Ok(candidates)
    }
}

fn list_optional(folder: Option<&Path>, kind: FileKind) -> Result<Vec<PathBuf>> {
    match folder {
        Some(folder) if folder.is_dir() => list_files(folder, kind),
        Some(folder) => {
            warn!(path = %folder.display(), "folder not found; skipping");
            Ok(Vec::new())
        }
        None => Ok(Vec::new()),
    }
}

/// Name of a candidate as matchers see it.
pub fn file_name(path: &Path) -> &str {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
}
