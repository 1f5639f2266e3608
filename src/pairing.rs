use std::path::{Path, PathBuf};

use tracing::debug;

use crate::files::{CandidateFileSet, file_name};
use crate::matcher::{
    DocumentKey, FileMatcher, MatchError, derive_document_key, derive_multi_page_matcher,
    derive_overlay_matcher,
};
use crate::model::SourcePairingReport;
use crate::rules::ActiveRule;
use crate::util::strip_extension;

/// Auxiliary files selected for one source document.
#[derive(Debug)]
pub struct SourcePairing {
    pub source: PathBuf,
    pub doc_name: String,
    pub document_key: Option<DocumentKey>,
    pub document: Option<PathBuf>,
    pub embedded_overlays: Vec<PathBuf>,
    pub raster_overlays: Vec<PathBuf>,
    pub issues: Vec<MatchError>,
}

pub fn pair_source(source: &Path, rule: &ActiveRule, candidates: &CandidateFileSet) -> SourcePairing {
    let doc_name = strip_extension(file_name(source)).to_string();
    let mut issues = Vec::new();

    let document_key = derive_document_key(&doc_name, rule).ok();

    let (document, embedded_overlays) = match derive_multi_page_matcher(&doc_name, rule) {
        Ok(matcher) => {
            debug!(source = %doc_name, matcher = matcher.as_str(), "document matcher");
            (
                select_document(&matcher, &doc_name, &candidates.documents),
                matching(&matcher, &candidates.embedded_overlays),
            )
        }
        Err(err) => {
            issues.push(err);
            (None, Vec::new())
        }
    };

    let raster_overlays = match derive_overlay_matcher(&doc_name, rule) {
        Ok(matcher) => matching(&matcher, &candidates.raster_overlays),
        Err(err) => {
            issues.push(err);
            Vec::new()
        }
    };

    SourcePairing {
        source: source.to_path_buf(),
        doc_name,
        document_key,
        document,
        embedded_overlays,
        raster_overlays,
        issues,
    }
}

/// Exact stem match first, otherwise the first accepted candidate.
fn select_document(matcher: &FileMatcher, doc_name: &str, documents: &[PathBuf]) -> Option<PathBuf> {
    let accepted = documents
        .iter()
        .filter(|path| matcher.is_match(file_name(path)))
        .collect::<Vec<_>>();

    accepted
        .iter()
        .find(|path| strip_extension(file_name(path)).eq_ignore_ascii_case(doc_name))
        .or_else(|| accepted.first())
        .map(|path| path.to_path_buf())
}

fn matching(matcher: &FileMatcher, files: &[PathBuf]) -> Vec<PathBuf> {
    files
        .iter()
        .filter(|path| matcher.is_match(file_name(path)))
        .cloned()
        .collect()
}

impl SourcePairing {
    pub fn to_report(&self) -> SourcePairingReport {
        SourcePairingReport {
            source: self.source.display().to_string(),
            doc_name: self.doc_name.clone(),
            document_key: self.document_key.as_ref().map(|key| key.as_str().to_string()),
            document: self.document.as_ref().map(|path| path.display().to_string()),
            embedded_overlays: self
                .embedded_overlays
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
            raster_overlays: self
                .raster_overlays
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
            issues: self.issues.iter().map(ToString::to_string).collect(),
        }
    }
}
