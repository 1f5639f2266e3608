use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::RunConfig;
use crate::files::{CandidateFileSet, file_name};
use crate::host::{EditorHost, HostError, OpenDocument, PageOpener};
use crate::matcher::MatchError;
use crate::model::{Diagnostic, RunCounts};
use crate::pairing::{SourcePairing, pair_source};
use crate::probe::{PageProbe, count_pages};
use crate::util::{now_utc_string, strip_extension};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ProbedDocument {
    pub source: PathBuf,
    pub document: PathBuf,
    pub probe: PageProbe,
}

/// Append-only record of what happened during a run.
#[derive(Debug, Default)]
pub struct RunLedger {
    pub counts: RunCounts,
    pub probes: Vec<ProbedDocument>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunLedger {
    fn diagnose(&mut self, source: &str, message: impl Into<String>) {
        let message = message.into();
        warn!(source = %source, detail = %message, "diagnostic");
        self.diagnostics.push(Diagnostic {
            logged_at: now_utc_string(),
            source: source.to_string(),
            message,
        });
        self.counts.diagnostic_count = self.diagnostics.len();
    }

    /// `Ok(true)` when the step ran, `Ok(false)` when its failure was logged.
    fn recover(&mut self, source: &str, result: Result<(), HostError>) -> Result<bool, HostError> {
        match result {
            Ok(()) => Ok(true),
            Err(HostError::Cancelled) => Err(HostError::Cancelled),
            Err(err) => {
                self.diagnose(source, err.to_string());
                Ok(false)
            }
        }
    }
}

/// Processes every source strictly one after another. Only cancellation
/// stops the run early; every other host failure is logged and skipped.
pub fn process_sources<H, O>(
    config: &RunConfig,
    candidates: &CandidateFileSet,
    sources: &[PathBuf],
    host: &mut H,
    opener: &mut O,
    ledger: &mut RunLedger,
) -> RunOutcome
where
    H: EditorHost + ?Sized,
    O: PageOpener + ?Sized,
{
    ledger.counts.source_count = sources.len();

    for source in sources {
        if let Err(HostError::Cancelled) =
            process_source(config, candidates, source, host, opener, ledger)
        {
            return RunOutcome::Cancelled;
        }
    }

    info!(
        processed = ledger.counts.processed_count,
        saved = ledger.counts.saved_count,
        diagnostics = ledger.counts.diagnostic_count,
        "embed run complete"
    );
    RunOutcome::Completed
}

fn process_source<H, O>(
    config: &RunConfig,
    candidates: &CandidateFileSet,
    source: &Path,
    host: &mut H,
    opener: &mut O,
    ledger: &mut RunLedger,
) -> Result<(), HostError>
where
    H: EditorHost + ?Sized,
    O: PageOpener + ?Sized,
{
    let label = file_name(source).to_string();
    let pairing = pair_source(source, &config.rule, candidates);

    for issue in &pairing.issues {
        if matches!(issue, MatchError::NoKeyMatch { .. }) {
            ledger.counts.no_key_match_count += 1;
        }
        ledger.diagnose(&label, issue.to_string());
    }

    // Probe before the source is opened so only one document session is live.
    let page_count = match &pairing.document {
        Some(document) => {
            let probe = count_pages(opener, document, config.max_pages)?;
            ledger.probes.push(ProbedDocument {
                source: source.to_path_buf(),
                document: document.clone(),
                probe,
            });
            Some(probe.page_count)
        }
        None => None,
    };

    let mut document = match OpenDocument::open(host, source) {
        Ok(document) => document,
        Err(HostError::Cancelled) => return Err(HostError::Cancelled),
        Err(err) => {
            ledger.diagnose(&label, format!("failed to open source file: {err}"));
            return Ok(());
        }
    };
    ledger.counts.processed_count += 1;

    if let (Some(pdf), Some(page_count)) = (&pairing.document, page_count) {
        let base_name = config
            .layer_names
            .document
            .clone()
            .unwrap_or_else(|| strip_extension(file_name(pdf)).to_string());

        for page in 1..=page_count {
            let layer_name = format!("{base_name} (Pg {page})");
            let placed = document.place_embedded(pdf, Some(page), &layer_name);
            if ledger.recover(&label, placed)? {
                ledger.counts.pages_placed += 1;
            }
        }
    }

    place_overlays(config, &pairing, &label, &mut *document, ledger)?;

    if let Some(text_layer) = &config.text_layer {
        let added = document.add_text_layer(text_layer);
        ledger.recover(&label, added)?;
    }

    if !config.keywords.is_empty() {
        let appended = document.append_keywords(&config.keywords);
        ledger.recover(&label, appended)?;
    }

    let target = config.output_path(&pairing.doc_name);
    let saved = document.save_as(&target, config.format);
    if ledger.recover(&label, saved)? {
        ledger.counts.saved_count += 1;
    }

    Ok(())
}

fn place_overlays<H: EditorHost + ?Sized>(
    config: &RunConfig,
    pairing: &SourcePairing,
    label: &str,
    host: &mut H,
    ledger: &mut RunLedger,
) -> Result<(), HostError> {
    for overlay in &pairing.embedded_overlays {
        let layer_name = config
            .layer_names
            .embedded_overlay
            .clone()
            .unwrap_or_else(|| strip_extension(file_name(overlay)).to_string());
        let placed = host.place_embedded(overlay, None, &layer_name);
        if ledger.recover(label, placed)? {
            ledger.counts.embedded_overlays_placed += 1;
        }
    }

    for overlay in &pairing.raster_overlays {
        let layer_name = config
            .layer_names
            .raster_overlay
            .clone()
            .unwrap_or_else(|| strip_extension(file_name(overlay)).to_string());
        let added = host.add_layer_from_file(overlay, &layer_name);
        if ledger.recover(label, added)? {
            ledger.counts.raster_overlays_added += 1;
        }
    }

    Ok(())
}
