use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use super::{ProbedDocument, RunLedger, RunOutcome, process_sources};
use crate::cli::EmbedArgs;
use crate::config::RunConfig;
use crate::files::{CandidateFileSet, FileKind, list_files};
use crate::host::{CancelFlag, PdftoppmProbe, PlanRecorder};
use crate::model::{DocumentProbe, EmbedPlanManifest};
use crate::util::{
    ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

pub fn run(args: EmbedArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("embed-{}", utc_compact_string(started_ts));

    let config = RunConfig::from_embed_args(&args)?;
    let sources = list_files(&config.folders.source_folder, FileKind::Source)?;
    if sources.is_empty() {
        warn!(
            path = %config.folders.source_folder.display(),
            "no source files found"
        );
        return Ok(());
    }

    let cancel = CancelFlag::new();
    let mut opener = PdftoppmProbe::new(std::env::temp_dir(), args.probe_dpi)
        .with_program(args.pdftoppm.clone())
        .with_cancel_flag(cancel.clone());
    let pdftoppm_version = opener.ensure_available()?;

    let candidates = CandidateFileSet::discover(&config.folders)?;
    ensure_directory(&config.output_folder)?;

    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        info!("received Ctrl+C, cancelling embed run");
        handler_flag.cancel();
    })
    .context("failed to install Ctrl+C handler")?;

    info!(
        run_id = %run_id,
        rule = config.rule.name(),
        sources = sources.len(),
        documents = candidates.documents.len(),
        pdftoppm = %pdftoppm_version,
        "starting embed run"
    );

    let mut recorder = PlanRecorder::new().with_cancel_flag(cancel);
    let mut ledger = RunLedger::default();

    let outcome = process_sources(
        &config,
        &candidates,
        &sources,
        &mut recorder,
        &mut opener,
        &mut ledger,
    );
    if outcome == RunOutcome::Cancelled {
        return Ok(());
    }

    let plan_path = args.plan_path.clone().unwrap_or_else(|| {
        config
            .output_folder
            .join(format!("embed_plan_{}.json", utc_compact_string(started_ts)))
    });

    let manifest = EmbedPlanManifest {
        manifest_version: 1,
        run_id,
        started_at,
        completed_at: now_utc_string(),
        rule: config.rule.name().to_string(),
        source_folder: config.folders.source_folder.display().to_string(),
        output_folder: config.output_folder.display().to_string(),
        format: config.format,
        max_pages: config.max_pages,
        counts: ledger.counts,
        probes: ledger.probes.iter().map(document_probe).collect(),
        documents: recorder.into_documents(),
        diagnostics: ledger.diagnostics,
    };

    write_json_pretty(&plan_path, &manifest)?;
    info!(path = %plan_path.display(), "wrote embed plan");
    info!(
        saved = manifest.counts.saved_count,
        diagnostics = manifest.counts.diagnostic_count,
        "done"
    );

    Ok(())
}

fn document_probe(probed: &ProbedDocument) -> DocumentProbe {
    let sha256 = match sha256_file(&probed.document) {
        Ok(hash) => Some(hash),
        Err(err) => {
            warn!(path = %probed.document.display(), error = %err, "failed to hash document");
            None
        }
    };

    DocumentProbe {
        source: probed.source.display().to_string(),
        document: probed.document.display().to_string(),
        sha256,
        page_count: probed.probe.page_count,
        probes: probed.probe.probes,
        fell_back: probed.probe.fell_back,
    }
}
