use std::io::{self, Write};

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::PairArgs;
use crate::config::RunFolders;
use crate::files::{CandidateFileSet, FileKind, list_files};
use crate::model::{PairingReport, SourcePairingReport};
use crate::pairing::pair_source;
use crate::rules::ActiveRule;
use crate::util::{now_utc_string, write_json_stdout};

pub fn run(args: PairArgs) -> Result<()> {
    let folders = RunFolders::from_args(&args.folders)?;
    let rule = ActiveRule::select(&args.folders.rule)?;
    let candidates = CandidateFileSet::discover(&folders)?;
    let sources = list_files(&folders.source_folder, FileKind::Source)?;

    if sources.is_empty() {
        warn!(path = %folders.source_folder.display(), "no source files found");
    }

    let reports = sources
        .iter()
        .map(|source| pair_source(source, &rule, &candidates).to_report())
        .collect::<Vec<_>>();

    info!(
        rule = rule.name(),
        sources = reports.len(),
        unmatched = reports.iter().filter(|report| !report.issues.is_empty()).count(),
        "pairing complete"
    );

    let report = PairingReport {
        generated_at: now_utc_string(),
        rule: rule.name().to_string(),
        source_folder: folders.source_folder.display().to_string(),
        source_count: reports.len(),
        sources: reports,
    };

    if args.json {
        write_json_stdout(&report)
    } else {
        write_text_report(&report.sources)
    }
}

fn write_text_report(sources: &[SourcePairingReport]) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    for source in sources {
        writeln!(
            output,
            "{} [key: {}]",
            source.doc_name,
            source.document_key.as_deref().unwrap_or("-")
        )?;
        writeln!(
            output,
            "  document: {}",
            source.document.as_deref().unwrap_or("-")
        )?;
        for overlay in &source.embedded_overlays {
            writeln!(output, "  embedded: {overlay}")?;
        }
        for overlay in &source.raster_overlays {
            writeln!(output, "  raster: {overlay}")?;
        }
        for issue in &source.issues {
            writeln!(output, "  issue: {issue}")?;
        }
    }

    output.flush()?;
    Ok(())
}
