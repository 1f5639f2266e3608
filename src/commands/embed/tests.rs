use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::*;
use crate::cli::OutputFormat;
use crate::config::{LayerNames, RunConfig, RunFolders};
use crate::files::CandidateFileSet;
use crate::host::{EditorHost, HostError, PageOpener, TextLayer};
use crate::rules::ActiveRule;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Open(String),
    Place(String, Option<u32>, String),
    Layer(String, String),
    Text(String),
    Keywords(Vec<String>),
    Save(String),
    Close,
}

#[derive(Default)]
struct FakeHost {
    calls: Vec<Call>,
    fail_open: Vec<String>,
    fail_page: Option<u32>,
    cancel_on_save: bool,
}

fn name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

impl EditorHost for FakeHost {
    fn open_document(&mut self, source: &Path) -> Result<(), HostError> {
        if self.fail_open.contains(&name(source)) {
            return Err(HostError::failed("open document", "locked"));
        }
        self.calls.push(Call::Open(name(source)));
        Ok(())
    }

    fn place_embedded(
        &mut self,
        file: &Path,
        page: Option<u32>,
        layer_name: &str,
    ) -> Result<(), HostError> {
        if page.is_some() && page == self.fail_page {
            return Err(HostError::failed("place embedded", "out of memory"));
        }
        self.calls
            .push(Call::Place(name(file), page, layer_name.to_string()));
        Ok(())
    }

    fn add_layer_from_file(&mut self, file: &Path, layer_name: &str) -> Result<(), HostError> {
        self.calls
            .push(Call::Layer(name(file), layer_name.to_string()));
        Ok(())
    }

    fn add_text_layer(&mut self, text: &TextLayer) -> Result<(), HostError> {
        self.calls.push(Call::Text(text.contents.clone()));
        Ok(())
    }

    fn append_keywords(&mut self, keywords: &[String]) -> Result<(), HostError> {
        self.calls.push(Call::Keywords(keywords.to_vec()));
        Ok(())
    }

    fn save_as(&mut self, target: &Path, _format: OutputFormat) -> Result<(), HostError> {
        if self.cancel_on_save {
            return Err(HostError::Cancelled);
        }
        self.calls.push(Call::Save(target.display().to_string()));
        Ok(())
    }

    fn close_document(&mut self) {
        self.calls.push(Call::Close);
    }
}

/// Succeeds for pages 1..=N of each known document.
#[derive(Default)]
struct FakeOpener {
    pages: HashMap<String, u32>,
    opens: u32,
    closes: u32,
}

impl PageOpener for FakeOpener {
    type Session = ();

    fn open_page(&mut self, document: &Path, page: u32) -> Result<(), HostError> {
        self.opens += 1;
        match self.pages.get(&name(document)) {
            Some(&count) if page <= count => Ok(()),
            _ => Err(HostError::PageOutOfRange { page }),
        }
    }

    fn close_discarding(&mut self, _session: ()) {
        self.closes += 1;
    }
}

fn config(rule: &str) -> RunConfig {
    RunConfig {
        folders: RunFolders {
            source_folder: PathBuf::from("/src"),
            document_folder: Some(PathBuf::from("/docs")),
            embedded_overlay_folder: Some(PathBuf::from("/tiff")),
            raster_overlay_folder: Some(PathBuf::from("/jpeg")),
        },
        rule: ActiveRule::select(rule).unwrap(),
        output_folder: PathBuf::from("/out"),
        format: OutputFormat::Psd,
        layer_names: LayerNames::default(),
        keywords: Vec::new(),
        text_layer: None,
        max_pages: 100,
    }
}

fn under(folder: &str, names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(|name| Path::new(folder).join(name)).collect()
}

fn places(host: &FakeHost) -> Vec<&Call> {
    host.calls
        .iter()
        .filter(|call| matches!(call, Call::Place(_, Some(_), _)))
        .collect()
}

#[test]
fn places_every_probed_page_of_the_paired_document() {
    let config = config("Loft|Ann");
    let candidates = CandidateFileSet {
        documents: under("/docs", &["1234567_001.pdf"]),
        ..CandidateFileSet::default()
    };
    let sources = under("/src", &["1234567_001.psd"]);
    let mut host = FakeHost::default();
    let mut opener = FakeOpener::default();
    opener.pages.insert("1234567_001.pdf".to_string(), 3);
    let mut ledger = RunLedger::default();

    let outcome = process_sources(
        &config,
        &candidates,
        &sources,
        &mut host,
        &mut opener,
        &mut ledger,
    );

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(ledger.probes.len(), 1);
    assert_eq!(ledger.probes[0].probe.page_count, 3);
    assert_eq!(opener.opens, 98);
    assert_eq!(opener.closes, 1);

    assert_eq!(
        host.calls,
        vec![
            Call::Open("1234567_001.psd".to_string()),
            Call::Place("1234567_001.pdf".to_string(), Some(1), "1234567_001 (Pg 1)".to_string()),
            Call::Place("1234567_001.pdf".to_string(), Some(2), "1234567_001 (Pg 2)".to_string()),
            Call::Place("1234567_001.pdf".to_string(), Some(3), "1234567_001 (Pg 3)".to_string()),
            Call::Save("/out/1234567_001.psd".to_string()),
            Call::Close,
        ]
    );
    assert_eq!(ledger.counts.pages_placed, 3);
    assert_eq!(ledger.counts.saved_count, 1);
    assert!(ledger.diagnostics.is_empty());
}

#[test]
fn no_key_match_still_adds_raster_overlays() {
    let config = config("UNIQLO");
    let candidates = CandidateFileSet {
        documents: under("/docs", &["no-match-here.pdf"]),
        embedded_overlays: under("/tiff", &["no-match-here.tif"]),
        raster_overlays: under("/jpeg", &["no-match-here swatch.jpg", "other.jpg"]),
    };
    let sources = under("/src", &["no-match-here.tif"]);
    let mut host = FakeHost::default();
    let mut opener = FakeOpener::default();
    let mut ledger = RunLedger::default();

    let outcome = process_sources(
        &config,
        &candidates,
        &sources,
        &mut host,
        &mut opener,
        &mut ledger,
    );

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(opener.opens, 0);
    assert!(ledger.probes.is_empty());
    assert!(places(&host).is_empty());
    assert!(host.calls.contains(&Call::Layer(
        "no-match-here swatch.jpg".to_string(),
        "no-match-here swatch".to_string()
    )));
    assert!(host.calls.contains(&Call::Save("/out/no-match-here.psd".to_string())));
    assert_eq!(ledger.counts.no_key_match_count, 1);
    assert_eq!(ledger.diagnostics.len(), 1);
    assert_eq!(ledger.diagnostics[0].source, "no-match-here.tif");
}

#[test]
fn placement_failures_are_logged_and_the_document_is_still_saved() {
    let config = config("Loft|Ann");
    let candidates = CandidateFileSet {
        documents: under("/docs", &["1234567_001.pdf"]),
        ..CandidateFileSet::default()
    };
    let sources = under("/src", &["1234567_001.psd"]);
    let mut host = FakeHost {
        fail_page: Some(2),
        ..FakeHost::default()
    };
    let mut opener = FakeOpener::default();
    opener.pages.insert("1234567_001.pdf".to_string(), 3);
    let mut ledger = RunLedger::default();

    process_sources(
        &config,
        &candidates,
        &sources,
        &mut host,
        &mut opener,
        &mut ledger,
    );

    assert_eq!(places(&host).len(), 2);
    assert_eq!(ledger.counts.pages_placed, 2);
    assert_eq!(ledger.counts.saved_count, 1);
    assert_eq!(ledger.diagnostics.len(), 1);
    assert!(ledger.diagnostics[0].message.contains("out of memory"));
}

#[test]
fn open_failures_skip_only_that_source() {
    let config = config("NY&CO");
    let sources = under("/src", &["first.psd", "second.psd"]);
    let mut host = FakeHost {
        fail_open: vec!["first.psd".to_string()],
        ..FakeHost::default()
    };
    let mut opener = FakeOpener::default();
    let mut ledger = RunLedger::default();

    let outcome = process_sources(
        &config,
        &CandidateFileSet::default(),
        &sources,
        &mut host,
        &mut opener,
        &mut ledger,
    );

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(ledger.counts.processed_count, 1);
    assert_eq!(
        host.calls,
        vec![
            Call::Open("second.psd".to_string()),
            Call::Save("/out/second.psd".to_string()),
            Call::Close,
        ]
    );
    assert_eq!(ledger.diagnostics.len(), 1);
}

#[test]
fn cancellation_stops_the_run_and_still_closes_the_document() {
    let config = config("NY&CO");
    let sources = under("/src", &["first.psd", "second.psd"]);
    let mut host = FakeHost {
        cancel_on_save: true,
        ..FakeHost::default()
    };
    let mut opener = FakeOpener::default();
    let mut ledger = RunLedger::default();

    let outcome = process_sources(
        &config,
        &CandidateFileSet::default(),
        &sources,
        &mut host,
        &mut opener,
        &mut ledger,
    );

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(
        host.calls,
        vec![Call::Open("first.psd".to_string()), Call::Close]
    );
    assert!(ledger.diagnostics.is_empty());
}

#[test]
fn layer_overrides_text_and_keywords_are_applied_in_order() {
    let mut config = config("Cacique");
    config.layer_names = LayerNames {
        document: Some("Tech Pack".to_string()),
        embedded_overlay: Some("Artwork".to_string()),
        raster_overlay: Some("Swatch".to_string()),
    };
    config.keywords = vec!["approved".to_string()];
    config.text_layer = Some(TextLayer::new("SAMPLE"));
    config.format = OutputFormat::Tiff;

    let source_name = "cq-123456_0123456789_7654321";
    let candidates = CandidateFileSet {
        documents: under("/docs", &[format!("{source_name}.pdf").as_str()]),
        embedded_overlays: under("/tiff", &[format!("{source_name}_art.tif").as_str()]),
        raster_overlays: under("/jpeg", &["0123456789.jpg", "9999999999.jpg"]),
    };
    let sources = under("/src", &[format!("{source_name}.psd").as_str()]);
    let mut host = FakeHost::default();
    let mut opener = FakeOpener::default();
    opener.pages.insert(format!("{source_name}.pdf"), 1);
    let mut ledger = RunLedger::default();

    process_sources(
        &config,
        &candidates,
        &sources,
        &mut host,
        &mut opener,
        &mut ledger,
    );

    assert_eq!(
        host.calls,
        vec![
            Call::Open(format!("{source_name}.psd")),
            Call::Place(format!("{source_name}.pdf"), Some(1), "Tech Pack (Pg 1)".to_string()),
            Call::Place(format!("{source_name}_art.tif"), None, "Artwork".to_string()),
            Call::Layer("0123456789.jpg".to_string(), "Swatch".to_string()),
            Call::Text("SAMPLE".to_string()),
            Call::Keywords(vec!["approved".to_string()]),
            Call::Save(format!("/out/{source_name}.tiff")),
            Call::Close,
        ]
    );
    assert_eq!(ledger.counts.embedded_overlays_placed, 1);
    assert_eq!(ledger.counts.raster_overlays_added, 1);
}
