use serde::Serialize;

use crate::cli::OutputFormat;
use crate::host::TextLayer;

#[derive(Debug, Clone, Serialize)]
pub struct RuleEntry {
    pub index: usize,
    pub name: String,
    pub key_expression: String,
    pub overlay_strategy: String,
    pub default: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourcePairingReport {
    pub source: String,
    pub doc_name: String,
    pub document_key: Option<String>,
    pub document: Option<String>,
    pub embedded_overlays: Vec<String>,
    pub raster_overlays: Vec<String>,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PairingReport {
    pub generated_at: String,
    pub rule: String,
    pub source_folder: String,
    pub source_count: usize,
    pub sources: Vec<SourcePairingReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlanStep {
    PlaceEmbedded {
        file: String,
        page: Option<u32>,
        layer_name: String,
    },
    AddLayerFromFile {
        file: String,
        layer_name: String,
    },
    AddTextLayer {
        text: TextLayer,
    },
    AppendKeywords {
        keywords: Vec<String>,
    },
    SaveAs {
        target: String,
        format: OutputFormat,
        options: SaveOptions,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveOptions {
    pub layers: bool,
    pub embed_color_profile: bool,
    pub alpha_channels: bool,
    pub transparency: bool,
    pub image_compression: Option<String>,
    pub layer_compression: Option<String>,
}

impl SaveOptions {
    pub fn for_format(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Psd => Self {
                layers: true,
                embed_color_profile: true,
                alpha_channels: false,
                transparency: false,
                image_compression: None,
                layer_compression: None,
            },
            OutputFormat::Tiff => Self {
                layers: true,
                embed_color_profile: true,
                alpha_channels: true,
                transparency: true,
                image_compression: Some("lzw".to_string()),
                layer_compression: Some("zip".to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedDocument {
    pub source: String,
    pub steps: Vec<PlanStep>,
    pub saved: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentProbe {
    pub source: String,
    pub document: String,
    pub sha256: Option<String>,
    pub page_count: u32,
    pub probes: u32,
    pub fell_back: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub logged_at: String,
    pub source: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunCounts {
    pub source_count: usize,
    pub processed_count: usize,
    pub saved_count: usize,
    pub pages_placed: usize,
    pub embedded_overlays_placed: usize,
    pub raster_overlays_added: usize,
    pub no_key_match_count: usize,
    pub diagnostic_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedPlanManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub completed_at: String,
    pub rule: String,
    pub source_folder: String,
    pub output_folder: String,
    pub format: OutputFormat,
    pub max_pages: u32,
    pub counts: RunCounts,
    pub probes: Vec<DocumentProbe>,
    pub documents: Vec<PlannedDocument>,
    pub diagnostics: Vec<Diagnostic>,
}
