use std::path::Path;

use tracing::debug;

use super::{CancelFlag, EditorHost, HostError, TextLayer};
use crate::cli::OutputFormat;
use crate::model::{PlanStep, PlannedDocument, SaveOptions};

/// Records editing steps into an embed plan instead of driving an editor.
///
/// Operations referencing files that do not exist fail the way the editor
/// would, so the plan only ever names real inputs.
#[derive(Debug, Default)]
pub struct PlanRecorder {
    documents: Vec<PlannedDocument>,
    active: Option<PlannedDocument>,
    cancel: CancelFlag,
}

impl PlanRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn into_documents(mut self) -> Vec<PlannedDocument> {
        self.close_document();
        self.documents
    }

    fn active(&mut self, operation: &'static str) -> Result<&mut PlannedDocument, HostError> {
        self.active
            .as_mut()
            .ok_or_else(|| HostError::failed(operation, "no document is open"))
    }

    fn require_file(operation: &'static str, file: &Path) -> Result<(), HostError> {
        if file.is_file() {
            Ok(())
        } else {
            Err(HostError::failed(
                operation,
                format!("file not found: {}", file.display()),
            ))
        }
    }
}

impl EditorHost for PlanRecorder {
    fn open_document(&mut self, source: &Path) -> Result<(), HostError> {
        self.cancel.check()?;
        Self::require_file("open document", source)?;
        self.close_document();
        self.active = Some(PlannedDocument {
            source: source.display().to_string(),
            steps: Vec::new(),
            saved: false,
        });
        Ok(())
    }

    fn place_embedded(
        &mut self,
        file: &Path,
        page: Option<u32>,
        layer_name: &str,
    ) -> Result<(), HostError> {
        Self::require_file("place embedded", file)?;
        self.active("place embedded")?.steps.push(PlanStep::PlaceEmbedded {
            file: file.display().to_string(),
            page,
            layer_name: layer_name.to_string(),
        });
        Ok(())
    }

    fn add_layer_from_file(&mut self, file: &Path, layer_name: &str) -> Result<(), HostError> {
        Self::require_file("add layer", file)?;
        self.active("add layer")?.steps.push(PlanStep::AddLayerFromFile {
            file: file.display().to_string(),
            layer_name: layer_name.to_string(),
        });
        Ok(())
    }

    fn add_text_layer(&mut self, text: &TextLayer) -> Result<(), HostError> {
        self.active("add text layer")?
            .steps
            .push(PlanStep::AddTextLayer { text: text.clone() });
        Ok(())
    }

    fn append_keywords(&mut self, keywords: &[String]) -> Result<(), HostError> {
        self.active("append keywords")?
            .steps
            .push(PlanStep::AppendKeywords {
                keywords: keywords.to_vec(),
            });
        Ok(())
    }

    fn save_as(&mut self, target: &Path, format: OutputFormat) -> Result<(), HostError> {
        let document = self.active("save")?;
        document.steps.push(PlanStep::SaveAs {
            target: target.display().to_string(),
            format,
            options: SaveOptions::for_format(format),
        });
        document.saved = true;
        Ok(())
    }

    fn close_document(&mut self) {
        if let Some(document) = self.active.take() {
            debug!(
                source = %document.source,
                steps = document.steps.len(),
                saved = document.saved,
                "closed document"
            );
            self.documents.push(document);
        }
    }
}
