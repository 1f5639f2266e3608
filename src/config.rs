use std::path::PathBuf;

use anyhow::{Result, bail};

use crate::cli::{EmbedArgs, FolderArgs, OutputFormat};
use crate::host::TextLayer;
use crate::rules::ActiveRule;
use crate::util::non_empty;

#[derive(Debug, Clone)]
pub struct RunFolders {
    pub source_folder: PathBuf,
    pub document_folder: Option<PathBuf>,
    pub embedded_overlay_folder: Option<PathBuf>,
    pub raster_overlay_folder: Option<PathBuf>,
}

impl RunFolders {
    pub fn from_args(args: &FolderArgs) -> Result<Self> {
        if !args.source_folder.is_dir() {
            bail!("source folder not found: {}", args.source_folder.display());
        }

        Ok(Self {
            source_folder: args.source_folder.clone(),
            document_folder: args.document_folder.clone(),
            embedded_overlay_folder: args.embedded_overlay_folder.clone(),
            raster_overlay_folder: args.raster_overlay_folder.clone(),
        })
    }
}

/// Optional layer names; `None` keeps the name the placed file gives the layer.
#[derive(Debug, Clone, Default)]
pub struct LayerNames {
    pub document: Option<String>,
    pub embedded_overlay: Option<String>,
    pub raster_overlay: Option<String>,
}

/// Everything an embed run needs, fixed before the first source file.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub folders: RunFolders,
    pub rule: ActiveRule,
    pub output_folder: PathBuf,
    pub format: OutputFormat,
    pub layer_names: LayerNames,
    pub keywords: Vec<String>,
    pub text_layer: Option<TextLayer>,
    pub max_pages: u32,
}

impl RunConfig {
    pub fn from_embed_args(args: &EmbedArgs) -> Result<Self> {
        let folders = RunFolders::from_args(&args.folders)?;
        let rule = ActiveRule::select(&args.folders.rule)?;

        Ok(Self {
            folders,
            rule,
            output_folder: args.output_folder.clone(),
            format: args.format,
            layer_names: LayerNames {
                document: non_empty(args.document_layer_name.as_deref()),
                embedded_overlay: non_empty(args.embedded_overlay_layer_name.as_deref()),
                raster_overlay: non_empty(args.raster_overlay_layer_name.as_deref()),
            },
            keywords: args
                .keywords
                .iter()
                .filter_map(|keyword| non_empty(Some(keyword.as_str())))
                .collect(),
            text_layer: non_empty(args.text.as_deref()).map(TextLayer::new),
            max_pages: args.max_pages,
        })
    }

    pub fn output_path(&self, doc_name: &str) -> PathBuf {
        self.output_folder
            .join(format!("{}.{}", doc_name, self.format.extension()))
    }
}
