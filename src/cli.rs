use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::probe::DEFAULT_MAX_PAGES;
use crate::rules::DEFAULT_RULE;

#[derive(Parser, Debug)]
#[command(
    name = "embedpages",
    version,
    about = "Pair design documents with their PDF pages and overlays and plan the embed run"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the filename extraction rules in selection order.
    Rules(RulesArgs),
    /// Report which auxiliary files each source document pairs with.
    Pair(PairArgs),
    /// Probe page counts and record the embed plan for every source document.
    Embed(EmbedArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RulesArgs {
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FolderArgs {
    #[arg(long)]
    pub source_folder: PathBuf,

    #[arg(long)]
    pub document_folder: Option<PathBuf>,

    #[arg(long)]
    pub embedded_overlay_folder: Option<PathBuf>,

    #[arg(long)]
    pub raster_overlay_folder: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_RULE)]
    pub rule: String,
}

#[derive(Args, Debug, Clone)]
pub struct PairArgs {
    #[command(flatten)]
    pub folders: FolderArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Psd,
    Tiff,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Psd => "psd",
            Self::Tiff => "tiff",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct EmbedArgs {
    #[command(flatten)]
    pub folders: FolderArgs,

    #[arg(long)]
    pub output_folder: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Psd)]
    pub format: OutputFormat,

    #[arg(long)]
    pub document_layer_name: Option<String>,

    #[arg(long)]
    pub embedded_overlay_layer_name: Option<String>,

    #[arg(long)]
    pub raster_overlay_layer_name: Option<String>,

    #[arg(long = "keyword")]
    pub keywords: Vec<String>,

    #[arg(long)]
    pub text: Option<String>,

    #[arg(long, default_value_t = DEFAULT_MAX_PAGES, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_pages: u32,

    #[arg(long, default_value_t = 9)]
    pub probe_dpi: u32,

    #[arg(long, default_value = "pdftoppm")]
    pub pdftoppm: String,

    #[arg(long)]
    pub plan_path: Option<PathBuf>,
}
