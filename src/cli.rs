use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "leychunk",
    version,
    about = "Mexican statute segmentation and citation-aligned chunking"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Segment(SegmentArgs),
    Chunk(ChunkArgs),
    Tokenize(TokenizeArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = "data")]
    pub data_root: PathBuf,

    #[arg(long, default_value = "data/law_sources.json")]
    pub sources: PathBuf,

    #[arg(long)]
    pub raw_root: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SegmentArgs {
    #[arg(long, default_value = "data")]
    pub data_root: PathBuf,

    #[arg(long, default_value = "data/law_sources.json")]
    pub sources: PathBuf,

    #[arg(long)]
    pub raw_root: Option<PathBuf>,

    #[arg(long)]
    pub inventory_manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub segment_manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub refresh_inventory: bool,

    #[arg(long = "doc-id")]
    pub doc_ids: Vec<String>,

    #[arg(long)]
    pub max_docs: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct ChunkArgs {
    #[arg(long, default_value = "data/normalized")]
    pub normalized_root: PathBuf,

    #[arg(long, default_value = "data/chunks")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub chunk_manifest_path: Option<PathBuf>,

    #[arg(long = "jurisdiction")]
    pub jurisdictions: Vec<String>,

    #[arg(long = "doc-id")]
    pub doc_ids: Vec<String>,

    #[arg(long)]
    pub max_docs: Option<usize>,

    #[arg(long, default_value = "gpt-4o-mini")]
    pub tokenizer_model: String,

    #[arg(long, default_value_t = 320)]
    pub max_tokens: usize,

    #[arg(long, default_value_t = 60)]
    pub overlap_tokens: usize,

    #[arg(long, default_value_t = false)]
    pub validate_windows: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TokenizeArgs {
    #[arg(long, default_value = "data/chunks")]
    pub chunks_dir: PathBuf,

    #[arg(long, default_value = "data/tokenized_chunks")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub tokenize_manifest_path: Option<PathBuf>,

    #[arg(long, default_value = "gpt-4o-mini")]
    pub model: String,

    #[arg(long = "jurisdiction")]
    pub jurisdictions: Vec<String>,

    #[arg(long = "doc-id")]
    pub doc_ids: Vec<String>,

    #[arg(long)]
    pub max_chunks: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub include_token_ids: bool,

    #[arg(long, default_value_t = false)]
    pub validate_decode: bool,

    #[arg(long, default_value_t = 256)]
    pub batch_size: usize,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "data")]
    pub data_root: PathBuf,
}
