use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One entry of the law-sources index produced by the upstream scraper stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub source: String,
    pub jurisdiction: String,
    pub url: String,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A single positioned word as emitted by the external PDF word extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionedWord {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

/// One page of extractor output. `text` carries the extractor's plain-text
/// rendering, used as a fallback when no words were extracted for the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageWords {
    pub width: f64,
    #[serde(default)]
    pub words: Vec<PositionedWord>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageWordsFile {
    pub pages: Vec<PageWords>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalArticle {
    pub number: String,
    #[serde(default)]
    pub heading: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitoryItem {
    pub label: String,
    pub text: String,
}

/// Normalized document written by `segment` and consumed by `chunk`.
///
/// `metadata` values may be arbitrary JSON when the file comes from another
/// producer; the chunk assembler stringifies them before attaching them to
/// chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalDocument {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub source: String,
    pub jurisdiction: String,
    pub source_url: String,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub plain_text: Option<String>,
    #[serde(default)]
    pub articles: Vec<LegalArticle>,
    #[serde(default)]
    pub transitory: Vec<TransitoryItem>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Final persisted chunk record, one JSONL line per chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub doc_id: String,
    pub article_number: String,
    pub fraction_label: Option<String>,
    pub paragraph_index: usize,
    pub chunk_index: usize,
    pub section: String,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizedChunkRecord {
    #[serde(flatten)]
    pub record: ChunkRecord,
    pub token_count: usize,
    pub tokenizer_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_ids: Option<Vec<u32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSourceFile {
    pub doc_id: String,
    pub filename: String,
    pub kind: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub raw_root: String,
    pub sources_path: String,
    pub entry_count: usize,
    pub missing_doc_ids: Vec<String>,
    pub entries: Vec<RawSourceFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrPendingEntry {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub url: String,
    pub parse_issue: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentPaths {
    pub data_root: String,
    pub raw_root: String,
    pub sources_path: String,
    pub normalized_dir: String,
    pub ocr_pending_path: String,
    pub inventory_manifest_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentCounts {
    pub source_count: usize,
    pub processed_doc_count: usize,
    pub missing_raw_count: usize,
    pub article_count_total: usize,
    pub transitory_count_total: usize,
    pub ocr_pending_count: usize,
    pub sequential_docs: usize,
    pub relaxed_docs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub paths: SegmentPaths,
    pub counts: SegmentCounts,
    pub source_hashes: Vec<RawSourceFile>,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPaths {
    pub normalized_root: String,
    pub output_dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkCounts {
    pub doc_count: usize,
    pub processed_doc_count: usize,
    pub empty_doc_count: usize,
    pub unit_count: usize,
    pub chunk_count: usize,
    pub article_chunk_count: usize,
    pub transitory_chunk_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub tokenizer_model: String,
    pub max_tokens: usize,
    pub overlap_tokens: usize,
    pub paths: ChunkPaths,
    pub counts: ChunkCounts,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizePaths {
    pub chunks_dir: String,
    pub output_dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizeCounts {
    pub file_count: usize,
    pub chunk_count: usize,
    pub token_count_total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizeRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub tokenizer_model: String,
    pub include_token_ids: bool,
    pub validate_decode: bool,
    pub paths: TokenizePaths,
    pub counts: TokenizeCounts,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
}
