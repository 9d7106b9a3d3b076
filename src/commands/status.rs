use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::cli::StatusArgs;
use crate::model::{
    ChunkRunManifest, RawInventoryManifest, SegmentRunManifest, TokenizeRunManifest,
};
use crate::util::read_json_file;

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.data_root.join("manifests");

    info!(data_root = %args.data_root.display(), "status requested");

    let inventory_path = manifest_dir.join("raw_inventory.json");
    if inventory_path.exists() {
        let inventory: RawInventoryManifest = read_json_file(&inventory_path)?;
        info!(
            generated_at = %inventory.generated_at,
            entry_count = inventory.entry_count,
            missing = inventory.missing_doc_ids.len(),
            "loaded inventory manifest"
        );
    } else {
        warn!(path = %inventory_path.display(), "inventory manifest missing");
    }

    match latest_manifest(&manifest_dir, "segment_run_")? {
        Some(path) => {
            let manifest: SegmentRunManifest = read_json_file(&path)?;
            info!(
                run_id = %manifest.run_id,
                status = %manifest.status,
                processed = manifest.counts.processed_doc_count,
                articles = manifest.counts.article_count_total,
                ocr_pending = manifest.counts.ocr_pending_count,
                warnings = manifest.warnings.len(),
                "latest segment run"
            );
        }
        None => warn!(dir = %manifest_dir.display(), "no segment run manifest"),
    }

    let chunk_manifest_dir = args.data_root.join("chunks").join("manifests");
    match latest_manifest(&chunk_manifest_dir, "chunk_run_")? {
        Some(path) => {
            let manifest: ChunkRunManifest = read_json_file(&path)?;
            info!(
                run_id = %manifest.run_id,
                status = %manifest.status,
                processed = manifest.counts.processed_doc_count,
                chunks = manifest.counts.chunk_count,
                tokenizer_model = %manifest.tokenizer_model,
                "latest chunk run"
            );
        }
        None => warn!(dir = %chunk_manifest_dir.display(), "no chunk run manifest"),
    }

    let tokenize_manifest_dir = args.data_root.join("tokenized_chunks").join("manifests");
    match latest_manifest(&tokenize_manifest_dir, "tokenize_run_")? {
        Some(path) => {
            let manifest: TokenizeRunManifest = read_json_file(&path)?;
            info!(
                run_id = %manifest.run_id,
                status = %manifest.status,
                chunks = manifest.counts.chunk_count,
                tokens = manifest.counts.token_count_total,
                "latest tokenize run"
            );
        }
        None => warn!(dir = %tokenize_manifest_dir.display(), "no tokenize run manifest"),
    }

    let normalized_docs = count_files(&args.data_root.join("normalized"), |name| {
        name.ends_with(".json")
    });
    let chunk_files = count_files(&args.data_root.join("chunks"), |name| {
        name.ends_with("_chunks.jsonl")
    });
    let tokenized_files = count_files(&args.data_root.join("tokenized_chunks"), |name| {
        name.ends_with("_tokens.jsonl")
    });

    info!(
        normalized_docs,
        chunk_files, tokenized_files, "data tree status"
    );

    Ok(())
}

fn latest_manifest(dir: &Path, prefix: &str) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }

    let mut candidates = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(prefix) && name.ends_with(".json") {
            candidates.push(entry.path());
        }
    }

    candidates.sort();
    Ok(candidates.pop())
}

fn count_files<F: Fn(&str) -> bool>(root: &Path, matches: F) -> usize {
    if !root.exists() {
        return 0;
    }

    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| matches(&entry.file_name().to_string_lossy()))
        .count()
}
