use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};
use walkdir::WalkDir;

use super::assemble::{ChunkAssembler, Section};
use super::units::{ArticleUnit, UnitSplitter};
use crate::cli::ChunkArgs;
use crate::model::{
    ChunkCounts, ChunkPaths, ChunkRecord, ChunkRunManifest, LegalArticle, LegalDocument,
    TransitoryItem,
};
use crate::tokenizer::TiktokenCodec;
use crate::util::{ensure_directory, now_utc_string, read_json_file, utc_compact_string, write_json_pretty};

pub fn run(args: ChunkArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    if !args.normalized_root.exists() {
        bail!(
            "normalized root not found: {}",
            args.normalized_root.display()
        );
    }

    info!(
        normalized_root = %args.normalized_root.display(),
        run_id = %run_id,
        "starting chunk"
    );

    let codec = TiktokenCodec::for_model(&args.tokenizer_model)?;
    let splitter = UnitSplitter::new()?;
    let assembler = ChunkAssembler::new()?;

    let doc_paths = collect_doc_paths(&args.normalized_root, &args.jurisdictions);
    let mut doc_id_filter: HashSet<String> = args.doc_ids.iter().cloned().collect();

    let mut counts = ChunkCounts {
        doc_count: doc_paths.len(),
        ..ChunkCounts::default()
    };
    let mut warnings = Vec::new();

    for doc_path in &doc_paths {
        if let Some(max_docs) = args.max_docs {
            if counts.processed_doc_count >= max_docs {
                break;
            }
        }

        let doc: LegalDocument = read_json_file(doc_path)
            .with_context(|| format!("failed to load document {}", doc_path.display()))?;

        if !args.doc_ids.is_empty() && !args.doc_ids.iter().any(|id| *id == doc.id) {
            continue;
        }

        let article_units = collect_units(&splitter, &doc.articles);
        let article_chunks = assembler.build_chunks(
            &doc,
            &article_units,
            &codec,
            args.max_tokens,
            args.overlap_tokens,
            Section::Article,
            args.validate_windows,
        )?;

        let transitory_articles = transitory_to_articles(&doc.transitory);
        let transitory_units = collect_units(&splitter, &transitory_articles);
        let transitory_chunks = assembler.build_chunks(
            &doc,
            &transitory_units,
            &codec,
            args.max_tokens,
            args.overlap_tokens,
            Section::Transitory,
            args.validate_windows,
        )?;

        if article_chunks.is_empty() && transitory_chunks.is_empty() {
            counts.empty_doc_count += 1;
            info!(doc_id = %doc.id, "no article or transitory chunks");
            continue;
        }

        let jurisdiction = if doc.jurisdiction.is_empty() {
            "unknown".to_string()
        } else {
            doc.jurisdiction.to_lowercase()
        };
        let out_path = write_chunks(
            &args.output_dir,
            &jurisdiction,
            &doc.id,
            article_chunks.iter().chain(transitory_chunks.iter()),
        )?;

        counts.processed_doc_count += 1;
        counts.unit_count += article_units.len() + transitory_units.len();
        counts.article_chunk_count += article_chunks.len();
        counts.transitory_chunk_count += transitory_chunks.len();
        counts.chunk_count += article_chunks.len() + transitory_chunks.len();
        doc_id_filter.remove(&doc.id);

        info!(
            doc_id = %doc.id,
            chunks = article_chunks.len() + transitory_chunks.len(),
            path = %out_path.display(),
            "wrote chunk file"
        );
    }

    if !doc_id_filter.is_empty() {
        let mut missing = doc_id_filter.into_iter().collect::<Vec<String>>();
        missing.sort();
        let warning = format!("requested doc ids not found: {}", missing.join(", "));
        warn!(warning = %warning, "doc id filter warning");
        warnings.push(warning);
    }

    let manifest = ChunkRunManifest {
        manifest_version: 1,
        run_id,
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_chunk_command(&args),
        tokenizer_model: args.tokenizer_model.clone(),
        max_tokens: args.max_tokens,
        overlap_tokens: args.overlap_tokens,
        paths: ChunkPaths {
            normalized_root: args.normalized_root.display().to_string(),
            output_dir: args.output_dir.display().to_string(),
        },
        counts,
        warnings,
        notes: vec![
            "Chunk command completed over normalized documents.".to_string(),
            "Chunk ids derive from doc, section, article, fraction, paragraph and window indices."
                .to_string(),
        ],
    };

    let manifest_path = args.chunk_manifest_path.clone().unwrap_or_else(|| {
        args.output_dir
            .join("manifests")
            .join(format!("chunk_run_{}.json", utc_compact_string(started_ts)))
    });
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote chunk run manifest");
    info!(
        processed = manifest.counts.processed_doc_count,
        chunks = manifest.counts.chunk_count,
        "chunk completed"
    );

    Ok(())
}

fn collect_doc_paths(normalized_root: &Path, jurisdictions: &[String]) -> Vec<PathBuf> {
    let jurisdiction_set: HashSet<String> = jurisdictions
        .iter()
        .map(|value| value.to_lowercase())
        .collect();

    let mut paths = WalkDir::new(normalized_root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false)
        })
        .filter(|path| {
            if jurisdiction_set.is_empty() {
                return true;
            }
            path.components().any(|component| {
                jurisdiction_set.contains(&component.as_os_str().to_string_lossy().to_lowercase())
            })
        })
        .collect::<Vec<PathBuf>>();

    paths.sort();
    paths
}

pub(crate) fn collect_units(splitter: &UnitSplitter, articles: &[LegalArticle]) -> Vec<ArticleUnit> {
    let mut units = Vec::new();
    for article in articles {
        units.extend(splitter.split_article(&article.number, &article.text));
    }
    units
}

/// Transitory items ride the same splitter/chunker path as articles: the item
/// label becomes the pseudo-article number, with a positional fallback when
/// the label is blank.
pub(crate) fn transitory_to_articles(items: &[TransitoryItem]) -> Vec<LegalArticle> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let label = item.label.trim();
            let number = if label.is_empty() {
                format!("TRANSITORIO_{}", idx + 1)
            } else {
                label.to_string()
            };

            LegalArticle {
                number,
                heading: None,
                text: item.text.clone(),
            }
        })
        .collect()
}

pub(crate) fn write_chunks<'a>(
    output_dir: &Path,
    jurisdiction: &str,
    doc_id: &str,
    records: impl Iterator<Item = &'a ChunkRecord>,
) -> Result<PathBuf> {
    let out_dir = output_dir.join(jurisdiction);
    ensure_directory(&out_dir)?;
    let out_path = out_dir.join(format!("{doc_id}_chunks.jsonl"));

    let mut file = File::create(&out_path)
        .with_context(|| format!("failed to create {}", out_path.display()))?;
    for record in records {
        let line = serde_json::to_string(record)
            .with_context(|| format!("failed to serialize chunk {}", record.chunk_id))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        file.write_all(b"\n")
            .with_context(|| format!("failed to write {}", out_path.display()))?;
    }

    Ok(out_path)
}

fn render_chunk_command(args: &ChunkArgs) -> String {
    let mut command = vec![
        "leychunk".to_string(),
        "chunk".to_string(),
        "--normalized-root".to_string(),
        args.normalized_root.display().to_string(),
        "--output-dir".to_string(),
        args.output_dir.display().to_string(),
        "--tokenizer-model".to_string(),
        args.tokenizer_model.clone(),
        "--max-tokens".to_string(),
        args.max_tokens.to_string(),
        "--overlap-tokens".to_string(),
        args.overlap_tokens.to_string(),
    ];

    for jurisdiction in &args.jurisdictions {
        command.push("--jurisdiction".to_string());
        command.push(jurisdiction.clone());
    }
    for doc_id in &args.doc_ids {
        command.push("--doc-id".to_string());
        command.push(doc_id.clone());
    }
    if let Some(max_docs) = args.max_docs {
        command.push("--max-docs".to_string());
        command.push(max_docs.to_string());
    }
    if args.validate_windows {
        command.push("--validate-windows".to_string());
    }

    command.join(" ")
}
