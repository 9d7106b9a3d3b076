use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use super::articles::{ArticleDetector, PARSE_ISSUE_EMPTY_TEXT};
use super::html::html_to_text;
use super::layout::LayoutReconstructor;
use super::transitory::TransitorySplitter;
use crate::cli::SegmentArgs;
use crate::commands::inventory::{self, RawKind};
use crate::model::{
    LegalDocument, OcrPendingEntry, PageWordsFile, RawSourceFile, SegmentCounts, SegmentPaths,
    SegmentRunManifest, SourceEntry,
};
use crate::util::{
    ensure_directory, now_utc_string, read_json_file, utc_compact_string, write_json_pretty,
};

pub fn run(args: SegmentArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let data_root = args.data_root.clone();
    let raw_root = args
        .raw_root
        .clone()
        .unwrap_or_else(|| data_root.join("raw"));
    let manifest_dir = data_root.join("manifests");
    ensure_directory(&manifest_dir)?;

    let inventory_manifest_path = args
        .inventory_manifest_path
        .clone()
        .unwrap_or_else(|| manifest_dir.join("raw_inventory.json"));
    let segment_manifest_path = args.segment_manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "segment_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });
    let normalized_dir = data_root.join("normalized");
    let ocr_pending_path = data_root.join("ocr_pending.json");

    info!(data_root = %data_root.display(), run_id = %run_id, "starting segment");

    let sources: Vec<SourceEntry> = read_json_file(&args.sources)?;
    let raw_inventory = inventory::load_or_refresh_manifest(
        &raw_root,
        &args.sources,
        &sources,
        &inventory_manifest_path,
        args.refresh_inventory,
    )?;

    let raw_by_doc: HashMap<&str, &RawSourceFile> = raw_inventory
        .entries
        .iter()
        .map(|entry| (entry.doc_id.as_str(), entry))
        .collect();

    let reconstructor = LayoutReconstructor::new()?;
    let detector = ArticleDetector::new()?;
    let transitory = TransitorySplitter::new()?;

    let doc_id_filter: HashSet<&str> = args.doc_ids.iter().map(String::as_str).collect();

    let mut counts = SegmentCounts {
        source_count: sources.len(),
        ..SegmentCounts::default()
    };
    let mut warnings = Vec::new();
    let mut ocr_pending = Vec::new();

    for source in &sources {
        if let Some(max_docs) = args.max_docs {
            if counts.processed_doc_count >= max_docs {
                break;
            }
        }
        if !doc_id_filter.is_empty() && !doc_id_filter.contains(source.id.as_str()) {
            continue;
        }

        let Some(raw_entry) = raw_by_doc.get(source.id.as_str()) else {
            counts.missing_raw_count += 1;
            warnings.push(format!("missing raw file for {}", source.id));
            continue;
        };

        let raw_path = raw_root.join(&raw_entry.filename);
        let plain_text = match extract_plain_text(&raw_path, &raw_entry.kind, &reconstructor) {
            Ok(text) => text,
            Err(err) => {
                let warning = format!("failed to extract text for {}: {err}", source.id);
                warn!(warning = %warning, "extraction warning");
                warnings.push(warning);
                continue;
            }
        };

        let doc = build_document(source, plain_text, &detector, &transitory);

        counts.processed_doc_count += 1;
        counts.article_count_total += doc.articles.len();
        counts.transitory_count_total += doc.transitory.len();
        match doc.metadata.get("detection_method").and_then(|v| v.as_str()) {
            Some("sequential") => counts.sequential_docs += 1,
            Some("relaxed") => counts.relaxed_docs += 1,
            _ => {}
        }

        if let Some(parse_issue) = doc.metadata.get("parse_issue").and_then(|v| v.as_str()) {
            if parse_issue.starts_with("ocr_pending") {
                counts.ocr_pending_count += 1;
                ocr_pending.push(OcrPendingEntry {
                    id: doc.id.clone(),
                    title: doc.title.clone(),
                    doc_type: doc.doc_type.clone(),
                    url: doc.source_url.clone(),
                    parse_issue: parse_issue.to_string(),
                });
            }
        }

        save_document(&doc, &normalized_dir)?;
        info!(
            doc_id = %doc.id,
            articles = doc.articles.len(),
            transitory = doc.transitory.len(),
            "saved normalized document"
        );
    }

    if !ocr_pending.is_empty() {
        write_json_pretty(&ocr_pending_path, &ocr_pending)?;
        info!(
            path = %ocr_pending_path.display(),
            count = ocr_pending.len(),
            "wrote ocr-pending report"
        );
    }

    let manifest = SegmentRunManifest {
        manifest_version: 1,
        run_id,
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_segment_command(&args),
        paths: SegmentPaths {
            data_root: data_root.display().to_string(),
            raw_root: raw_root.display().to_string(),
            sources_path: args.sources.display().to_string(),
            normalized_dir: normalized_dir.display().to_string(),
            ocr_pending_path: ocr_pending_path.display().to_string(),
            inventory_manifest_path: inventory_manifest_path.display().to_string(),
        },
        counts,
        source_hashes: raw_inventory.entries,
        warnings,
        notes: vec![
            "Segment command completed using local raw files and manifests.".to_string(),
            "Article boundaries detected with sequential-then-relaxed header strategies."
                .to_string(),
        ],
    };

    write_json_pretty(&segment_manifest_path, &manifest)?;
    info!(path = %segment_manifest_path.display(), "wrote segment run manifest");
    info!(
        processed = manifest.counts.processed_doc_count,
        ocr_pending = manifest.counts.ocr_pending_count,
        "segment completed"
    );

    Ok(())
}

fn extract_plain_text(
    raw_path: &Path,
    kind: &str,
    reconstructor: &LayoutReconstructor,
) -> Result<String> {
    match RawKind::parse(kind) {
        Some(RawKind::PagesJson) => {
            let file: PageWordsFile = read_json_file(raw_path)?;
            Ok(reconstructor.document_text(&file.pages))
        }
        Some(RawKind::Html) => {
            let html = fs::read_to_string(raw_path)
                .with_context(|| format!("failed to read {}", raw_path.display()))?;
            Ok(html_to_text(&html))
        }
        Some(RawKind::Txt) => fs::read_to_string(raw_path)
            .with_context(|| format!("failed to read {}", raw_path.display())),
        None => anyhow::bail!("unknown raw file kind: {kind}"),
    }
}

/// Convert a source entry plus extracted plain text into a normalized
/// document with structured articles and transitory items. `parse_issue` is
/// recorded as metadata, never raised: structural absence is an expected
/// data-quality condition that gets batch triage, not a crash.
pub(crate) fn build_document(
    entry: &SourceEntry,
    plain_text: String,
    detector: &ArticleDetector,
    transitory: &TransitorySplitter,
) -> LegalDocument {
    let split = detector.split_articles_and_tail(&plain_text, transitory);
    let (transitory_items, trans_preamble) = transitory.split_region(&split.tail);

    let mut parse_issue = split.parse_issue;
    if plain_text.trim().is_empty() {
        parse_issue = Some(PARSE_ISSUE_EMPTY_TEXT.to_string());
    }

    let mut metadata = BTreeMap::new();
    metadata.insert(
        "original_title".to_string(),
        serde_json::Value::String(entry.title.clone()),
    );
    metadata.insert(
        "source".to_string(),
        serde_json::Value::String(entry.source.clone()),
    );
    metadata.insert(
        "num_articles".to_string(),
        serde_json::Value::String(split.articles.len().to_string()),
    );
    metadata.insert(
        "num_transitory".to_string(),
        serde_json::Value::String(transitory_items.len().to_string()),
    );
    metadata.insert(
        "detection_method".to_string(),
        serde_json::Value::String(split.detection_method.as_str().to_string()),
    );
    if !split.preamble.is_empty() {
        metadata.insert(
            "preamble".to_string(),
            serde_json::Value::String(split.preamble.clone()),
        );
    }
    if !trans_preamble.is_empty() {
        metadata.insert(
            "transitory_preamble".to_string(),
            serde_json::Value::String(trans_preamble),
        );
    }
    if let Some(issue) = &parse_issue {
        metadata.insert(
            "parse_issue".to_string(),
            serde_json::Value::String(issue.clone()),
        );
    }

    LegalDocument {
        id: entry.id.clone(),
        title: entry.title.clone(),
        doc_type: entry.doc_type.clone(),
        source: entry.source.clone(),
        jurisdiction: entry.jurisdiction.clone(),
        source_url: entry.url.clone(),
        publication_date: entry.publication_date.clone(),
        status: entry.status.clone(),
        plain_text: Some(plain_text),
        articles: split.articles,
        transitory: transitory_items,
        metadata,
    }
}

fn save_document(doc: &LegalDocument, normalized_dir: &Path) -> Result<()> {
    let out_dir = normalized_dir.join(doc.jurisdiction.to_lowercase());
    ensure_directory(&out_dir)?;

    if let Some(plain_text) = doc.plain_text.as_deref() {
        if !plain_text.is_empty() {
            let txt_path = out_dir.join(format!("{}.txt", doc.id));
            fs::write(&txt_path, plain_text)
                .with_context(|| format!("failed to write {}", txt_path.display()))?;
        }
    }

    let json_path = out_dir.join(format!("{}.json", doc.id));
    write_json_pretty(&json_path, doc)?;

    Ok(())
}

fn render_segment_command(args: &SegmentArgs) -> String {
    let mut command = vec![
        "leychunk".to_string(),
        "segment".to_string(),
        "--data-root".to_string(),
        args.data_root.display().to_string(),
        "--sources".to_string(),
        args.sources.display().to_string(),
    ];

    if let Some(path) = &args.raw_root {
        command.push("--raw-root".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.inventory_manifest_path {
        command.push("--inventory-manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.segment_manifest_path {
        command.push("--segment-manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if args.refresh_inventory {
        command.push("--refresh-inventory".to_string());
    }
    for doc_id in &args.doc_ids {
        command.push("--doc-id".to_string());
        command.push(doc_id.clone());
    }
    if let Some(max_docs) = args.max_docs {
        command.push("--max-docs".to_string());
        command.push(max_docs.to_string());
    }

    command.join(" ")
}
