use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::InventoryArgs;
use crate::model::{RawInventoryManifest, RawSourceFile, SourceEntry};
use crate::util::{now_utc_string, read_json_file, sha256_file, write_json_pretty};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    PagesJson,
    Html,
    Txt,
}

impl RawKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RawKind::PagesJson => "pages_json",
            RawKind::Html => "html",
            RawKind::Txt => "txt",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pages_json" => Some(RawKind::PagesJson),
            "html" => Some(RawKind::Html),
            "txt" => Some(RawKind::Txt),
            _ => None,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            RawKind::PagesJson => "pages.json",
            RawKind::Html => "html",
            RawKind::Txt => "txt",
        }
    }
}

const RAW_KIND_PRIORITY: [RawKind; 3] = [RawKind::PagesJson, RawKind::Html, RawKind::Txt];

pub fn run(args: InventoryArgs) -> Result<()> {
    let raw_root = args
        .raw_root
        .clone()
        .unwrap_or_else(|| args.data_root.join("raw"));

    let sources: Vec<SourceEntry> = read_json_file(&args.sources)?;
    let manifest = build_manifest(&raw_root, &args.sources, &sources)?;

    if args.dry_run {
        info!(
            entry_count = manifest.entry_count,
            missing = manifest.missing_doc_ids.len(),
            raw_root = %manifest.raw_root,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args.manifest_path.unwrap_or_else(|| {
        args.data_root
            .join("manifests")
            .join("raw_inventory.json")
    });

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(
        entry_count = manifest.entry_count,
        missing = manifest.missing_doc_ids.len(),
        "inventory completed"
    );

    Ok(())
}

pub fn build_manifest(
    raw_root: &Path,
    sources_path: &Path,
    sources: &[SourceEntry],
) -> Result<RawInventoryManifest> {
    if sources.is_empty() {
        bail!("no source entries found in {}", sources_path.display());
    }

    let mut entries = Vec::new();
    let mut missing_doc_ids = Vec::new();

    for source in sources {
        let Some((path, kind)) = locate_raw_file(raw_root, &source.jurisdiction, &source.id)
        else {
            missing_doc_ids.push(source.id.clone());
            continue;
        };

        let filename = relative_display(raw_root, &path);
        let sha256 = sha256_file(&path)?;

        entries.push(RawSourceFile {
            doc_id: source.id.clone(),
            filename,
            kind: kind.as_str().to_string(),
            sha256,
        });
    }

    entries.sort_by(|a, b| a.doc_id.cmp(&b.doc_id));
    missing_doc_ids.sort();

    Ok(RawInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        raw_root: raw_root.display().to_string(),
        sources_path: sources_path.display().to_string(),
        entry_count: entries.len(),
        missing_doc_ids,
        entries,
    })
}

/// Find the raw file for a document, preferring positioned-word dumps over
/// HTML over plain text, directly under the raw root or under the
/// lowercased jurisdiction subdirectory.
pub fn locate_raw_file(
    raw_root: &Path,
    jurisdiction: &str,
    doc_id: &str,
) -> Option<(PathBuf, RawKind)> {
    let jurisdiction_dir = raw_root.join(jurisdiction.to_lowercase());

    for kind in RAW_KIND_PRIORITY {
        let filename = format!("{}.{}", doc_id, kind.extension());
        for candidate in [jurisdiction_dir.join(&filename), raw_root.join(&filename)] {
            if candidate.is_file() {
                return Some((candidate, kind));
            }
        }
    }

    None
}

fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

pub fn load_or_refresh_manifest(
    raw_root: &Path,
    sources_path: &Path,
    sources: &[SourceEntry],
    manifest_path: &Path,
    refresh: bool,
) -> Result<RawInventoryManifest> {
    if refresh || !manifest_path.exists() {
        let manifest = build_manifest(raw_root, sources_path, sources)?;
        write_json_pretty(manifest_path, &manifest)?;
        info!(
            path = %manifest_path.display(),
            entry_count = manifest.entry_count,
            "refreshed inventory manifest"
        );
        return Ok(manifest);
    }

    let manifest: RawInventoryManifest = read_json_file(manifest_path)
        .with_context(|| format!("failed to load inventory {}", manifest_path.display()))?;

    info!(
        path = %manifest_path.display(),
        entry_count = manifest.entry_count,
        "loaded existing inventory manifest"
    );

    Ok(manifest)
}
