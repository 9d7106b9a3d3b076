use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::info;
use walkdir::WalkDir;

use crate::cli::TokenizeArgs;
use crate::model::{
    ChunkRecord, TokenizeCounts, TokenizePaths, TokenizeRunManifest, TokenizedChunkRecord,
};
use crate::tokenizer::{TiktokenCodec, TokenCodec, validate_round_trip};
use crate::util::{ensure_directory, now_utc_string, utc_compact_string, write_json_pretty};

#[derive(Debug)]
struct ChunkFileEntry {
    path: PathBuf,
    doc_id: String,
    jurisdiction: String,
}

pub fn run(args: TokenizeArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    if !args.chunks_dir.exists() {
        bail!("chunks directory not found: {}", args.chunks_dir.display());
    }
    if args.batch_size == 0 {
        bail!("batch size must be positive");
    }

    info!(
        chunks_dir = %args.chunks_dir.display(),
        run_id = %run_id,
        model = %args.model,
        "starting tokenize"
    );

    let codec = TiktokenCodec::for_model(&args.model)?;
    let chunk_files = collect_chunk_files(&args.chunks_dir, &args.jurisdictions, &args.doc_ids);

    let mut counts = TokenizeCounts {
        file_count: chunk_files.len(),
        ..TokenizeCounts::default()
    };

    for chunk_file in &chunk_files {
        let remaining = match args.max_chunks {
            Some(max_chunks) => {
                if counts.chunk_count >= max_chunks {
                    break;
                }
                Some(max_chunks - counts.chunk_count)
            }
            None => None,
        };

        let out_dir = args.output_dir.join(&chunk_file.jurisdiction);
        ensure_directory(&out_dir)?;
        let out_path = out_dir.join(format!("{}_tokens.jsonl", chunk_file.doc_id));

        let (processed, token_total) =
            tokenize_file(chunk_file, &out_path, &codec, &args, remaining)?;
        counts.chunk_count += processed;
        counts.token_count_total += token_total;

        info!(
            doc_id = %chunk_file.doc_id,
            chunks = processed,
            tokens = token_total,
            path = %out_path.display(),
            "tokenized chunk file"
        );
    }

    let manifest = TokenizeRunManifest {
        manifest_version: 1,
        run_id,
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_tokenize_command(&args),
        tokenizer_model: args.model.clone(),
        include_token_ids: args.include_token_ids,
        validate_decode: args.validate_decode,
        paths: TokenizePaths {
            chunks_dir: args.chunks_dir.display().to_string(),
            output_dir: args.output_dir.display().to_string(),
        },
        counts,
        warnings: Vec::new(),
        notes: vec![
            "Tokenize command completed over chunk JSONL files.".to_string(),
        ],
    };

    let manifest_path = args.tokenize_manifest_path.clone().unwrap_or_else(|| {
        args.output_dir.join("manifests").join(format!(
            "tokenize_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote tokenize run manifest");
    info!(
        chunks = manifest.counts.chunk_count,
        tokens = manifest.counts.token_count_total,
        "tokenize completed"
    );

    Ok(())
}

fn collect_chunk_files(
    chunks_dir: &Path,
    jurisdictions: &[String],
    doc_ids: &[String],
) -> Vec<ChunkFileEntry> {
    let jurisdiction_set: HashSet<String> = jurisdictions
        .iter()
        .map(|value| value.to_lowercase())
        .collect();
    let doc_id_set: HashSet<&str> = doc_ids.iter().map(String::as_str).collect();

    let mut entries = WalkDir::new(chunks_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let doc_id = name.strip_suffix("_chunks.jsonl")?.to_string();

            let jurisdiction = entry
                .path()
                .parent()
                .filter(|parent| *parent != chunks_dir)
                .and_then(|parent| parent.file_name())
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();

            Some(ChunkFileEntry {
                path: entry.into_path(),
                doc_id,
                jurisdiction,
            })
        })
        .filter(|entry| {
            jurisdiction_set.is_empty()
                || jurisdiction_set.contains(&entry.jurisdiction.to_lowercase())
        })
        .filter(|entry| doc_id_set.is_empty() || doc_id_set.contains(entry.doc_id.as_str()))
        .collect::<Vec<ChunkFileEntry>>();

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    entries
}

fn tokenize_file(
    chunk_file: &ChunkFileEntry,
    out_path: &Path,
    codec: &dyn TokenCodec,
    args: &TokenizeArgs,
    limit: Option<usize>,
) -> Result<(usize, usize)> {
    let file = File::open(&chunk_file.path)
        .with_context(|| format!("failed to open {}", chunk_file.path.display()))?;
    let reader = BufReader::new(file);

    let mut out = File::create(out_path)
        .with_context(|| format!("failed to create {}", out_path.display()))?;

    let mut buffer: Vec<ChunkRecord> = Vec::new();
    let mut processed = 0usize;
    let mut token_total = 0usize;

    for line in reader.lines() {
        let line =
            line.with_context(|| format!("failed to read {}", chunk_file.path.display()))?;
        if line.trim().is_empty() {
            continue;
        }

        if let Some(limit) = limit {
            if processed + buffer.len() >= limit {
                break;
            }
        }

        let record: ChunkRecord = serde_json::from_str(&line)
            .with_context(|| format!("failed to parse chunk line in {}", chunk_file.path.display()))?;
        buffer.push(record);

        if buffer.len() >= args.batch_size {
            processed += flush_buffer(&mut buffer, codec, args, &mut out, out_path, &mut token_total)?;
        }
    }

    processed += flush_buffer(&mut buffer, codec, args, &mut out, out_path, &mut token_total)?;

    Ok((processed, token_total))
}

fn flush_buffer(
    buffer: &mut Vec<ChunkRecord>,
    codec: &dyn TokenCodec,
    args: &TokenizeArgs,
    out: &mut File,
    out_path: &Path,
    token_total: &mut usize,
) -> Result<usize> {
    if buffer.is_empty() {
        return Ok(0);
    }

    let texts = buffer
        .iter()
        .map(|record| record.content.as_str())
        .collect::<Vec<&str>>();
    let token_batches = codec.encode_batch(&texts);

    let mut written = 0usize;
    for (record, token_ids) in buffer.drain(..).zip(token_batches) {
        if args.validate_decode {
            validate_round_trip(&record.content, &token_ids, codec).with_context(|| {
                format!("round-trip validation failed for chunk {}", record.chunk_id)
            })?;
        }

        let token_count = token_ids.len();
        let annotated = TokenizedChunkRecord {
            record,
            token_count,
            tokenizer_model: args.model.clone(),
            token_ids: args.include_token_ids.then_some(token_ids),
        };

        let line = serde_json::to_string(&annotated).with_context(|| {
            format!(
                "failed to serialize tokenized chunk {}",
                annotated.record.chunk_id
            )
        })?;
        out.write_all(line.as_bytes())
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        out.write_all(b"\n")
            .with_context(|| format!("failed to write {}", out_path.display()))?;

        *token_total += token_count;
        written += 1;
    }

    Ok(written)
}

fn render_tokenize_command(args: &TokenizeArgs) -> String {
    let mut command = vec![
        "leychunk".to_string(),
        "tokenize".to_string(),
        "--chunks-dir".to_string(),
        args.chunks_dir.display().to_string(),
        "--output-dir".to_string(),
        args.output_dir.display().to_string(),
        "--model".to_string(),
        args.model.clone(),
        "--batch-size".to_string(),
        args.batch_size.to_string(),
    ];

    for jurisdiction in &args.jurisdictions {
        command.push("--jurisdiction".to_string());
        command.push(jurisdiction.clone());
    }
    for doc_id in &args.doc_ids {
        command.push("--doc-id".to_string());
        command.push(doc_id.clone());
    }
    if let Some(max_chunks) = args.max_chunks {
        command.push("--max-chunks".to_string());
        command.push(max_chunks.to_string());
    }
    if args.include_token_ids {
        command.push("--include-token-ids".to_string());
    }
    if args.validate_decode {
        command.push("--validate-decode".to_string());
    }

    command.join(" ")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use super::*;
    use crate::model::TokenizedChunkRecord;

    fn tokenize_args(chunks_dir: &Path, output_dir: &Path) -> TokenizeArgs {
        TokenizeArgs {
            chunks_dir: chunks_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            tokenize_manifest_path: None,
            model: "gpt-4o-mini".to_string(),
            jurisdictions: Vec::new(),
            doc_ids: Vec::new(),
            max_chunks: None,
            include_token_ids: true,
            validate_decode: true,
            batch_size: 2,
        }
    }

    fn chunk_record(chunk_id: &str, content: &str) -> ChunkRecord {
        ChunkRecord {
            chunk_id: chunk_id.to_string(),
            doc_id: "doc1".to_string(),
            article_number: "1".to_string(),
            fraction_label: None,
            paragraph_index: 1,
            chunk_index: 0,
            section: "article".to_string(),
            content: content.to_string(),
            metadata: BTreeMap::new(),
        }
    }

    fn write_chunk_file(dir: &Path, records: &[ChunkRecord]) -> PathBuf {
        let out_dir = dir.join("federal");
        fs::create_dir_all(&out_dir).expect("create chunk dir");
        let path = out_dir.join("doc1_chunks.jsonl");
        let lines = records
            .iter()
            .map(|record| serde_json::to_string(record).expect("serialize record"))
            .collect::<Vec<String>>();
        fs::write(&path, lines.join("\n") + "\n").expect("write chunk file");
        path
    }

    #[test]
    fn collect_chunk_files_applies_filters() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_chunk_file(dir.path(), &[chunk_record("doc1:article:art1:fraclead:p1:c0", "Uno.")]);

        let all = collect_chunk_files(dir.path(), &[], &[]);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].doc_id, "doc1");
        assert_eq!(all[0].jurisdiction, "federal");

        let filtered = collect_chunk_files(dir.path(), &["CDMX".to_string()], &[]);
        assert!(filtered.is_empty());

        let by_doc = collect_chunk_files(dir.path(), &[], &["otro".to_string()]);
        assert!(by_doc.is_empty());
    }

    #[test]
    fn tokenize_file_annotates_counts_and_token_ids() {
        let dir = tempfile::tempdir().expect("temp dir");
        let records = vec![
            chunk_record(
                "doc1:article:art1:fraclead:p1:c0",
                "Artículo 1. Disposición general de la ley.",
            ),
            chunk_record(
                "doc1:article:art1:fraclead:p2:c0",
                "Segundo párrafo con más contenido normativo.",
            ),
        ];
        let chunk_path = write_chunk_file(dir.path(), &records);

        let args = tokenize_args(dir.path(), dir.path());
        let codec = TiktokenCodec::for_model(&args.model).expect("codec");
        let entry = ChunkFileEntry {
            path: chunk_path,
            doc_id: "doc1".to_string(),
            jurisdiction: "federal".to_string(),
        };
        let out_path = dir.path().join("doc1_tokens.jsonl");

        let (processed, token_total) =
            tokenize_file(&entry, &out_path, &codec, &args, None).expect("tokenize file");

        assert_eq!(processed, 2);
        assert!(token_total > 0);

        let raw = fs::read_to_string(&out_path).expect("read tokens file");
        let annotated = raw
            .lines()
            .map(|line| serde_json::from_str::<TokenizedChunkRecord>(line).expect("parse line"))
            .collect::<Vec<TokenizedChunkRecord>>();

        assert_eq!(annotated.len(), 2);
        for (record, original) in annotated.iter().zip(&records) {
            assert_eq!(record.record.chunk_id, original.chunk_id);
            assert_eq!(record.tokenizer_model, "gpt-4o-mini");
            let token_ids = record.token_ids.as_ref().expect("token ids included");
            assert_eq!(token_ids.len(), record.token_count);
            let decoded = codec.decode(token_ids).expect("decode");
            assert_eq!(decoded, original.content);
        }
    }

    #[test]
    fn tokenize_file_respects_chunk_limit() {
        let dir = tempfile::tempdir().expect("temp dir");
        let records = vec![
            chunk_record("doc1:article:art1:fraclead:p1:c0", "Uno."),
            chunk_record("doc1:article:art1:fraclead:p2:c0", "Dos."),
            chunk_record("doc1:article:art1:fraclead:p3:c0", "Tres."),
        ];
        let chunk_path = write_chunk_file(dir.path(), &records);

        let args = tokenize_args(dir.path(), dir.path());
        let codec = TiktokenCodec::for_model(&args.model).expect("codec");
        let entry = ChunkFileEntry {
            path: chunk_path,
            doc_id: "doc1".to_string(),
            jurisdiction: "federal".to_string(),
        };
        let out_path = dir.path().join("doc1_tokens.jsonl");

        let (processed, _) =
            tokenize_file(&entry, &out_path, &codec, &args, Some(2)).expect("tokenize file");

        assert_eq!(processed, 2);
    }
}
