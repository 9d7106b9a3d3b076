use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use regex::Regex;

use super::units::ArticleUnit;
use super::windows::chunk_text_by_tokens;
use crate::model::{ChunkRecord, LegalDocument};
use crate::tokenizer::TokenCodec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    Article,
    Transitory,
}

impl Section {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Section::Article => "article",
            Section::Transitory => "transitory",
        }
    }
}

/// Builds final chunk records: token windows per unit, deterministic chunk
/// ids, and document metadata copied onto every chunk so each record is
/// interpretable without a join back to its document.
#[derive(Debug)]
pub(crate) struct ChunkAssembler {
    id_safe: Regex,
}

impl ChunkAssembler {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            id_safe: Regex::new(r"[^0-9A-Za-z]+")
                .context("failed to compile id-safe component regex")?,
        })
    }

    fn safe_id_component(&self, value: &str) -> String {
        let slug = self.id_safe.replace_all(value, "-");
        let slug = slug.trim_matches('-');
        if slug.is_empty() {
            "na".to_string()
        } else {
            slug.to_string()
        }
    }

    /// Chunk id layout: `doc:section:art<slug>:frac<slug>|fraclead:p<n>:c<n>`.
    /// Distinct unit keys can slug to the same safe string, so a seen-count
    /// map appends `:v<n>` on collision; ids stay unique within one run.
    pub(crate) fn build_chunks(
        &self,
        doc: &LegalDocument,
        units: &[ArticleUnit],
        codec: &dyn TokenCodec,
        max_tokens: usize,
        overlap_tokens: usize,
        section: Section,
        validate: bool,
    ) -> Result<Vec<ChunkRecord>> {
        let doc_meta = document_metadata(doc);
        let mut seen_ids: HashMap<String, usize> = HashMap::new();
        let mut chunks = Vec::new();

        for unit in units {
            let segments =
                chunk_text_by_tokens(&unit.text, codec, max_tokens, overlap_tokens, validate)?;
            if segments.is_empty() {
                continue;
            }

            let article_part = self.safe_id_component(&unit.article_number);
            let fraction_part = match &unit.fraction_label {
                Some(label) => format!("frac{}", self.safe_id_component(label)),
                None => "fraclead".to_string(),
            };

            for (chunk_index, content) in segments.into_iter().enumerate() {
                let base_chunk_id = format!(
                    "{}:{}:art{}:{}:p{}:c{}",
                    doc.id,
                    section.as_str(),
                    article_part,
                    fraction_part,
                    unit.paragraph_index,
                    chunk_index
                );

                let dup_count = *seen_ids.get(&base_chunk_id).unwrap_or(&0);
                seen_ids.insert(base_chunk_id.clone(), dup_count + 1);
                let chunk_id = if dup_count == 0 {
                    base_chunk_id
                } else {
                    format!("{base_chunk_id}:v{dup_count}")
                };

                chunks.push(ChunkRecord {
                    chunk_id,
                    doc_id: doc.id.clone(),
                    article_number: unit.article_number.clone(),
                    fraction_label: unit.fraction_label.clone(),
                    paragraph_index: unit.paragraph_index,
                    chunk_index,
                    section: section.as_str().to_string(),
                    content,
                    metadata: doc_meta.clone(),
                });
            }
        }

        Ok(chunks)
    }
}

/// Document-level descriptive fields attached to every chunk. Incoming
/// metadata values that are not strings are JSON-serialized; the map is
/// ordered so chunk serialization stays byte-deterministic.
pub(crate) fn document_metadata(doc: &LegalDocument) -> BTreeMap<String, String> {
    let mut meta = BTreeMap::new();
    meta.insert("title".to_string(), doc.title.clone());
    meta.insert("type".to_string(), doc.doc_type.clone());
    meta.insert("source".to_string(), doc.source.clone());
    meta.insert("jurisdiction".to_string(), doc.jurisdiction.clone());
    meta.insert("source_url".to_string(), doc.source_url.clone());
    meta.insert(
        "publication_date".to_string(),
        doc.publication_date.clone().unwrap_or_default(),
    );
    meta.insert(
        "status".to_string(),
        doc.status.clone().unwrap_or_default(),
    );

    for (key, value) in &doc.metadata {
        meta.insert(key.clone(), stringify_metadata_value(value));
    }

    meta
}

fn stringify_metadata_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Bool(flag) => flag.to_string(),
        serde_json::Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}
