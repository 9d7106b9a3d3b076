use anyhow::{Context, Result};
use regex::Regex;

use crate::model::TransitoryItem;

/// Splits the post-article tail into transitory items. The root heading is
/// either "Artículos Transitorios" or a bare "Transitorios" line; items start
/// with an optional keyword followed by an ordinal word or a number.
#[derive(Debug)]
pub(crate) struct TransitorySplitter {
    root: Regex,
    alt: Regex,
    item: Regex,
}

impl TransitorySplitter {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            root: Regex::new(r"(?mi)^\s*art[ií]culos\s+transitorios\s*[:\-.]?\s*$")
                .context("failed to compile transitorios root regex")?,
            alt: Regex::new(r"(?mi)^\s*transitorios\s*[:\-.]?\s*$")
                .context("failed to compile transitorios alternate regex")?,
            item: Regex::new(
                r"(?mi)^\s*(?:art[ií]culo\s+|transitorio\s+)?(primero|primera|segundo|segunda|tercero|tercera|cuarto|cuarta|quinto|quinta|sexto|sexta|s[eé]ptimo|s[eé]ptima|octavo|octava|noveno|novena|d[eé]cimo|d[eé]cima|\d+o?|\d+º)[^\n]*",
            )
            .context("failed to compile transitory item regex")?,
        })
    }

    /// Find the transitorios root heading at or after `from`, returning its
    /// absolute byte offset. Matches at `from` itself are only accepted when
    /// `from` is a real line start.
    pub(crate) fn find_root_heading(&self, text: &str, from: usize) -> Option<usize> {
        let slice = &text[from..];
        let at_line_start = from == 0 || text.as_bytes()[from - 1] == b'\n';

        for pattern in [&self.root, &self.alt] {
            let found = pattern
                .find_iter(slice)
                .find(|found| found.start() > 0 || at_line_start);
            if let Some(found) = found {
                return Some(from + found.start());
            }
        }

        None
    }

    /// Split the region following the root heading into labeled items. When
    /// no item markers exist the whole region is returned as an unstructured
    /// preamble.
    pub(crate) fn split_region(&self, text: &str) -> (Vec<TransitoryItem>, String) {
        let text = text.trim();
        if text.is_empty() {
            return (Vec::new(), String::new());
        }

        let Some(head) = self.root.find(text).or_else(|| self.alt.find(text)) else {
            return (Vec::new(), text.to_string());
        };

        let heading_text = text[head.start()..head.end()].trim();
        let after_heading = text[head.end()..].trim();

        let matches = self.item.find_iter(after_heading).collect::<Vec<_>>();
        if matches.is_empty() {
            let preamble = format!("{heading_text}\n{after_heading}").trim().to_string();
            return (Vec::new(), preamble);
        }

        let transitory_preamble = after_heading[..matches[0].start()].trim();

        let mut items = Vec::with_capacity(matches.len());
        for (idx, found) in matches.iter().enumerate() {
            let end = matches
                .get(idx + 1)
                .map(|next| next.start())
                .unwrap_or(after_heading.len());
            let chunk = after_heading[found.start()..end].trim();

            let (label, body) = match chunk.find('\n') {
                Some(pos) => (chunk[..pos].trim(), chunk[pos + 1..].trim()),
                None => (chunk, ""),
            };

            items.push(TransitoryItem {
                label: label.to_string(),
                text: body.to_string(),
            });
        }

        let full_preamble = if transitory_preamble.is_empty() {
            heading_text.to_string()
        } else {
            format!("{heading_text}\n{transitory_preamble}")
        };

        (items, full_preamble.trim().to_string())
    }
}
