use anyhow::{Context, Result};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnitKind {
    LeadParagraph,
    FractionParagraph,
}

/// One paragraph-level unit inside an article. `paragraph_index` is 1-based
/// and restarts whenever a new fraction begins, so "Artículo 27, fracción II,
/// párrafo 3" stays independently addressable.
#[derive(Debug, Clone)]
pub(crate) struct ArticleUnit {
    pub(crate) kind: UnitKind,
    pub(crate) article_number: String,
    pub(crate) fraction_label: Option<String>,
    pub(crate) paragraph_index: usize,
    pub(crate) text: String,
}

/// Splits one article's text into lead paragraphs and fraction paragraphs.
/// A fraction marker is a roman numeral with optional "fracción" keyword and
/// punctuation, and must carry trailing content on the same line; a bare
/// marker line is ordinary paragraph text.
#[derive(Debug)]
pub(crate) struct UnitSplitter {
    fraction_start: Regex,
}

impl UnitSplitter {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            fraction_start: Regex::new(
                r"(?i)^\s*(?:fracci[oó]n\s+)?([IVXLCDM]+)\s*[.)\-]*\s+(\S.*)$",
            )
            .context("failed to compile fraction start regex")?,
        })
    }

    pub(crate) fn split_article(&self, article_number: &str, text: &str) -> Vec<ArticleUnit> {
        let lines = normalize_article_lines(text);
        let mut accumulator = UnitAccumulator::new(article_number);

        for line in &lines {
            if line.is_empty() {
                accumulator.flush_paragraph();
                continue;
            }

            if let Some(captures) = self.fraction_start.captures(line) {
                let label = captures
                    .get(1)
                    .map(|group| group.as_str().to_uppercase())
                    .unwrap_or_default();
                let remainder = captures
                    .get(2)
                    .map(|group| group.as_str().trim())
                    .unwrap_or("");
                accumulator.start_fraction(label, remainder);
                continue;
            }

            accumulator.push_line(line);
        }

        accumulator.finish()
    }
}

/// Collapse runs of blank lines into a single blank separator and trim each
/// content line.
pub(crate) fn normalize_article_lines(text: &str) -> Vec<String> {
    let mut normalized = Vec::new();
    let mut prev_blank = false;

    for line in text.lines() {
        if line.trim().is_empty() {
            if !prev_blank {
                normalized.push(String::new());
                prev_blank = true;
            }
            continue;
        }

        normalized.push(line.trim().to_string());
        prev_blank = false;
    }

    normalized
}

/// Paragraph accumulation with explicit flush-on-boundary transitions: a
/// blank line flushes the pending paragraph, a fraction marker flushes and
/// then resets the fraction-scoped paragraph counter.
#[derive(Debug)]
struct UnitAccumulator {
    article_number: String,
    current_fraction: Option<String>,
    paragraph_index: usize,
    pending_lines: Vec<String>,
    units: Vec<ArticleUnit>,
}

impl UnitAccumulator {
    fn new(article_number: &str) -> Self {
        Self {
            article_number: article_number.to_string(),
            current_fraction: None,
            paragraph_index: 0,
            pending_lines: Vec::new(),
            units: Vec::new(),
        }
    }

    fn flush_paragraph(&mut self) {
        if self.pending_lines.is_empty() {
            return;
        }

        self.paragraph_index += 1;
        let text = self.pending_lines.join(" ").trim().to_string();
        self.pending_lines.clear();
        if text.is_empty() {
            return;
        }

        let kind = if self.current_fraction.is_none() {
            UnitKind::LeadParagraph
        } else {
            UnitKind::FractionParagraph
        };

        self.units.push(ArticleUnit {
            kind,
            article_number: self.article_number.clone(),
            fraction_label: self.current_fraction.clone(),
            paragraph_index: self.paragraph_index,
            text,
        });
    }

    fn start_fraction(&mut self, label: String, remainder: &str) {
        self.flush_paragraph();
        self.current_fraction = Some(label);
        self.paragraph_index = 0;
        if !remainder.is_empty() {
            self.pending_lines.push(remainder.to_string());
        }
    }

    fn push_line(&mut self, line: &str) {
        self.pending_lines.push(line.to_string());
    }

    fn finish(mut self) -> Vec<ArticleUnit> {
        self.flush_paragraph();
        self.units
    }
}
