use anyhow::{Context, Result};
use regex::Regex;

use super::transitory::TransitorySplitter;
use crate::model::LegalArticle;

pub(crate) const PARSE_ISSUE_NO_ARTICLES: &str = "ocr_pending_no_articles";
pub(crate) const PARSE_ISSUE_EMPTY_TEXT: &str = "ocr_pending_empty_pdf";

const MAX_ARTICLE_NUMBER: u32 = 10_000;
const TRANSITORIOS_LOOKBACK_BYTES: usize = 100;

const ORDINAL_WORDS_PATTERN: &str = "primero|primera|segundo|segunda|tercero|tercera|cuarto|cuarta|quinto|quinta|sexto|sexta|s[eé]ptimo|s[eé]ptima|octavo|octava|noveno|novena|d[eé]cimo|d[eé]cima";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DetectionMethod {
    Sequential,
    Relaxed,
    None,
}

impl DetectionMethod {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            DetectionMethod::Sequential => "sequential",
            DetectionMethod::Relaxed => "relaxed",
            DetectionMethod::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ArticlePosition {
    pub(crate) number: u32,
    pub(crate) start: usize,
}

#[derive(Debug)]
pub(crate) struct ArticleSplit {
    pub(crate) articles: Vec<LegalArticle>,
    pub(crate) preamble: String,
    pub(crate) tail: String,
    pub(crate) parse_issue: Option<String>,
    pub(crate) detection_method: DetectionMethod,
}

/// Article header detection over linear statute text. Strategies are tried
/// in priority order: strict sequential numbering first, then a relaxed
/// header scan tolerating ordinal words and punctuation variants.
#[derive(Debug)]
pub(crate) struct ArticleDetector {
    numeric_header: Regex,
    relaxed_header: Regex,
    inline_header: Regex,
}

impl ArticleDetector {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            numeric_header: Regex::new(r"(?mi)^\s*art[ií]culo\s+(\d+)(?:o|º)?\b")
                .context("failed to compile numeric article header regex")?,
            relaxed_header: Regex::new(&format!(
                r"(?mi)^\s*art[ií]culo(?:\s*[\.:,-])?\s*((\d+)(?:o|º)?|{ORDINAL_WORDS_PATTERN})\b"
            ))
            .context("failed to compile relaxed article header regex")?,
            inline_header: Regex::new(r"(?is)^\s*(art[ií]culo\s+\d+(?:o|º)?[^\w]*)\s*(.*)$")
                .context("failed to compile inline article header regex")?,
        })
    }

    pub(crate) fn detect(&self, text: &str) -> (Vec<ArticlePosition>, DetectionMethod) {
        type Strategy = (
            DetectionMethod,
            fn(&ArticleDetector, &str) -> Vec<ArticlePosition>,
        );
        const STRATEGIES: [Strategy; 2] = [
            (DetectionMethod::Sequential, ArticleDetector::detect_sequential),
            (DetectionMethod::Relaxed, ArticleDetector::detect_relaxed),
        ];

        for (method, strategy) in STRATEGIES {
            let positions = strategy(self, text);
            if !positions.is_empty() {
                return (positions, method);
            }
        }

        (Vec::new(), DetectionMethod::None)
    }

    /// Strict sequential detection: accept `Artículo 1`, then the first
    /// `Artículo 2` after it, and so on, stopping at the first gap. Requiring
    /// exact continuation makes in-body references to other articles
    /// harmless.
    fn detect_sequential(&self, text: &str) -> Vec<ArticlePosition> {
        let headers = self
            .numeric_header
            .captures_iter(text)
            .filter_map(|captures| {
                let digits = captures.get(1)?.as_str();
                if digits.len() > 1 && digits.starts_with('0') {
                    return None;
                }
                let number = digits.parse::<u32>().ok()?;
                let whole = captures.get(0)?;
                Some((number, whole.start(), whole.end()))
            })
            .collect::<Vec<(u32, usize, usize)>>();

        let mut positions = Vec::new();
        let mut expected: u32 = 1;
        let mut index = 0usize;

        while expected <= MAX_ARTICLE_NUMBER {
            let found = headers[index..]
                .iter()
                .position(|(number, _, _)| *number == expected)
                .map(|offset| index + offset);

            let Some(at) = found else {
                break;
            };

            let (_, start, _) = headers[at];
            positions.push(ArticlePosition {
                number: expected,
                start,
            });
            index = at + 1;
            expected += 1;
        }

        positions
    }

    /// Relaxed detection: any line-anchored `Artículo <número|ordinal>`
    /// header, no sequentiality enforced. Used only when the sequential pass
    /// finds nothing.
    fn detect_relaxed(&self, text: &str) -> Vec<ArticlePosition> {
        let mut positions = Vec::new();

        for captures in self.relaxed_header.captures_iter(text) {
            let token = captures
                .get(1)
                .map(|group| group.as_str().trim())
                .unwrap_or("");

            let number = match captures.get(2) {
                Some(digits) => digits.as_str().parse::<u32>().ok(),
                None => ordinal_word_number(token),
            };

            let Some(number) = number else {
                continue;
            };
            if number == 0 || number > MAX_ARTICLE_NUMBER {
                continue;
            }

            let Some(whole) = captures.get(0) else {
                continue;
            };
            positions.push(ArticlePosition {
                number,
                start: whole.start(),
            });
        }

        positions.sort_by_key(|position| position.start);
        positions
    }

    pub(crate) fn split_articles_and_tail(
        &self,
        plain_text: &str,
        transitory: &TransitorySplitter,
    ) -> ArticleSplit {
        let (positions, detection_method) = self.detect(plain_text);

        if positions.is_empty() {
            return ArticleSplit {
                articles: Vec::new(),
                preamble: plain_text.trim().to_string(),
                tail: String::new(),
                parse_issue: Some(PARSE_ISSUE_NO_ARTICLES.to_string()),
                detection_method,
            };
        }

        let first_start = positions[0].start;
        let preamble = plain_text[..first_start].trim().to_string();

        let mut spans = Vec::with_capacity(positions.len());
        for (idx, position) in positions.iter().enumerate() {
            let end = positions
                .get(idx + 1)
                .map(|next| next.start)
                .unwrap_or(plain_text.len());
            spans.push((position.number, position.start, end));
        }

        let (_, last_article_start, last_end) = spans[spans.len() - 1];

        let mut search_start = last_article_start.saturating_sub(TRANSITORIOS_LOOKBACK_BYTES);
        while !plain_text.is_char_boundary(search_start) {
            search_start -= 1;
        }
        let trans_root_start = transitory.find_root_heading(plain_text, search_start);

        let mut articles = Vec::with_capacity(spans.len());
        for (number, start, mut end) in spans {
            if let Some(root) = trans_root_start {
                if start < root && root < end {
                    end = root;
                }
            }

            let chunk = plain_text[start..end].trim();
            let body_text = self
                .inline_header
                .captures(chunk)
                .and_then(|captures| captures.get(2))
                .map(|body| body.as_str().trim())
                .unwrap_or(chunk);

            articles.push(LegalArticle {
                number: number.to_string(),
                heading: None,
                text: if body_text.is_empty() {
                    chunk.to_string()
                } else {
                    body_text.to_string()
                },
            });
        }

        let tail = match trans_root_start {
            Some(root) => plain_text[root..].trim().to_string(),
            None => plain_text[last_end..].trim().to_string(),
        };

        ArticleSplit {
            articles,
            preamble,
            tail,
            parse_issue: None,
            detection_method,
        }
    }
}

fn ordinal_word_number(token: &str) -> Option<u32> {
    let normalized = token.to_lowercase();
    let number = match normalized.as_str() {
        "primero" | "primera" => 1,
        "segundo" | "segunda" => 2,
        "tercero" | "tercera" => 3,
        "cuarto" | "cuarta" => 4,
        "quinto" | "quinta" => 5,
        "sexto" | "sexta" => 6,
        "septimo" | "séptimo" | "septima" | "séptima" => 7,
        "octavo" | "octava" => 8,
        "noveno" | "novena" => 9,
        "decimo" | "décimo" | "decima" | "décima" => 10,
        _ => return None,
    };
    Some(number)
}
