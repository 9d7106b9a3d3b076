use anyhow::{Context, Result};
use regex::Regex;

use crate::model::{PageWords, PositionedWord};

const SOFT_HYPHEN: char = '\u{00ad}';
const PARAGRAPH_GAP_MIN: f64 = 8.0;
const LINE_Y_TOLERANCE: f64 = 2.5;
const MIN_COLUMN_GAP_PX: f64 = 40.0;
const MIN_COLUMN_GAP_WIDTH_RATIO: f64 = 0.12;

#[derive(Debug)]
struct LineBlock {
    text: String,
    top: f64,
    bottom: f64,
}

/// Rebuilds natural reading order from positioned words: column detection,
/// line grouping, and paragraph-gap reconstruction. Government statute PDFs
/// are frequently two-column with no embedded structure, and interleaved
/// word-level extraction corrupts every downstream header regex.
#[derive(Debug)]
pub(crate) struct LayoutReconstructor {
    close_punctuation: Regex,
    open_punctuation: Regex,
}

impl LayoutReconstructor {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            close_punctuation: Regex::new(r"\s+([,.;:!?%])")
                .context("failed to compile closing punctuation regex")?,
            open_punctuation: Regex::new(r"([(\[¿¡])\s+")
                .context("failed to compile opening punctuation regex")?,
        })
    }

    /// Join reconstructed page texts into one linear document string.
    pub(crate) fn document_text(&self, pages: &[PageWords]) -> String {
        let page_texts = pages
            .iter()
            .map(|page| self.page_to_text(page))
            .filter(|text| !text.is_empty())
            .collect::<Vec<String>>();

        page_texts.join("\n").trim().to_string()
    }

    pub(crate) fn page_to_text(&self, page: &PageWords) -> String {
        if page.words.is_empty() {
            let fallback = page.text.as_deref().unwrap_or("");
            return fallback
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<&str>>()
                .join("\n");
        }

        let boundary = detect_column_boundary(&page.words, page.width);
        let columns: Vec<Vec<&PositionedWord>> = match boundary {
            Some(boundary) => {
                let mut left = Vec::new();
                let mut right = Vec::new();
                for word in &page.words {
                    let center = (word.x0 + word.x1) / 2.0;
                    if center < boundary {
                        left.push(word);
                    } else {
                        right.push(word);
                    }
                }
                vec![left, right]
            }
            None => vec![page.words.iter().collect()],
        };

        let mut column_lines: Vec<String> = Vec::new();
        for column in &columns {
            let lines = self.lines_from_words(column);
            if lines.is_empty() {
                continue;
            }
            if !column_lines.is_empty() {
                column_lines.push(String::new());
            }
            column_lines.extend(lines);
        }

        column_lines.join("\n").trim().to_string()
    }

    fn lines_from_words(&self, words: &[&PositionedWord]) -> Vec<String> {
        let line_blocks = self.group_words_into_lines(words);
        if line_blocks.is_empty() {
            return Vec::new();
        }

        let mut heights = line_blocks
            .iter()
            .map(|line| line.bottom - line.top)
            .collect::<Vec<f64>>();
        let gap_threshold = PARAGRAPH_GAP_MIN.max(median(&mut heights) * 1.35);

        let mut lines = Vec::new();
        let mut prev_bottom: Option<f64> = None;
        for line in &line_blocks {
            if let Some(prev) = prev_bottom {
                if line.top - prev > gap_threshold {
                    lines.push(String::new());
                }
            }
            lines.push(line.text.clone());
            prev_bottom = Some(line.bottom);
        }

        lines
    }

    fn group_words_into_lines(&self, words: &[&PositionedWord]) -> Vec<LineBlock> {
        if words.is_empty() {
            return Vec::new();
        }

        let mut sorted = words.to_vec();
        sorted.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.x0.total_cmp(&b.x0)));

        let mut grouped = Vec::new();
        let mut current: Vec<&PositionedWord> = Vec::new();
        let mut current_top: Option<f64> = None;

        for word in sorted {
            match current_top {
                Some(reference) if (word.top - reference).abs() > LINE_Y_TOLERANCE => {
                    grouped.push(self.finalize_line(&current));
                    current = vec![word];
                    current_top = Some(word.top);
                }
                Some(_) => current.push(word),
                None => {
                    current.push(word);
                    current_top = Some(word.top);
                }
            }
        }

        if !current.is_empty() {
            grouped.push(self.finalize_line(&current));
        }

        grouped.retain(|line| !line.text.is_empty());
        grouped
    }

    fn finalize_line(&self, words: &[&PositionedWord]) -> LineBlock {
        let mut sorted = words.to_vec();
        sorted.sort_by(|a, b| a.x0.total_cmp(&b.x0));

        let parts = sorted
            .iter()
            .map(|word| normalize_word_text(&word.text))
            .filter(|token| !token.is_empty())
            .collect::<Vec<String>>();

        let text = if parts.is_empty() {
            String::new()
        } else {
            let joined = parts.join(" ");
            let tightened = self.close_punctuation.replace_all(&joined, "$1");
            self.open_punctuation
                .replace_all(&tightened, "$1")
                .trim()
                .to_string()
        };

        let top = sorted
            .iter()
            .map(|word| word.top)
            .fold(f64::INFINITY, f64::min);
        let bottom = sorted
            .iter()
            .map(|word| word.bottom)
            .fold(f64::NEG_INFINITY, f64::max);

        LineBlock { text, top, bottom }
    }
}

fn normalize_word_text(text: &str) -> String {
    let stripped = text.replace(SOFT_HYPHEN, "");
    stripped.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Find the midpoint of the single largest horizontal gap between distinct
/// word x-positions, rejecting the split unless the gap is wide enough, both
/// columns hold a balanced share of the words, and the boundary sits in the
/// central band of the page. A wrong split silently corrupts word order, so
/// the guards err toward "no columns".
pub(crate) fn detect_column_boundary(words: &[PositionedWord], page_width: f64) -> Option<f64> {
    if words.is_empty() {
        return None;
    }

    let mut xs = words.iter().map(|word| word.x0).collect::<Vec<f64>>();
    xs.sort_by(f64::total_cmp);
    xs.dedup();
    if xs.len() < 2 {
        return None;
    }

    let mut best_gap = 0.0;
    let mut boundary: Option<f64> = None;
    for pair in xs.windows(2) {
        let gap = pair[1] - pair[0];
        if gap > best_gap {
            best_gap = gap;
            boundary = Some(pair[0] + gap / 2.0);
        }
    }

    let boundary = boundary?;

    let min_gap = (page_width * MIN_COLUMN_GAP_WIDTH_RATIO).max(MIN_COLUMN_GAP_PX);
    if best_gap < min_gap {
        return None;
    }

    let left_count = words.iter().filter(|word| word.x1 <= boundary).count();
    let left_ratio = left_count as f64 / words.len() as f64;
    if !(0.25..=0.75).contains(&left_ratio) {
        return None;
    }

    if boundary <= page_width * 0.2 || boundary >= page_width * 0.8 {
        return None;
    }

    Some(boundary)
}

fn median(values: &mut Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}
