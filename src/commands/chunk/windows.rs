use anyhow::{Result, bail};

use crate::tokenizer::{TokenCodec, validate_round_trip};

/// Split text into overlapping windows bounded by token count.
///
/// Text at or under the budget is returned unchanged as a single window;
/// otherwise a window of `max_tokens` tokens slides with stride
/// `max_tokens - overlap_tokens`, each window decoded back to trimmed text.
/// Token-based bounding matters because downstream embedding calls are
/// bounded by the model tokenizer, not by characters.
pub(crate) fn chunk_text_by_tokens(
    text: &str,
    codec: &dyn TokenCodec,
    max_tokens: usize,
    overlap_tokens: usize,
    validate: bool,
) -> Result<Vec<String>> {
    let cleaned = text.trim();
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }

    if max_tokens == 0 {
        bail!("max_tokens must be positive");
    }
    if overlap_tokens >= max_tokens {
        bail!("overlap_tokens must be between 0 and max_tokens");
    }

    let tokens = codec.encode(cleaned);
    if tokens.len() <= max_tokens {
        if validate {
            validate_round_trip(cleaned, &tokens, codec)?;
        }
        return Ok(vec![cleaned.to_string()]);
    }

    let step = max_tokens - overlap_tokens;
    let mut windows = Vec::new();
    let mut start = 0usize;

    while start < tokens.len() {
        let end = (start + max_tokens).min(tokens.len());
        let decoded = codec.decode(&tokens[start..end])?;
        let window = decoded.trim().to_string();

        if !window.is_empty() {
            if validate {
                let window_tokens = codec.encode(&window);
                validate_round_trip(&window, &window_tokens, codec)?;
            }
            windows.push(window);
        }

        if end >= tokens.len() {
            break;
        }
        start += step;
    }

    Ok(windows)
}
