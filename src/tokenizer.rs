use anyhow::{Result, anyhow};
use tiktoken_rs::CoreBPE;

/// Token encoder/decoder seam used by the chunker and the tokenize command.
///
/// Chunk sizing is defined in tokens of a concrete model tokenizer, so the
/// codec is injected rather than hard-wired; tests substitute a deterministic
/// implementation.
pub trait TokenCodec {
    fn encode(&self, text: &str) -> Vec<u32>;

    fn decode(&self, tokens: &[u32]) -> Result<String>;

    fn encode_batch(&self, texts: &[&str]) -> Vec<Vec<u32>> {
        texts.iter().map(|text| self.encode(text)).collect()
    }
}

/// Ensure token ids decode back to the original string. Publishing a chunk
/// whose stored content differs from what its tokens decode to would corrupt
/// legal text silently, so a mismatch is a hard error.
pub fn validate_round_trip(text: &str, token_ids: &[u32], codec: &dyn TokenCodec) -> Result<()> {
    let decoded = codec.decode(token_ids)?;
    if decoded != text {
        return Err(anyhow!(
            "token decode mismatch: original and decoded text differ (potential boundary or encoding issue)"
        ));
    }
    Ok(())
}

pub struct TiktokenCodec {
    bpe: CoreBPE,
}

impl TiktokenCodec {
    /// Resolve the BPE for a model name, falling back to `o200k_base` when
    /// the model is unknown.
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(model)
            .or_else(|_| tiktoken_rs::o200k_base())
            .map_err(|err| anyhow!("failed to load tokenizer for model {model}: {err}"))?;
        Ok(Self { bpe })
    }
}

impl TokenCodec for TiktokenCodec {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_ordinary(text)
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|err| anyhow!("failed to decode token ids: {err}"))
    }
}
