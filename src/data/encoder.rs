// ============================================================
// Layer 4 — Text Encoder (tokenisation adapter)
// ============================================================
// Wraps a Hugging Face tokenizer so every sentence comes out as
// exactly `max_length` token ids plus a matching attention mask:
//
//   "a great film"  →  [CLS] a great film [SEP] [PAD] [PAD] ...
//   mask            →    1   1   1    1    1     0     0   ...
//
// Longer sentences are truncated (special tokens are kept),
// shorter ones are padded with the tokenizer's pad token.
// The result is deterministic for a given vocabulary and length.
//
// Reference: tokenizers crate documentation (TruncationParams,
//            PaddingParams with PaddingStrategy::Fixed)

use anyhow::{anyhow, ensure, Result};
use tokenizers::{PaddingParams, PaddingStrategy, PostProcessor, Tokenizer, TruncationParams};

use crate::data::dataset::EncodedSample;
use crate::domain::example::Example;

/// Token ids and attention mask for one piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedText {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
}

pub struct TextEncoder {
    tokenizer:  Tokenizer,
    max_length: usize,
}

impl TextEncoder {
    /// Configure `tokenizer` for fixed-length output.
    pub fn new(mut tokenizer: Tokenizer, max_length: usize) -> Result<Self> {
        let special = tokenizer
            .get_post_processor()
            .map_or(0, |p| p.added_tokens(false));
        ensure!(
            max_length > special,
            "max_length must exceed the {special} special tokens the tokenizer adds (got {max_length})"
        );

        let (pad_id, pad_token) = pad_token(&tokenizer);

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Cannot configure truncation: {e}"))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_length),
            pad_id,
            pad_token,
            ..Default::default()
        }));

        tracing::debug!("Text encoder ready: max_length={}, pad_id={}", max_length, pad_id);
        Ok(Self { tokenizer, max_length })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Encode one string.
    pub fn encode(&self, text: &str) -> Result<EncodedText> {
        let enc = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;
        self.fixed(enc.get_ids(), enc.get_attention_mask())
    }

    /// Encode many strings; output order matches input order.
    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<EncodedText>> {
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let encodings = self
            .tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;

        encodings
            .iter()
            .map(|enc| self.fixed(enc.get_ids(), enc.get_attention_mask()))
            .collect()
    }

    /// Encode labelled examples into dataset samples.
    pub fn encode_examples(&self, examples: &[Example]) -> Result<Vec<EncodedSample>> {
        let texts: Vec<String> = examples.iter().map(|e| e.text.clone()).collect();
        let encoded = self.encode_batch(&texts)?;

        Ok(encoded
            .into_iter()
            .zip(examples)
            .map(|(enc, example)| EncodedSample {
                input_ids:      enc.input_ids,
                attention_mask: enc.attention_mask,
                label:          example.label,
            })
            .collect())
    }

    fn fixed(&self, ids: &[u32], mask: &[u32]) -> Result<EncodedText> {
        ensure!(
            ids.len() == self.max_length && mask.len() == self.max_length,
            "tokenizer produced {} ids / {} mask entries, expected {}",
            ids.len(),
            mask.len(),
            self.max_length
        );
        Ok(EncodedText {
            input_ids:      ids.to_vec(),
            attention_mask: mask.to_vec(),
        })
    }
}

/// Pad id and token: the tokenizer's own padding config if it has one,
/// otherwise the first known pad token in the vocabulary, otherwise id 0.
fn pad_token(tokenizer: &Tokenizer) -> (u32, String) {
    if let Some(p) = tokenizer.get_padding() {
        return (p.pad_id, p.pad_token.clone());
    }
    ["[PAD]", "<pad>"]
        .iter()
        .find_map(|t| tokenizer.token_to_id(t).map(|id| (id, t.to_string())))
        .unwrap_or_else(|| (0, "[PAD]".to_string()))
}
