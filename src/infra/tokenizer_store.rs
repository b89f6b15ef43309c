// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Reads and writes `tokenizer.json` (Hugging Face format) inside
// a model directory, so training and evaluation always share the
// exact vocabulary the model was fine-tuned with.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

pub const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load a previously saved tokenizer from JSON file
    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        let tokenizer = Tokenizer::from_file(&path)
            .map_err(|e| anyhow!(
                "Cannot load tokenizer from '{}': {}", path.display(), e
            ))?;
        tracing::debug!(
            "Tokenizer loaded from '{}' (vocab size {})",
            path.display(),
            tokenizer.get_vocab_size(true)
        );
        Ok(tokenizer)
    }

    pub fn save(&self, tokenizer: &Tokenizer) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path();
        tokenizer
            .save(&path, true)
            .map_err(|e| anyhow!("Cannot write tokenizer to '{}': {e}", path.display()))?;
        tracing::debug!("Tokenizer saved to '{}'", path.display());
        Ok(())
    }
}
