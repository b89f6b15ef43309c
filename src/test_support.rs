//! Shared fixtures for unit tests: a tiny word-level tokenizer, a tiny
//! model config and TSV helpers. CPU-only (NdArray backend).

use serde_json::json;
use std::{fs, path::{Path, PathBuf}, str::FromStr};
use tokenizers::Tokenizer;

use crate::infra::model_store::PretrainedConfig;
use crate::ml::model::ClassifierConfig;

pub type TestBackend         = burn::backend::NdArray;
pub type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;

pub const PAD_ID: u32 = 0;
pub const CLS_ID: u32 = 2;
pub const SEP_ID: u32 = 3;

/// Words known to the test vocabulary; everything else maps to [UNK].
pub const WORDS: &[&str] = &[
    "this", "movie", "was", "great", "i", "hated", "film", "loved", "it",
    "a", "wonderful", "and", "terrible", "boring", "bad", "the", "acting",
    "fine", "good", "awful", "truly", "!", ".", ",",
];

/// BERT-shaped word-level tokenizer: lowercase normaliser, whitespace
/// pre-tokeniser, [CLS] ... [SEP] post-processing.
pub fn word_level_tokenizer() -> Tokenizer {
    let mut vocab = serde_json::Map::new();
    for (id, token) in ["[PAD]", "[UNK]", "[CLS]", "[SEP]"].iter().enumerate() {
        vocab.insert(token.to_string(), json!(id));
    }
    for word in WORDS {
        let next = vocab.len();
        vocab.entry(word.to_string()).or_insert(json!(next));
    }

    let special = |id: u32, content: &str| json!({
        "id": id, "content": content, "single_word": false, "lstrip": false,
        "rstrip": false, "normalized": false, "special": true
    });

    let tokenizer_json = json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            special(PAD_ID, "[PAD]"),
            special(1, "[UNK]"),
            special(CLS_ID, "[CLS]"),
            special(SEP_ID, "[SEP]"),
        ],
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": null,
            "lowercase": true
        },
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": {
            "type": "BertProcessing",
            "sep": ["[SEP]", SEP_ID],
            "cls": ["[CLS]", CLS_ID]
        },
        "decoder": null,
        "model": { "type": "WordLevel", "vocab": vocab, "unk_token": "[UNK]" }
    });

    Tokenizer::from_str(&tokenizer_json.to_string()).expect("valid test tokenizer")
}

pub fn vocab_size() -> usize {
    4 + WORDS.len()
}

/// A model small enough to train in a unit test.
pub fn tiny_pretrained_config() -> PretrainedConfig {
    PretrainedConfig {
        model_type:              Some("bert".to_string()),
        vocab_size:              vocab_size(),
        hidden_size:             16,
        num_hidden_layers:       1,
        num_attention_heads:     2,
        intermediate_size:       32,
        max_position_embeddings: 32,
        type_vocab_size:         2,
        hidden_dropout_prob:     0.0,
        layer_norm_eps:          1e-12,
        num_labels:              2,
    }
}

pub fn tiny_model_config() -> ClassifierConfig {
    tiny_pretrained_config().to_classifier_config()
}

/// Write `sentence<TAB>label` rows (plus header) to `dir/name`.
pub fn write_tsv(dir: &Path, name: &str, rows: &[(&str, u8)]) -> PathBuf {
    let mut body = String::from("sentence\tlabel\n");
    for (text, label) in rows {
        body.push_str(&format!("{text}\t{label}\n"));
    }
    let path = dir.join(name);
    fs::write(&path, body).expect("write test tsv");
    path
}

/// Small, clearly separable sentiment corpus.
pub const SENTIMENT_ROWS: &[(&str, u8)] = &[
    ("this movie was great !", 1),
    ("i loved this film .", 1),
    ("a wonderful and great movie", 1),
    ("good acting , great film", 1),
    ("i loved it , truly wonderful", 1),
    ("fine film and good acting", 1),
    ("i hated this film .", 0),
    ("a terrible and boring movie", 0),
    ("bad acting , awful film", 0),
    ("i hated it , truly terrible", 0),
    ("the movie was boring and bad", 0),
    ("awful movie , i hated the acting", 0),
];
