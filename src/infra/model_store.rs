// ============================================================
// Layer 6 — Model Store
// ============================================================
// Loads and saves the on-disk model artifact: a directory with
//
//   config.json      — architecture (Hugging Face BERT field names)
//   tokenizer.json   — Hugging Face tokenizer
//   model.mpk        — burn NamedMpk record, full precision
//
// A pretrained source directory may carry `model.safetensors`
// (a Hugging Face BERT checkpoint) instead of `model.mpk`. Its
// encoder weights are imported with key remapping; the
// classification head is freshly initialised.
//
// Saving overwrites whatever the directory held before.
// There is no versioning and no rollback.
//
// Reference: Burn Book §5 (Records), burn-import safetensors docs

use anyhow::{bail, Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};
use burn_import::safetensors::{LoadArgs, SafetensorsFileRecorder};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
};
use tokenizers::Tokenizer;

use crate::infra::tokenizer_store::TokenizerStore;
use crate::ml::model::{BertEncoderRecord, ClassifierConfig, SentimentClassifier};

pub const CONFIG_FILE:      &str = "config.json";
pub const WEIGHTS_STEM:     &str = "model";
pub const WEIGHTS_FILE:     &str = "model.mpk";
pub const SAFETENSORS_FILE: &str = "model.safetensors";

/// Hugging Face checkpoint key → burn module path.
/// Applied in order. The first rule strips the task prefix and the
/// next two rename pre-2019 LayerNorm `gamma`/`beta` keys to
/// `weight`/`bias`; the PyTorch adapter maps those onto burn's
/// LayerNorm parameters itself.
const BERT_KEY_REMAP: &[(&str, &str)] = &[
    (r"^bert\.", ""),
    (r"LayerNorm\.gamma$", "LayerNorm.weight"),
    (r"LayerNorm\.beta$", "LayerNorm.bias"),
    (r"^embeddings\.LayerNorm\.(.*)$", "embeddings.layer_norm.$1"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.self\.(query|key|value)\.(.*)$", "layers.$1.self_attn.$2.$3"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.output\.dense\.(.*)$", "layers.$1.self_attn.output.$2"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.output\.LayerNorm\.(.*)$", "layers.$1.attn_norm.$2"),
    (r"^encoder\.layer\.([0-9]+)\.intermediate\.dense\.(.*)$", "layers.$1.ffn_linear1.$2"),
    (r"^encoder\.layer\.([0-9]+)\.output\.dense\.(.*)$", "layers.$1.ffn_linear2.$2"),
    (r"^encoder\.layer\.([0-9]+)\.output\.LayerNorm\.(.*)$", "layers.$1.ffn_norm.$2"),
    (r"^pooler\.dense\.(.*)$", "pooler.$1"),
];

fn default_type_vocab_size() -> usize { 2 }
fn default_dropout()         -> f64   { 0.1 }
fn default_layer_norm_eps()  -> f64   { 1e-12 }
fn default_num_labels()      -> usize { 2 }

/// `config.json` as written by Hugging Face for BERT-family models.
/// Unknown fields are ignored; missing optional ones take BERT defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PretrainedConfig {
    #[serde(default)]
    pub model_type:              Option<String>,
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_hidden_layers:       usize,
    pub num_attention_heads:     usize,
    pub intermediate_size:       usize,
    pub max_position_embeddings: usize,
    #[serde(default = "default_type_vocab_size")]
    pub type_vocab_size:         usize,
    #[serde(default = "default_dropout")]
    pub hidden_dropout_prob:     f64,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps:          f64,
    #[serde(default = "default_num_labels")]
    pub num_labels:              usize,
}

impl PretrainedConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_attention_heads == 0 || self.hidden_size % self.num_attention_heads != 0 {
            bail!(
                "hidden_size ({}) must be divisible by num_attention_heads ({})",
                self.hidden_size,
                self.num_attention_heads
            );
        }
        if self.num_labels != 2 {
            bail!("binary sentiment needs num_labels = 2, config has {}", self.num_labels);
        }
        Ok(())
    }

    /// Sequences longer than the position table cannot be embedded.
    pub fn check_max_length(&self, max_length: usize) -> Result<()> {
        if max_length > self.max_position_embeddings {
            bail!(
                "max_length {} exceeds the model's max_position_embeddings ({})",
                max_length,
                self.max_position_embeddings
            );
        }
        Ok(())
    }

    pub fn to_classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig::new(
            self.vocab_size,
            self.hidden_size,
            self.num_hidden_layers,
            self.num_attention_heads,
            self.intermediate_size,
            self.max_position_embeddings,
        )
        .with_type_vocab_size(self.type_vocab_size)
        .with_dropout(self.hidden_dropout_prob)
        .with_layer_norm_eps(self.layer_norm_eps)
        .with_num_labels(self.num_labels)
    }
}

/// Everything loaded from one model directory.
pub struct LoadedModel<B: Backend> {
    pub model:     SentimentClassifier<B>,
    pub config:    PretrainedConfig,
    pub tokenizer: Tokenizer,
}

pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load config, tokenizer and weights.
    pub fn load<B: Backend>(&self, device: &B::Device) -> Result<LoadedModel<B>> {
        if !self.dir.is_dir() {
            bail!(
                "Model directory '{}' does not exist. {}",
                self.dir.display(),
                expected_files_hint()
            );
        }

        let config    = self.load_config()?;
        let tokenizer = TokenizerStore::new(&self.dir).load()?;
        let model     = self.load_weights::<B>(&config, device)?;

        tracing::info!(
            "Loaded model from '{}' ({} layers, hidden={}, vocab={})",
            self.dir.display(),
            config.num_hidden_layers,
            config.hidden_size,
            config.vocab_size,
        );
        Ok(LoadedModel { model, config, tokenizer })
    }

    pub fn load_config(&self) -> Result<PretrainedConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot read '{}'. {}", path.display(), expected_files_hint())
        })?;
        let config: PretrainedConfig = serde_json::from_str(&json)
            .with_context(|| format!("Invalid model config '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn load_weights<B: Backend>(
        &self,
        config: &PretrainedConfig,
        device: &B::Device,
    ) -> Result<SentimentClassifier<B>> {
        let model_cfg = config.to_classifier_config();
        let model: SentimentClassifier<B> = model_cfg.init(device);

        if self.dir.join(WEIGHTS_FILE).exists() {
            let record = NamedMpkFileRecorder::<FullPrecisionSettings>::new()
                .load(self.dir.join(WEIGHTS_STEM), device)
                .with_context(|| {
                    format!("Cannot load weights from '{}'", self.dir.join(WEIGHTS_FILE).display())
                })?;
            return Ok(model.load_record(record));
        }

        let safetensors = self.dir.join(SAFETENSORS_FILE);
        if safetensors.exists() {
            tracing::info!("Importing encoder weights from '{}'", safetensors.display());
            let args = BERT_KEY_REMAP
                .iter()
                .fold(LoadArgs::new(safetensors.clone()), |args, (pattern, replacement)| {
                    args.with_key_remap(pattern, replacement)
                });
            // The import adapter panics on some malformed key sets instead of erroring
            let imported = panic::catch_unwind(AssertUnwindSafe(|| {
                SafetensorsFileRecorder::<FullPrecisionSettings>::default()
                    .load::<BertEncoderRecord<B>>(args, device)
            }));
            let record = match imported {
                Ok(Ok(record)) => record,
                Ok(Err(e)) => bail!(
                    "Cannot import '{}': {e:?}. {}",
                    safetensors.display(),
                    expected_files_hint()
                ),
                Err(_) => bail!(
                    "Cannot import '{}': not a BERT checkpoint this model can read. {}",
                    safetensors.display(),
                    expected_files_hint()
                ),
            };

            let mut model = model;
            model.encoder = model.encoder.load_record(record);
            tracing::info!("Classification head initialised from scratch");
            return Ok(model);
        }

        bail!(
            "No weights found in '{}'. {}",
            self.dir.display(),
            expected_files_hint()
        )
    }

    /// Write config, tokenizer and weights, replacing any previous contents.
    pub fn save<B: Backend>(
        &self,
        model:     &SentimentClassifier<B>,
        config:    &PretrainedConfig,
        tokenizer: &Tokenizer,
    ) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)
                .with_context(|| format!("Cannot clear '{}'", self.dir.display()))?;
        }
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let mut config = config.clone();
        config.model_type.get_or_insert_with(|| "bert".to_string());
        fs::write(self.dir.join(CONFIG_FILE), serde_json::to_string_pretty(&config)?)
            .with_context(|| format!("Cannot write '{}'", self.dir.join(CONFIG_FILE).display()))?;

        TokenizerStore::new(&self.dir).save(tokenizer)?;

        NamedMpkFileRecorder::<FullPrecisionSettings>::new()
            .record(model.clone().into_record(), self.dir.join(WEIGHTS_STEM))
            .with_context(|| {
                format!("Failed to save weights to '{}'", self.dir.join(WEIGHTS_FILE).display())
            })?;

        tracing::info!("Model and tokenizer saved to '{}'", self.dir.display());
        Ok(())
    }
}

fn expected_files_hint() -> String {
    format!(
        "Expected {CONFIG_FILE}, tokenizer.json and either {WEIGHTS_FILE} or {SAFETENSORS_FILE}."
    )
}
