// ============================================================
// Layer 2 — FinetuneUseCase (Pipeline A)
// ============================================================
// Orchestrates fine-tuning in order:
//
//   Step 1: Load train.tsv                    (Layer 4 - data)
//   Step 2: Split train/validation (seeded)   (Layer 4 - data)
//   Step 3: Load pretrained model + tokenizer (Layer 6 - infra)
//   Step 4: Tokenise to fixed length          (Layer 4 - data)
//   Step 5: Build datasets                    (Layer 4 - data)
//   Step 6: Run the training driver           (Layer 5 - ml)
//   Step 7: Save final model + tokenizer      (Layer 6 - infra)
//   Step 8: Sample predictions                (Layer 5 - ml)
//
// A failed training run is reported with a remediation hint and
// then handled by `on_train_failure`: abort (default) or continue
// with the model as it was before training.

use anyhow::{bail, ensure, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};

use crate::data::{
    dataset::SentimentDataset,
    encoder::TextEncoder,
    loader::TsvLoader,
    splitter::split_train_val,
};
use crate::domain::metrics::ClassificationMetrics;
use crate::infra::{checkpoint::TrainerState, model_store::ModelStore};
use crate::ml::{
    backend::{dispatch, BackendTask, DeviceChoice},
    inferencer::{Prediction, Predictor},
    trainer::run_training,
};

pub const TRAIN_FILE: &str = "train.tsv";

/// Sentences classified after training as a quick sanity check.
pub const SAMPLE_TEXTS: &[&str] = &[
    "This movie was great!",
    "I hated this film.",
    "The plot was boring and the acting was awful.",
    "A wonderful film with fine acting.",
];

// ─── Choice enums ────────────────────────────────────────────────────────────
// Parsed from CLI strings and serialised lowercase into train_config.json.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    AdamW,
    Adam,
    Sgd,
}

/// Validation quantity used to pick the best checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BestMetric {
    Accuracy,
    F1,
    Loss,
}

impl BestMetric {
    /// The tracked value of an evaluation; None for loss when nothing was evaluated.
    pub fn select(self, loss: Option<f64>, metrics: &ClassificationMetrics) -> Option<f64> {
        match self {
            Self::Accuracy => Some(metrics.accuracy),
            Self::F1       => Some(metrics.f1),
            Self::Loss     => loss,
        }
    }

    /// Strict improvement; lower is better only for loss.
    pub fn is_better(self, candidate: f64, current: f64) -> bool {
        match self {
            Self::Loss => candidate < current,
            _          => candidate > current,
        }
    }
}

/// What Pipeline A does when the training driver fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnTrainFailure {
    #[default]
    Abort,
    Continue,
}

impl FromStr for OptimizerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "adamw" => Ok(Self::AdamW),
            "adam"  => Ok(Self::Adam),
            "sgd"   => Ok(Self::Sgd),
            other   => bail!("unknown optimizer '{other}' (expected adamw, adam or sgd)"),
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AdamW => "adamw",
            Self::Adam  => "adam",
            Self::Sgd   => "sgd",
        })
    }
}

impl FromStr for BestMetric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "accuracy" => Ok(Self::Accuracy),
            "f1"       => Ok(Self::F1),
            "loss"     => Ok(Self::Loss),
            other      => bail!("unknown metric '{other}' (expected accuracy, f1 or loss)"),
        }
    }
}

impl fmt::Display for BestMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accuracy => "accuracy",
            Self::F1       => "f1",
            Self::Loss     => "loss",
        })
    }
}

impl FromStr for OnTrainFailure {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "abort"    => Ok(Self::Abort),
            "continue" => Ok(Self::Continue),
            other      => bail!("unknown failure policy '{other}' (expected abort or continue)"),
        }
    }
}

impl fmt::Display for OnTrainFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Abort    => "abort",
            Self::Continue => "continue",
        })
    }
}

// ─── Training Configuration ──────────────────────────────────────────────────
// Every knob of a fine-tuning run. Serialisable so the exact
// settings are stored next to the checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:         PathBuf,
    pub pretrained_dir:   PathBuf,
    pub model_dir:        PathBuf,
    pub output_dir:       PathBuf,
    pub logging_dir:      PathBuf,
    pub max_length:       usize,
    pub epochs:           usize,
    pub train_batch_size: usize,
    pub eval_batch_size:  usize,
    pub learning_rate:    f64,
    pub warmup_steps:     usize,
    pub weight_decay:     f64,
    pub eval_steps:       usize,
    pub save_steps:       usize,
    /// 0 keeps every checkpoint
    pub save_total_limit: usize,
    pub fp16:             bool,
    pub grad_accum_steps: usize,
    pub optimizer:        OptimizerKind,
    pub metric_for_best:  BestMetric,
    pub load_best_at_end: bool,
    pub logging_steps:    usize,
    pub val_fraction:     f64,
    pub seed:             u64,
    pub num_workers:      usize,
    pub device:           DeviceChoice,
    pub on_train_failure: OnTrainFailure,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:         PathBuf::from("data"),
            pretrained_dir:   PathBuf::from("pretrained/bert-base-uncased"),
            model_dir:        PathBuf::from("sentiment-model"),
            output_dir:       PathBuf::from("results"),
            logging_dir:      PathBuf::from("logs"),
            max_length:       128,
            epochs:           3,
            train_batch_size: 16,
            eval_batch_size:  64,
            learning_rate:    2e-5,
            warmup_steps:     500,
            weight_decay:     0.01,
            eval_steps:       500,
            save_steps:       500,
            save_total_limit: 2,
            fp16:             true,
            grad_accum_steps: 2,
            optimizer:        OptimizerKind::AdamW,
            metric_for_best:  BestMetric::Accuracy,
            load_best_at_end: true,
            logging_steps:    100,
            val_fraction:     0.1,
            seed:             42,
            num_workers:      1,
            device:           DeviceChoice::Auto,
            on_train_failure: OnTrainFailure::Abort,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_length >= 2, "max_length must be at least 2 (room for [CLS] and [SEP])");
        ensure!(self.epochs > 0, "epochs must be positive");
        ensure!(
            self.train_batch_size > 0 && self.eval_batch_size > 0,
            "batch sizes must be positive"
        );
        ensure!(self.grad_accum_steps > 0, "grad_accum_steps must be positive");
        ensure!(
            self.eval_steps > 0 && self.save_steps > 0 && self.logging_steps > 0,
            "eval_steps, save_steps and logging_steps must be positive"
        );
        ensure!(self.learning_rate > 0.0, "learning_rate must be positive");
        ensure!(self.weight_decay >= 0.0, "weight_decay must not be negative");
        ensure!(
            (0.0..1.0).contains(&self.val_fraction),
            "val_fraction must be in [0, 1), got {}",
            self.val_fraction
        );
        if self.load_best_at_end {
            ensure!(
                self.save_steps % self.eval_steps == 0,
                "with load_best_at_end, save_steps ({}) must be a multiple of eval_steps ({})",
                self.save_steps,
                self.eval_steps
            );
        }
        Ok(())
    }
}

/// What a finished Pipeline A run produced.
#[derive(Debug, Clone)]
pub struct FinetuneSummary {
    pub train_examples: usize,
    pub val_examples:   usize,

    /// None when training failed and the run continued anyway
    pub trainer_state: Option<TrainerState>,

    pub samples: Vec<(String, Prediction)>,
}

// ─── FinetuneUseCase ─────────────────────────────────────────────────────────
pub struct FinetuneUseCase {
    config: TrainConfig,
}

impl FinetuneUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<FinetuneSummary> {
        self.config.validate()?;
        dispatch(self.config.device, self.config.fp16, FinetuneTask(&self.config))
    }
}

struct FinetuneTask<'a>(&'a TrainConfig);

impl BackendTask for FinetuneTask<'_> {
    type Output = FinetuneSummary;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<FinetuneSummary> {
        finetune::<B>(self.0, device)
    }
}

fn finetune<B: AutodiffBackend>(cfg: &TrainConfig, device: B::Device) -> Result<FinetuneSummary> {
    // ── Step 1: Load the labelled training file ─────────────────────────────
    let loader = TsvLoader::new(cfg.data_dir.join(TRAIN_FILE));
    let (examples, stats) = loader.load_with_stats()?;
    println!(
        "Loaded {} examples from '{}' ({} positive, {} negative, {} dropped)",
        stats.kept(),
        loader.path().display(),
        stats.positive,
        stats.negative,
        stats.dropped,
    );
    ensure!(!examples.is_empty(), "'{}' contains no usable rows", loader.path().display());

    // ── Step 2: Seeded train / validation split ─────────────────────────────
    let (train_examples, val_examples) = split_train_val(examples, cfg.val_fraction, cfg.seed);
    tracing::info!(
        "Split: {} train, {} validation",
        train_examples.len(),
        val_examples.len()
    );
    ensure!(!train_examples.is_empty(), "training split is empty");
    if val_examples.is_empty() {
        tracing::warn!("Validation split is empty; evaluation metrics will be 0");
    }

    // ── Step 3: Pretrained model + tokenizer ────────────────────────────────
    let pretrained = ModelStore::new(&cfg.pretrained_dir);
    let loaded     = pretrained.load::<B>(&device)?;
    loaded.config.check_max_length(cfg.max_length)?;
    println!("Loaded pretrained model from '{}'", pretrained.dir().display());

    // ── Step 4: Fixed-length tokenisation ───────────────────────────────────
    let encoder = TextEncoder::new(loaded.tokenizer, cfg.max_length)?;
    tracing::info!("Encoding sentences to {} tokens", encoder.max_length());
    let train_samples = encoder.encode_examples(&train_examples)?;
    let val_samples   = encoder.encode_examples(&val_examples)?;

    // ── Step 5: Burn datasets ───────────────────────────────────────────────
    let train_dataset = SentimentDataset::new(train_samples);
    let val_dataset   = SentimentDataset::new(val_samples);

    // ── Step 6: Train ───────────────────────────────────────────────────────
    let fallback = loaded.model.clone();
    let (model, trainer_state) =
        match run_training(cfg, loaded.model, train_dataset, val_dataset, &device) {
            Ok(outcome) => (outcome.model, Some(outcome.state)),
            Err(e) => match cfg.on_train_failure {
                OnTrainFailure::Abort => return Err(e),
                OnTrainFailure::Continue => {
                    tracing::warn!(
                        "on_train_failure=continue: proceeding with the model as loaded, \
                         it has NOT been fine-tuned ({e:#})"
                    );
                    println!("WARNING: training failed, continuing with the untrained model");
                    (fallback, None)
                }
            },
        };

    // ── Step 7: Save final weights + tokenizer ──────────────────────────────
    let output = ModelStore::new(&cfg.model_dir);
    output.save(&model, &loaded.config, encoder.tokenizer())?;
    println!("Model saved to '{}'", output.dir().display());

    // ── Step 8: Sample predictions ──────────────────────────────────────────
    let predictor = Predictor::new(model.valid(), encoder, device);
    let mut samples = Vec::with_capacity(SAMPLE_TEXTS.len());
    for text in SAMPLE_TEXTS {
        let prediction = predictor.predict(text)?;
        println!(
            "  {:<50} → {} (logits {:.3}, {:.3})",
            text, prediction.label, prediction.logits[0], prediction.logits[1],
        );
        samples.push((text.to_string(), prediction));
    }

    Ok(FinetuneSummary {
        train_examples: train_examples.len(),
        val_examples:   val_examples.len(),
        trainer_state,
        samples,
    })
}
