// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands: `train`, `evaluate` and `predict`.
// Defaults reproduce a standard BERT sentiment fine-tune.
//
// Boolean switches that default to on take an explicit value,
// e.g. `--fp16 false`.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{ArgAction, Args, Subcommand};
use std::path::PathBuf;

use crate::application::{
    evaluate_use_case::EvalConfig,
    finetune_use_case::{BestMetric, OnTrainFailure, OptimizerKind, TrainConfig},
    predict_use_case::PredictConfig,
};
use crate::ml::backend::DeviceChoice;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune a pretrained model on data/train.tsv
    Train(TrainArgs),

    /// Evaluate a fine-tuned model on data/dev.tsv
    Evaluate(EvalArgs),

    /// Classify one sentence with a fine-tuned model
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory containing train.tsv
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Pretrained model directory (config.json, tokenizer.json, weights)
    #[arg(long, default_value = "pretrained/bert-base-uncased")]
    pub pretrained_dir: PathBuf,

    /// Where the fine-tuned model and tokenizer are written
    #[arg(long, default_value = "sentiment-model")]
    pub model_dir: PathBuf,

    /// Checkpoints, trainer_state.json and train_config.json
    #[arg(long, default_value = "results")]
    pub output_dir: PathBuf,

    /// metrics.csv
    #[arg(long, default_value = "logs")]
    pub logging_dir: PathBuf,

    /// Tokens per sequence after truncation / padding
    #[arg(long, default_value_t = 128)]
    pub max_length: usize,

    #[arg(long, default_value_t = 3)]
    pub epochs: usize,

    #[arg(long, default_value_t = 16)]
    pub train_batch_size: usize,

    #[arg(long, default_value_t = 64)]
    pub eval_batch_size: usize,

    /// Peak learning rate reached after warmup
    #[arg(long, default_value_t = 2e-5)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 500)]
    pub warmup_steps: usize,

    #[arg(long, default_value_t = 0.01)]
    pub weight_decay: f64,

    /// Evaluate every N optimizer steps
    #[arg(long, default_value_t = 500)]
    pub eval_steps: usize,

    /// Checkpoint every N optimizer steps
    #[arg(long, default_value_t = 500)]
    pub save_steps: usize,

    /// Maximum checkpoints kept on disk (0 = keep all); the best is always kept
    #[arg(long, default_value_t = 2)]
    pub save_total_limit: usize,

    /// Half-precision floats on the GPU backend
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub fp16: bool,

    /// Batches accumulated per optimizer step
    #[arg(long, default_value_t = 2)]
    pub grad_accum_steps: usize,

    /// adamw | adam | sgd
    #[arg(long, default_value = "adamw")]
    pub optimizer: OptimizerKind,

    /// accuracy | f1 | loss
    #[arg(long, default_value = "accuracy")]
    pub metric_for_best: BestMetric,

    /// Reload the best checkpoint before saving the final model
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub load_best_at_end: bool,

    #[arg(long, default_value_t = 100)]
    pub logging_steps: usize,

    /// Share of train.tsv held out for validation
    #[arg(long, default_value_t = 0.1)]
    pub val_fraction: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// auto | gpu | cpu
    #[arg(long, default_value = "auto")]
    pub device: DeviceChoice,

    /// abort | continue
    #[arg(long, default_value = "abort")]
    pub on_train_failure: OnTrainFailure,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:         a.data_dir,
            pretrained_dir:   a.pretrained_dir,
            model_dir:        a.model_dir,
            output_dir:       a.output_dir,
            logging_dir:      a.logging_dir,
            max_length:       a.max_length,
            epochs:           a.epochs,
            train_batch_size: a.train_batch_size,
            eval_batch_size:  a.eval_batch_size,
            learning_rate:    a.learning_rate,
            warmup_steps:     a.warmup_steps,
            weight_decay:     a.weight_decay,
            eval_steps:       a.eval_steps,
            save_steps:       a.save_steps,
            save_total_limit: a.save_total_limit,
            fp16:             a.fp16,
            grad_accum_steps: a.grad_accum_steps,
            optimizer:        a.optimizer,
            metric_for_best:  a.metric_for_best,
            load_best_at_end: a.load_best_at_end,
            logging_steps:    a.logging_steps,
            val_fraction:     a.val_fraction,
            seed:             a.seed,
            num_workers:      a.num_workers,
            device:           a.device,
            on_train_failure: a.on_train_failure,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Directory containing dev.tsv
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Fine-tuned model directory written by `train`
    #[arg(long, default_value = "sentiment-model")]
    pub model_dir: PathBuf,

    /// eval_results.json
    #[arg(long, default_value = "eval_results")]
    pub results_dir: PathBuf,

    #[arg(long, default_value_t = 128)]
    pub max_length: usize,

    #[arg(long, default_value_t = 64)]
    pub eval_batch_size: usize,

    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    pub fp16: bool,

    #[arg(long, default_value = "auto")]
    pub device: DeviceChoice,
}

impl From<EvalArgs> for EvalConfig {
    fn from(a: EvalArgs) -> Self {
        EvalConfig {
            data_dir:        a.data_dir,
            model_dir:       a.model_dir,
            results_dir:     a.results_dir,
            max_length:      a.max_length,
            eval_batch_size: a.eval_batch_size,
            num_workers:     a.num_workers,
            fp16:            a.fp16,
            device:          a.device,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Sentence to classify
    #[arg(long)]
    pub text: String,

    #[arg(long, default_value = "sentiment-model")]
    pub model_dir: PathBuf,

    #[arg(long, default_value_t = 128)]
    pub max_length: usize,

    #[arg(long, default_value = "auto")]
    pub device: DeviceChoice,
}

impl From<&PredictArgs> for PredictConfig {
    fn from(a: &PredictArgs) -> Self {
        PredictConfig {
            model_dir:  a.model_dir.clone(),
            max_length: a.max_length,
            device:     a.device,
        }
    }
}
