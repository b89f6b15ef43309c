// ============================================================
// Layer 5 — Training Driver
// ============================================================
// Step-based fine-tuning loop over Burn's DataLoader.
//
// Per batch:
//   loss = cross_entropy(model(batch)) / grad_accum
//   grads accumulate until grad_accum batches are seen
//   (or the epoch ends), then one optimizer step runs at the
//   scheduled learning rate.
//
// Per optimizer step (global_step):
//   every logging_steps → log mean training loss
//   every eval_steps    → validation pass, CSV row, console line
//   every save_steps    → checkpoint-{step}, rotation, trainer state
//
// Learning rate (linear warmup, then linear decay to zero):
//
//   lr(s) = peak * s / warmup                        s < warmup
//   lr(s) = peak * (total - s) / (total - warmup)    otherwise
//
// Backend notes:
//   - Training runs on B (Autodiff<...>) for gradients
//   - model.valid() returns the model on B::InnerBackend
//   - The validation loader is built on B::InnerBackend as well
//
// Reference: Loshchilov & Hutter (2019) AdamW

use anyhow::{anyhow, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{
        decay::WeightDecayConfig, AdamConfig, AdamWConfig, GradientsAccumulator,
        GradientsParams, Optimizer, SgdConfig,
    },
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::panic::{self, AssertUnwindSafe};

use crate::application::finetune_use_case::{OptimizerKind, TrainConfig};
use crate::data::{batcher::SentimentBatcher, dataset::SentimentDataset};
use crate::infra::{
    checkpoint::{CheckpointManager, TrainerState},
    metrics::{EvalRecord, MetricsLogger},
};
use crate::ml::{
    evaluator::{evaluate, BatchLoader},
    model::SentimentClassifier,
};

pub const FAILURE_HINT: &str = "reduce the batch size or disable fp16";

/// Linear warmup followed by linear decay to zero.
#[derive(Debug, Clone, Copy)]
pub struct LinearSchedule {
    peak:   f64,
    warmup: usize,
    total:  usize,
}

impl LinearSchedule {
    pub fn new(peak: f64, warmup: usize, total: usize) -> Self {
        Self { peak, warmup, total }
    }

    /// Learning rate for the optimizer step with 0-based index `step`.
    pub fn lr_at(&self, step: usize) -> f64 {
        if step < self.warmup {
            return self.peak * step as f64 / self.warmup.max(1) as f64;
        }
        let remaining = self.total.saturating_sub(step) as f64;
        let span      = self.total.saturating_sub(self.warmup).max(1) as f64;
        self.peak * remaining / span
    }
}

/// Result of a completed training run.
pub struct TrainOutcome<B: AutodiffBackend> {
    pub model: SentimentClassifier<B>,
    pub state: TrainerState,
}

/// Run `fit`, turning a panic inside the loop into an error carrying the remediation hint.
pub fn run_training<B: AutodiffBackend>(
    cfg:    &TrainConfig,
    model:  SentimentClassifier<B>,
    train:  SentimentDataset,
    valid:  SentimentDataset,
    device: &B::Device,
) -> Result<TrainOutcome<B>> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| fit(cfg, model, train, valid, device)));

    match result {
        Ok(Ok(outcome)) => Ok(outcome),
        Ok(Err(e)) => {
            tracing::error!("Training failed: {e:#}. Try to {FAILURE_HINT}.");
            Err(e.context(format!("training failed ({FAILURE_HINT})")))
        }
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("Training panicked: {msg}. Try to {FAILURE_HINT}.");
            Err(anyhow!("training panicked: {msg} ({FAILURE_HINT})"))
        }
    }
}

/// Fine-tune `model` on `train`, evaluating on `valid`.
pub fn fit<B: AutodiffBackend>(
    cfg:    &TrainConfig,
    model:  SentimentClassifier<B>,
    train:  SentimentDataset,
    valid:  SentimentDataset,
    device: &B::Device,
) -> Result<TrainOutcome<B>> {
    B::seed(cfg.seed);

    let weight_decay = cfg.weight_decay as f32;
    match cfg.optimizer {
        OptimizerKind::AdamW => {
            let optim = AdamWConfig::new()
                .with_epsilon(1e-8)
                .with_weight_decay(weight_decay)
                .init();
            train_loop(cfg, model, optim, train, valid, device)
        }
        OptimizerKind::Adam => {
            let optim = AdamConfig::new()
                .with_epsilon(1e-8)
                .with_weight_decay(decay(weight_decay))
                .init();
            train_loop(cfg, model, optim, train, valid, device)
        }
        OptimizerKind::Sgd => {
            let optim = SgdConfig::new()
                .with_weight_decay(decay(weight_decay))
                .init();
            train_loop(cfg, model, optim, train, valid, device)
        }
    }
}

fn decay(penalty: f32) -> Option<WeightDecayConfig> {
    (penalty > 0.0).then(|| WeightDecayConfig::new(penalty))
}

/// Mean of the losses pushed since the last `take`.
#[derive(Default)]
struct LossWindow {
    sum:   f64,
    count: usize,
}

impl LossWindow {
    fn push(&mut self, loss: f64) {
        self.sum   += loss;
        self.count += 1;
    }

    fn take(&mut self) -> f64 {
        let mean = if self.count > 0 { self.sum / self.count as f64 } else { f64::NAN };
        *self = Self::default();
        mean
    }
}

/// Everything that happens after an optimizer step.
struct StepHooks<'a, B: AutodiffBackend> {
    cfg:          &'a TrainConfig,
    total_steps:  usize,
    schedule:     LinearSchedule,
    val_loader:   BatchLoader<B::InnerBackend>,
    checkpoints:  CheckpointManager,
    metrics_log:  MetricsLogger,
    state:        TrainerState,
    log_window:   LossWindow,
    eval_window:  LossWindow,
    last_metric:  Option<f64>,
}

impl<B: AutodiffBackend> StepHooks<'_, B> {
    fn after_step(&mut self, model: &SentimentClassifier<B>, epoch: usize) -> Result<()> {
        let step = self.state.global_step;

        if step % self.cfg.logging_steps == 0 {
            let loss = self.log_window.take();
            tracing::info!(
                "step {}/{} | loss={:.4} | lr={:.3e}",
                step,
                self.total_steps,
                loss,
                self.schedule.lr_at(step - 1),
            );
        }

        if step % self.cfg.eval_steps == 0 {
            let report = evaluate(&model.valid(), &self.val_loader)?;
            let record = EvalRecord::new(step, epoch, self.eval_window.take(), report.loss, report.metrics);

            println!(
                "Step {:>6} | epoch {} | train_loss={:.4} | eval_loss={} | accuracy={:.4} | f1={:.4}",
                step, epoch, record.train_loss,
                record.eval_loss.map_or_else(|| "n/a".to_string(), |l| format!("{l:.4}")),
                record.metrics.accuracy, record.metrics.f1,
            );

            self.metrics_log.log(&record)?;
            self.last_metric = self.cfg.metric_for_best.select(report.loss, &report.metrics);
            self.state.log_history.push(record);
        }

        if step % self.cfg.save_steps == 0 {
            let entry = self.checkpoints.save_checkpoint(model, step, self.last_metric)?;
            if self.state.record_checkpoint(entry) {
                tracing::info!(
                    "New best checkpoint at step {} ({} = {:.4})",
                    step,
                    self.cfg.metric_for_best,
                    self.last_metric.unwrap_or(f64::NAN),
                );
            }
            self.checkpoints.rotate(&mut self.state, self.cfg.save_total_limit)?;
            self.checkpoints.save_state(&self.state)?;
        }

        Ok(())
    }
}

fn train_loop<B, O>(
    cfg:       &TrainConfig,
    mut model: SentimentClassifier<B>,
    mut optim: O,
    train:     SentimentDataset,
    valid:     SentimentDataset,
    device:    &B::Device,
) -> Result<TrainOutcome<B>>
where
    B: AutodiffBackend,
    O: Optimizer<SentimentClassifier<B>, B>,
{
    let batches_per_epoch = train.sample_count().div_ceil(cfg.train_batch_size);
    let steps_per_epoch   = batches_per_epoch.div_ceil(cfg.grad_accum_steps);
    let total_steps       = steps_per_epoch * cfg.epochs;

    tracing::info!(
        "Training: {} samples, {} epochs, {} optimizer steps ({} per epoch, grad_accum={})",
        train.sample_count(),
        cfg.epochs,
        total_steps,
        steps_per_epoch,
        cfg.grad_accum_steps,
    );

    // ── Training data loader (AutodiffBackend, shuffled) ─────────────────────
    let train_loader: BatchLoader<B> = DataLoaderBuilder::new(SentimentBatcher)
        .batch_size(cfg.train_batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .set_device(device.clone())
        .build(train);

    // ── Validation data loader (InnerBackend, file order) ────────────────────
    let val_loader: BatchLoader<B::InnerBackend> = DataLoaderBuilder::new(SentimentBatcher)
        .batch_size(cfg.eval_batch_size)
        .num_workers(cfg.num_workers)
        .set_device(device.clone())
        .build(valid);

    let checkpoints = CheckpointManager::new(&cfg.output_dir)?;
    checkpoints.save_config(cfg)?;

    let mut hooks = StepHooks::<B> {
        cfg,
        total_steps,
        schedule:    LinearSchedule::new(cfg.learning_rate, cfg.warmup_steps, total_steps),
        val_loader,
        checkpoints,
        metrics_log: MetricsLogger::new(&cfg.logging_dir)?,
        state:       TrainerState::new(cfg.metric_for_best),
        log_window:  LossWindow::default(),
        eval_window: LossWindow::default(),
        last_metric: None,
    };

    let scale = 1.0 / cfg.grad_accum_steps as f64;

    for epoch in 1..=cfg.epochs {
        let mut accumulator = GradientsAccumulator::<SentimentClassifier<B>>::new();
        let mut pending     = 0usize;
        let mut epoch_loss  = LossWindow::default();

        for batch in train_loader.iter() {
            let (loss, _) = model.forward_loss(batch);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            hooks.log_window.push(loss_val);
            hooks.eval_window.push(loss_val);
            epoch_loss.push(loss_val);

            let grads = (loss * scale).backward();
            let grads = GradientsParams::from_grads(grads, &model);
            accumulator.accumulate(&model, grads);
            pending += 1;

            if pending == cfg.grad_accum_steps {
                let lr = hooks.schedule.lr_at(hooks.state.global_step);
                model = optim.step(lr, model, accumulator.grads());
                pending = 0;
                hooks.state.global_step += 1;
                hooks.after_step(&model, epoch)?;
            }
        }

        // Trailing partial accumulation group
        if pending > 0 {
            let lr = hooks.schedule.lr_at(hooks.state.global_step);
            model = optim.step(lr, model, accumulator.grads());
            hooks.state.global_step += 1;
            hooks.after_step(&model, epoch)?;
        }

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | global_step={}",
            epoch, cfg.epochs, epoch_loss.take(), hooks.state.global_step,
        );
    }

    let StepHooks { checkpoints, state, .. } = hooks;
    checkpoints.save_state(&state)?;

    if cfg.load_best_at_end {
        if let Some(best) = state.best_entry() {
            tracing::info!(
                "Loading best checkpoint '{}' ({} = {:.4})",
                best.path.display(),
                cfg.metric_for_best,
                best.metric.unwrap_or(f64::NAN),
            );
            model = checkpoints.load_checkpoint(model, &best.path, device)?;
        } else {
            tracing::warn!("load_best_at_end is set but no checkpoint carried an evaluation metric");
        }
    }

    tracing::info!("Training complete after {} optimizer steps", state.global_step);
    Ok(TrainOutcome { model, state })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::finetune_use_case::BestMetric;
    use crate::data::{encoder::TextEncoder, loader::TsvLoader};
    use crate::domain::example::Label;
    use crate::ml::inferencer::Predictor;
    use crate::test_support::{self, TestAutodiffBackend};
    use std::path::Path;

    #[test]
    fn test_schedule_warmup_then_decay() {
        let s = LinearSchedule::new(1.0, 10, 110);
        assert_eq!(s.lr_at(0), 0.0);
        assert!((s.lr_at(5) - 0.5).abs() < 1e-12);
        assert!((s.lr_at(10) - 1.0).abs() < 1e-12);
        assert!((s.lr_at(60) - 0.5).abs() < 1e-12);
        assert_eq!(s.lr_at(110), 0.0);
        assert_eq!(s.lr_at(500), 0.0);
    }

    #[test]
    fn test_schedule_without_warmup_starts_at_peak() {
        let s = LinearSchedule::new(2e-5, 0, 4);
        assert!((s.lr_at(0) - 2e-5).abs() < 1e-18);
        assert!((s.lr_at(2) - 1e-5).abs() < 1e-18);
    }

    #[test]
    fn test_loss_window_mean_resets() {
        let mut w = LossWindow::default();
        w.push(1.0);
        w.push(3.0);
        assert_eq!(w.take(), 2.0);
        assert!(w.take().is_nan());
    }

    fn quick_config(root: &Path) -> TrainConfig {
        TrainConfig {
            output_dir:       root.join("results"),
            logging_dir:      root.join("logs"),
            max_length:       12,
            epochs:           80,
            train_batch_size: 4,
            eval_batch_size:  8,
            learning_rate:    5e-3,
            warmup_steps:     0,
            weight_decay:     0.0,
            eval_steps:       30,
            save_steps:       30,
            save_total_limit: 2,
            fp16:             false,
            grad_accum_steps: 1,
            metric_for_best:  BestMetric::Accuracy,
            logging_steps:    30,
            ..TrainConfig::default()
        }
    }

    fn encoded_rows(root: &Path, encoder: &TextEncoder) -> SentimentDataset {
        let path = test_support::write_tsv(root, "train.tsv", test_support::SENTIMENT_ROWS);
        let (examples, _) = TsvLoader::new(path).load_with_stats().unwrap();
        SentimentDataset::new(encoder.encode_examples(&examples).unwrap())
    }

    #[test]
    fn test_fit_learns_separable_sentiment() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = quick_config(dir.path());
        let device = Default::default();

        let encoder = TextEncoder::new(test_support::word_level_tokenizer(), cfg.max_length).unwrap();
        let model = test_support::tiny_model_config().init::<TestAutodiffBackend>(&device);

        let outcome = fit(
            &cfg,
            model,
            encoded_rows(dir.path(), &encoder),
            encoded_rows(dir.path(), &encoder),
            &device,
        )
        .unwrap();

        // 12 samples / batch 4 = 3 steps per epoch
        assert_eq!(outcome.state.global_step, 240);
        assert_eq!(outcome.state.log_history.len(), 8);
        assert!(outcome.state.checkpoints.len() <= 2);
        assert!(outcome.state.best_entry().is_some());
        assert!(cfg.logging_dir.join("metrics.csv").exists());
        assert!(cfg.output_dir.join("trainer_state.json").exists());
        assert!(cfg.output_dir.join("train_config.json").exists());

        let predictor = Predictor::new(outcome.model.valid(), encoder, device);
        assert_eq!(predictor.predict("This movie was great!").unwrap().label, Label::Positive);
        assert_eq!(predictor.predict("I hated this film.").unwrap().label, Label::Negative);
    }

    #[test]
    fn test_grad_accum_counts_trailing_partial_group() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            epochs:           2,
            grad_accum_steps: 2,
            load_best_at_end: false,
            ..quick_config(dir.path())
        };
        let device = Default::default();

        let encoder = TextEncoder::new(test_support::word_level_tokenizer(), cfg.max_length).unwrap();
        let model = test_support::tiny_model_config().init::<TestAutodiffBackend>(&device);

        let outcome = fit(
            &cfg,
            model,
            encoded_rows(dir.path(), &encoder),
            encoded_rows(dir.path(), &encoder),
            &device,
        )
        .unwrap();

        // 3 batches per epoch → one full group of 2 plus a trailing group of 1
        assert_eq!(outcome.state.global_step, 4);
        assert!(outcome.state.log_history.is_empty());
    }
}
