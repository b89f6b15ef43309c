// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Step checkpoints written during training, plus the JSON files
// that describe the run.
//
// Directory layout (output_dir):
//   results/
//     checkpoint-500/model.mpk    ← weights after optimizer step 500
//     checkpoint-1000/model.mpk
//     trainer_state.json          ← global step, best checkpoint, history
//     train_config.json           ← the TrainConfig used for the run
//
// Rotation: at most `save_total_limit` checkpoint directories are
// kept. The oldest are deleted first, but the best checkpoint and
// the most recent one are never deleted. A limit of 0 keeps all.
//
// Weights use NamedMpkFileRecorder at full precision, the same
// format as the final model directory, so a checkpoint can be
// reloaded into the model whatever float type training used.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::finetune_use_case::{BestMetric, TrainConfig};
use crate::infra::{metrics::EvalRecord, model_store::WEIGHTS_STEM};
use crate::ml::model::SentimentClassifier;

pub const TRAINER_STATE_FILE: &str = "trainer_state.json";
pub const TRAIN_CONFIG_FILE:  &str = "train_config.json";

/// One saved checkpoint and the evaluation metric it was saved with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub step:   usize,
    pub path:   PathBuf,
    pub metric: Option<f64>,
}

/// Everything needed to understand a finished (or interrupted) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerState {
    pub global_step:     usize,
    pub metric_for_best: BestMetric,
    pub best_metric:     Option<f64>,
    pub best_checkpoint: Option<PathBuf>,

    /// Checkpoints still on disk, oldest first
    pub checkpoints: Vec<CheckpointEntry>,

    /// Every evaluation performed, in order
    pub log_history: Vec<EvalRecord>,
}

impl TrainerState {
    pub fn new(metric_for_best: BestMetric) -> Self {
        Self {
            global_step:     0,
            metric_for_best,
            best_metric:     None,
            best_checkpoint: None,
            checkpoints:     Vec::new(),
            log_history:     Vec::new(),
        }
    }

    /// Register a freshly written checkpoint. Returns true if it is the new best.
    pub fn record_checkpoint(&mut self, entry: CheckpointEntry) -> bool {
        let improved = match (entry.metric, self.best_metric) {
            (Some(candidate), Some(best)) => self.metric_for_best.is_better(candidate, best),
            (Some(candidate), None)       => !candidate.is_nan(),
            (None, _)                     => false,
        };
        if improved {
            self.best_metric     = entry.metric;
            self.best_checkpoint = Some(entry.path.clone());
        }
        self.checkpoints.push(entry);
        improved
    }

    pub fn best_entry(&self) -> Option<&CheckpointEntry> {
        let best = self.best_checkpoint.as_ref()?;
        self.checkpoints.iter().find(|c| &c.path == best)
    }

    /// Remove entries beyond `limit` from the list and return them, oldest first.
    fn drain_excess(&mut self, limit: usize) -> Vec<CheckpointEntry> {
        let mut removed = Vec::new();
        if limit == 0 {
            return removed;
        }

        while self.checkpoints.len() > limit {
            let newest = self.checkpoints.iter().map(|c| c.step).max();
            let best   = self.best_checkpoint.as_ref();

            let Some(pos) = self
                .checkpoints
                .iter()
                .position(|c| Some(c.step) != newest && Some(&c.path) != best)
            else {
                break;
            };
            removed.push(self.checkpoints.remove(pos));
        }
        removed
    }
}

/// Manages checkpoint directories and run metadata under one output dir.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating the output directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `checkpoint-{step}/model.mpk`.
    pub fn save_checkpoint<B: Backend>(
        &self,
        model:  &SentimentClassifier<B>,
        step:   usize,
        metric: Option<f64>,
    ) -> Result<CheckpointEntry> {
        let path = self.dir.join(format!("checkpoint-{step}"));
        fs::create_dir_all(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;

        NamedMpkFileRecorder::<FullPrecisionSettings>::new()
            .record(model.clone().into_record(), path.join(WEIGHTS_STEM))
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint: step {} (metric {:?})", step, metric);
        Ok(CheckpointEntry { step, path, metric })
    }

    /// Restore weights from a checkpoint directory into `model`.
    pub fn load_checkpoint<B: Backend>(
        &self,
        model:  SentimentClassifier<B>,
        path:   &Path,
        device: &B::Device,
    ) -> Result<SentimentClassifier<B>> {
        let record = NamedMpkFileRecorder::<FullPrecisionSettings>::new()
            .load(path.join(WEIGHTS_STEM), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;
        Ok(model.load_record(record))
    }

    /// Delete checkpoint directories beyond `limit`, keeping the best and the newest.
    pub fn rotate(&self, state: &mut TrainerState, limit: usize) -> Result<()> {
        for entry in state.drain_excess(limit) {
            if entry.path.exists() {
                fs::remove_dir_all(&entry.path)
                    .with_context(|| format!("Cannot delete '{}'", entry.path.display()))?;
            }
            tracing::debug!("Rotated out checkpoint '{}'", entry.path.display());
        }
        Ok(())
    }

    pub fn save_state(&self, state: &TrainerState) -> Result<()> {
        let path = self.dir.join(TRAINER_STATE_FILE);
        fs::write(&path, serde_json::to_string_pretty(state)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        Ok(())
    }

    /// Save the training configuration next to the checkpoints.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(TRAIN_CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::ClassificationMetrics;
    use crate::test_support::{self, TestBackend};

    fn read_state(manager: &CheckpointManager) -> TrainerState {
        let json = fs::read_to_string(manager.dir().join(TRAINER_STATE_FILE)).unwrap();
        serde_json::from_str(&json).unwrap()
    }

    fn entry(step: usize, metric: Option<f64>) -> CheckpointEntry {
        CheckpointEntry { step, path: PathBuf::from(format!("checkpoint-{step}")), metric }
    }

    #[test]
    fn test_best_tracks_higher_accuracy() {
        let mut state = TrainerState::new(BestMetric::Accuracy);
        assert!(state.record_checkpoint(entry(10, Some(0.6))));
        assert!(!state.record_checkpoint(entry(20, Some(0.5))));
        assert!(!state.record_checkpoint(entry(30, Some(0.6))));
        assert!(state.record_checkpoint(entry(40, Some(0.9))));
        assert_eq!(state.best_entry().unwrap().step, 40);
    }

    #[test]
    fn test_best_tracks_lower_loss() {
        let mut state = TrainerState::new(BestMetric::Loss);
        state.record_checkpoint(entry(10, Some(0.7)));
        state.record_checkpoint(entry(20, Some(0.3)));
        state.record_checkpoint(entry(30, Some(0.4)));
        assert_eq!(state.best_entry().unwrap().step, 20);
    }

    #[test]
    fn test_checkpoint_without_metric_is_never_best() {
        let mut state = TrainerState::new(BestMetric::Accuracy);
        assert!(!state.record_checkpoint(entry(10, None)));
        assert!(state.best_entry().is_none());
    }

    #[test]
    fn test_rotation_keeps_best_and_newest() {
        let mut state = TrainerState::new(BestMetric::Accuracy);
        state.record_checkpoint(entry(10, Some(0.9)));
        state.record_checkpoint(entry(20, Some(0.5)));
        state.record_checkpoint(entry(30, Some(0.6)));
        state.record_checkpoint(entry(40, Some(0.7)));

        let removed: Vec<usize> = state.drain_excess(2).iter().map(|c| c.step).collect();
        assert_eq!(removed, vec![20, 30]);

        let kept: Vec<usize> = state.checkpoints.iter().map(|c| c.step).collect();
        assert_eq!(kept, vec![10, 40]);
    }

    #[test]
    fn test_rotation_limit_one_still_keeps_best() {
        let mut state = TrainerState::new(BestMetric::Accuracy);
        state.record_checkpoint(entry(10, Some(0.9)));
        state.record_checkpoint(entry(20, Some(0.5)));

        assert!(state.drain_excess(1).is_empty());
        assert_eq!(state.checkpoints.len(), 2);
    }

    #[test]
    fn test_rotation_limit_zero_keeps_everything() {
        let mut state = TrainerState::new(BestMetric::Accuracy);
        for step in 1..=5 {
            state.record_checkpoint(entry(step, Some(0.1)));
        }
        assert!(state.drain_excess(0).is_empty());
        assert_eq!(state.checkpoints.len(), 5);
    }

    #[test]
    fn test_save_rotate_and_reload_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model = test_support::tiny_model_config().init::<TestBackend>(&device);
        let manager = CheckpointManager::new(dir.path().join("results")).unwrap();

        let mut state = TrainerState::new(BestMetric::Accuracy);
        for (step, acc) in [(5, 0.8), (10, 0.4), (15, 0.6)] {
            let e = manager.save_checkpoint(&model, step, Some(acc)).unwrap();
            assert!(e.path.join("model.mpk").exists());
            state.record_checkpoint(e);
            manager.rotate(&mut state, 2).unwrap();
        }
        manager.save_state(&state).unwrap();

        assert!(manager.dir().join("checkpoint-5").exists());
        assert!(!manager.dir().join("checkpoint-10").exists());
        assert!(manager.dir().join("checkpoint-15").exists());

        let reloaded = read_state(&manager);
        assert_eq!(reloaded.best_metric, Some(0.8));
        assert_eq!(reloaded.checkpoints.len(), 2);

        let fresh = test_support::tiny_model_config().init::<TestBackend>(&device);
        let best = reloaded.best_entry().unwrap().path.clone();
        manager.load_checkpoint(fresh, &best, &device).unwrap();
    }

    #[test]
    fn test_state_without_validation_loss_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        let metrics = ClassificationMetrics::compute(&[], &[]).unwrap();

        let mut state = TrainerState::new(BestMetric::Loss);
        state.log_history.push(EvalRecord::new(2, 1, 0.7, None, metrics));
        state.record_checkpoint(entry(2, None));
        manager.save_state(&state).unwrap();

        let reloaded = read_state(&manager);
        assert_eq!(reloaded.log_history[0].eval_loss, None);
        assert_eq!(reloaded.log_history[0].train_loss, 0.7);
        assert_eq!(reloaded.best_metric, None);
    }
}
