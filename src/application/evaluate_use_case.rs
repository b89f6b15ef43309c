// ============================================================
// Layer 2 — EvaluateUseCase (Pipeline B)
// ============================================================
// Scores a fine-tuned model on a held-out file:
//
//   Step 1: Load dev.tsv (file order)        (Layer 4 - data)
//   Step 2: Load model + tokenizer           (Layer 6 - infra)
//   Step 3: Tokenise + build dataset         (Layer 4 - data)
//   Step 4: One evaluation pass              (Layer 5 - ml)
//   Step 5: Print metrics, write JSON        (Layer 1 output / Layer 6)
//
// The model runs on the inner (non-autodiff) backend.

use anyhow::{Context, Result};
use burn::{data::dataloader::DataLoaderBuilder, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::{
    batcher::SentimentBatcher, dataset::SentimentDataset, encoder::TextEncoder, loader::TsvLoader,
};
use crate::domain::metrics::ConfusionCounts;
use crate::infra::model_store::ModelStore;
use crate::ml::{
    backend::{dispatch, BackendTask, DeviceChoice},
    evaluator::{evaluate, BatchLoader},
};

pub const DEV_FILE:     &str = "dev.tsv";
pub const RESULTS_FILE: &str = "eval_results.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    pub data_dir:        PathBuf,
    pub model_dir:       PathBuf,
    pub results_dir:     PathBuf,
    pub max_length:      usize,
    pub eval_batch_size: usize,
    pub num_workers:     usize,
    pub fp16:            bool,
    pub device:          DeviceChoice,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            data_dir:        PathBuf::from("data"),
            model_dir:       PathBuf::from("sentiment-model"),
            results_dir:     PathBuf::from("eval_results"),
            max_length:      128,
            eval_batch_size: 64,
            num_workers:     1,
            fp16:            false,
            device:          DeviceChoice::Auto,
        }
    }
}

/// Contents of eval_results.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResults {
    pub model_dir: PathBuf,
    pub data_file: PathBuf,
    pub examples:  usize,
    pub eval_loss: Option<f64>,
    pub accuracy:  f64,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub counts:    ConfusionCounts,
}

pub struct EvaluateUseCase {
    config: EvalConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EvalResults> {
        anyhow::ensure!(self.config.eval_batch_size > 0, "eval_batch_size must be positive");
        dispatch(self.config.device, self.config.fp16, EvaluateTask(&self.config))
    }
}

struct EvaluateTask<'a>(&'a EvalConfig);

impl BackendTask for EvaluateTask<'_> {
    type Output = EvalResults;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<EvalResults> {
        let cfg = self.0;

        // ── Step 1: Evaluation examples ───────────────────────────────────────
        let loader = TsvLoader::new(cfg.data_dir.join(DEV_FILE));
        let (examples, stats) = loader.load_with_stats()?;
        println!(
            "Loaded {} evaluation examples from '{}' ({} dropped)",
            stats.kept(),
            loader.path().display(),
            stats.dropped,
        );

        // ── Step 2: Fine-tuned model ──────────────────────────────────────────
        let store  = ModelStore::new(&cfg.model_dir);
        let loaded = store.load::<B::InnerBackend>(&device)?;
        loaded.config.check_max_length(cfg.max_length)?;
        println!("Loaded model from '{}'", store.dir().display());

        // ── Step 3: Tokenise ──────────────────────────────────────────────────
        let encoder = TextEncoder::new(loaded.tokenizer, cfg.max_length)?;
        let dataset = SentimentDataset::new(encoder.encode_examples(&examples)?);

        let batches: BatchLoader<B::InnerBackend> = DataLoaderBuilder::new(SentimentBatcher)
            .batch_size(cfg.eval_batch_size)
            .num_workers(cfg.num_workers)
            .set_device(device.clone())
            .build(dataset);

        // ── Step 4: Evaluate ──────────────────────────────────────────────────
        let report = evaluate(&loaded.model, &batches)?;
        let m = report.metrics;

        println!("Evaluation results:");
        println!("  accuracy:  {:.4}", m.accuracy);
        println!("  precision: {:.4}", m.precision);
        println!("  recall:    {:.4}", m.recall);
        println!("  f1:        {:.4}", m.f1);

        // ── Step 5: Persist ───────────────────────────────────────────────────
        let results = EvalResults {
            model_dir: cfg.model_dir.clone(),
            data_file: loader.path().to_path_buf(),
            examples:  examples.len(),
            eval_loss: report.loss,
            accuracy:  m.accuracy,
            precision: m.precision,
            recall:    m.recall,
            f1:        m.f1,
            counts:    m.counts,
        };
        write_results(&cfg.results_dir, &results)?;
        Ok(results)
    }
}

fn write_results(dir: &Path, results: &EvalResults) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create results dir '{}'", dir.display()))?;
    let path = dir.join(RESULTS_FILE);
    fs::write(&path, serde_json::to_string_pretty(results)?)
        .with_context(|| format!("Cannot write '{}'", path.display()))?;
    tracing::info!("Evaluation results written to '{}'", path.display());
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, TestBackend};

    fn saved_model(root: &Path) -> EvalConfig {
        let data = root.join("data");
        fs::create_dir_all(&data).unwrap();
        test_support::write_tsv(&data, DEV_FILE, test_support::SENTIMENT_ROWS);

        let device = Default::default();
        let model = test_support::tiny_model_config().init::<TestBackend>(&device);
        ModelStore::new(root.join("model"))
            .save(&model, &test_support::tiny_pretrained_config(), &test_support::word_level_tokenizer())
            .unwrap();

        EvalConfig {
            data_dir:        data,
            model_dir:       root.join("model"),
            results_dir:     root.join("eval"),
            max_length:      12,
            eval_batch_size: 5,
            device:          DeviceChoice::Cpu,
            ..EvalConfig::default()
        }
    }

    #[test]
    fn test_evaluate_twice_gives_identical_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = saved_model(dir.path());

        let first  = EvaluateUseCase::new(cfg.clone()).execute().unwrap();
        let second = EvaluateUseCase::new(cfg).execute().unwrap();

        assert_eq!(first.examples, test_support::SENTIMENT_ROWS.len());
        assert_eq!(first.counts.total(), first.examples);
        assert_eq!(first.accuracy, second.accuracy);
        assert_eq!(first.precision, second.precision);
        assert_eq!(first.recall, second.recall);
        assert_eq!(first.f1, second.f1);
        assert_eq!(first.counts, second.counts);
    }

    #[test]
    fn test_results_json_written() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = saved_model(dir.path());

        let results = EvaluateUseCase::new(cfg.clone()).execute().unwrap();

        let json = fs::read_to_string(cfg.results_dir.join(RESULTS_FILE)).unwrap();
        let parsed: EvalResults = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.counts, results.counts);
        assert_eq!(parsed.examples, 12);
    }

    #[test]
    fn test_empty_dev_file_has_no_loss() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = saved_model(dir.path());
        test_support::write_tsv(&cfg.data_dir, DEV_FILE, &[]);

        let results = EvaluateUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(results.examples, 0);
        assert_eq!(results.eval_loss, None);

        let json = fs::read_to_string(cfg.results_dir.join(RESULTS_FILE)).unwrap();
        let parsed: EvalResults = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, results);
    }

    #[test]
    fn test_max_length_past_position_table_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EvalConfig { max_length: 64, ..saved_model(dir.path()) };

        let err = EvaluateUseCase::new(cfg).execute().unwrap_err();
        assert!(format!("{err:#}").contains("max_position_embeddings"));
    }

    #[test]
    fn test_max_length_without_room_for_text_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EvalConfig { max_length: 1, ..saved_model(dir.path()) };

        let err = EvaluateUseCase::new(cfg).execute().unwrap_err();
        assert!(format!("{err:#}").contains("special tokens"));
    }

    #[test]
    fn test_missing_model_dir_names_expected_files() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EvalConfig {
            model_dir: dir.path().join("absent"),
            ..saved_model(dir.path())
        };

        let err = EvaluateUseCase::new(cfg).execute().unwrap_err();
        assert!(format!("{err:#}").contains("config.json"));
    }
}
