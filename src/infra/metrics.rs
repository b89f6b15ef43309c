// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Writes one CSV row per evaluation pass during training.
// Each run starts a fresh file.
//
// Output file: {logging_dir}/metrics.csv
//
// Example CSV output:
//   step,epoch,train_loss,eval_loss,accuracy,precision,recall,f1
//   500,1,0.412300,0.351200,0.861200,0.870100,0.858800,0.864400
//   1000,1,0.298700,0.310500,0.882000,0.889900,0.878300,0.884100
//
// How to read the metrics:
//   - eval_loss rising while train_loss falls → overfitting
//   - precision ≫ recall → the model is reluctant to say "positive"
//   - an empty eval_loss field means the validation split was empty

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::domain::metrics::ClassificationMetrics;

const CSV_HEADER: &str = "step,epoch,train_loss,eval_loss,accuracy,precision,recall,f1";

/// One evaluation point during training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRecord {
    /// Optimizer step at which the evaluation ran
    pub step: usize,

    /// 1-based epoch the step belongs to
    pub epoch: usize,

    /// Mean training loss since the previous evaluation
    pub train_loss: f64,

    /// Mean cross-entropy over the validation set; None when it is empty
    pub eval_loss: Option<f64>,

    pub metrics: ClassificationMetrics,
}

impl EvalRecord {
    pub fn new(
        step:       usize,
        epoch:      usize,
        train_loss: f64,
        eval_loss:  Option<f64>,
        metrics:    ClassificationMetrics,
    ) -> Self {
        Self { step, epoch, train_loss, eval_loss, metrics }
    }
}

/// Logs evaluation records to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the logging directory and start `metrics.csv` with a header,
    /// replacing the file a previous run left behind.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create logging dir '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");

        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "{CSV_HEADER}")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    pub fn log(&self, r: &EvalRecord) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{},{:.6},{},{:.6},{:.6},{:.6},{:.6}",
            r.step,
            r.epoch,
            r.train_loss,
            r.eval_loss.map(|l| format!("{l:.6}")).unwrap_or_default(),
            r.metrics.accuracy,
            r.metrics.precision,
            r.metrics.recall,
            r.metrics.f1,
        )?;

        tracing::debug!(
            "Logged step {} metrics: eval_loss={:?}, accuracy={:.4}",
            r.step,
            r.eval_loss,
            r.metrics.accuracy,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_follow_single_header() {
        let dir = tempfile::tempdir().unwrap();
        let metrics = ClassificationMetrics::compute(&[1, 0], &[1, 1]).unwrap();

        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EvalRecord::new(10, 1, 0.5, Some(0.4), metrics)).unwrap();
        logger.log(&EvalRecord::new(20, 2, 0.3, Some(0.2), metrics)).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("10,1,0.500000,0.400000,0.500000"));
        assert!(lines[2].starts_with("20,2,"));
    }

    #[test]
    fn test_new_run_replaces_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        let metrics = ClassificationMetrics::compute(&[1, 0], &[1, 1]).unwrap();

        let first = MetricsLogger::new(dir.path()).unwrap();
        first.log(&EvalRecord::new(10, 1, 0.5, Some(0.4), metrics)).unwrap();
        first.log(&EvalRecord::new(20, 2, 0.3, Some(0.2), metrics)).unwrap();

        let second = MetricsLogger::new(dir.path()).unwrap();
        second.log(&EvalRecord::new(10, 1, 0.6, Some(0.5), metrics)).unwrap();

        let csv = fs::read_to_string(second.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("10,1,0.600000,0.500000,"));
    }

    #[test]
    fn test_missing_eval_loss_leaves_field_empty() {
        let dir = tempfile::tempdir().unwrap();
        let metrics = ClassificationMetrics::compute(&[], &[]).unwrap();

        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EvalRecord::new(4, 1, 0.25, None, metrics)).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(csv.lines().nth(1).unwrap(), "4,1,0.250000,,0.000000,0.000000,0.000000,0.000000");
    }
}
