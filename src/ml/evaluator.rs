// ============================================================
// Layer 5 — Evaluation Pass
// ============================================================
// One pass over a data loader with the model in inference mode:
//
//   for each batch:
//     logits = model(input_ids, attention_mask)      [N, 2]
//     loss  += cross_entropy(logits, labels) * N
//     preds += argmax(logits)   (ties → negative)
//
// Then metrics are computed from the collected predictions.
//
// Used both by the training driver (periodic validation) and by
// the evaluate pipeline. Callers pass `model.valid()` and a loader
// on the inner backend so no autodiff graph is built.

use anyhow::{anyhow, Result};
use burn::{data::dataloader::DataLoader, prelude::*};
use std::sync::Arc;

use crate::data::batcher::EncodedBatch;
use crate::domain::{example::Label, metrics::ClassificationMetrics};
use crate::ml::model::SentimentClassifier;

pub type BatchLoader<B> = Arc<dyn DataLoader<B, EncodedBatch<B>>>;

#[derive(Debug, Clone)]
pub struct EvalReport {
    /// Sample-weighted mean cross-entropy; None for an empty loader
    pub loss: Option<f64>,

    pub metrics: ClassificationMetrics,

    /// Predicted label per sample, in loader order
    pub predictions: Vec<Label>,
}

pub fn evaluate<B: Backend>(
    model:  &SentimentClassifier<B>,
    loader: &BatchLoader<B>,
) -> Result<EvalReport> {
    let mut loss_sum    = 0.0f64;
    let mut predictions = Vec::new();
    let mut labels      = Vec::new();

    for batch in loader.iter() {
        let batch_labels = batch.labels.clone();
        let (loss, logits) = model.forward_loss(batch);

        let [n, num_labels] = logits.dims();
        loss_sum += loss.into_scalar().elem::<f64>() * n as f64;

        let logits: Vec<f32> = logits
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| anyhow!("Cannot read logits: {e:?}"))?;
        predictions.extend(
            logits
                .chunks(num_labels)
                .map(|row| Label::from_logits(row[0], row[1])),
        );

        let ids: Vec<i64> = batch_labels
            .into_data()
            .convert::<i64>()
            .to_vec()
            .map_err(|e| anyhow!("Cannot read labels: {e:?}"))?;
        labels.extend(ids.into_iter().map(|id| id as u8));
    }

    let pred_ids: Vec<u8> = predictions.iter().map(|l| l.id()).collect();
    let metrics = ClassificationMetrics::compute(&pred_ids, &labels)?;
    let loss = (!labels.is_empty()).then(|| loss_sum / labels.len() as f64);

    Ok(EvalReport { loss, metrics, predictions })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        batcher::SentimentBatcher,
        dataset::{EncodedSample, SentimentDataset},
    };
    use crate::test_support::{self, TestBackend};
    use burn::data::dataloader::DataLoaderBuilder;

    fn loader(samples: Vec<EncodedSample>, batch_size: usize) -> BatchLoader<TestBackend> {
        DataLoaderBuilder::new(SentimentBatcher)
            .batch_size(batch_size)
            .build(SentimentDataset::new(samples))
    }

    fn samples(n: usize) -> Vec<EncodedSample> {
        (0..n)
            .map(|i| EncodedSample {
                input_ids:      vec![2, 4 + (i % 5) as u32, 3, 0],
                attention_mask: vec![1, 1, 1, 0],
                label:          if i % 2 == 0 { Label::Positive } else { Label::Negative },
            })
            .collect()
    }

    #[test]
    fn test_one_prediction_per_sample_across_batches() {
        let device = Default::default();
        let model = test_support::tiny_model_config().init::<TestBackend>(&device);

        let report = evaluate(&model, &loader(samples(7), 3)).unwrap();

        assert_eq!(report.predictions.len(), 7);
        assert_eq!(report.metrics.counts.total(), 7);
        assert!(report.loss.is_some_and(f64::is_finite));
        assert!((0.0..=1.0).contains(&report.metrics.accuracy));
    }

    #[test]
    fn test_repeated_passes_agree() {
        let device = Default::default();
        let model = test_support::tiny_model_config().init::<TestBackend>(&device);
        let loader = loader(samples(6), 4);

        let first  = evaluate(&model, &loader).unwrap();
        let second = evaluate(&model, &loader).unwrap();

        assert_eq!(first.predictions, second.predictions);
        assert_eq!(first.metrics, second.metrics);
    }

    #[test]
    fn test_empty_loader_has_no_loss() {
        let device = Default::default();
        let model = test_support::tiny_model_config().init::<TestBackend>(&device);

        let report = evaluate(&model, &loader(Vec::new(), 4)).unwrap();

        assert_eq!(report.loss, None);
        assert!(report.predictions.is_empty());
        assert_eq!(report.metrics.accuracy, 0.0);
    }
}
