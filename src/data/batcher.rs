// ============================================================
// Layer 4 — Sentiment Batcher
// ============================================================
// Implements Burn's Batcher trait to stack EncodedSamples into
// tensors on the device the DataLoader asks for. This is the
// step that places every batch on the selected compute device.
//
//   Input:  Vec of N EncodedSamples, each with sequences of length L
//   Output: EncodedBatch with id/mask tensors [N, L] and labels [N]
//
// All sequences are already padded to the same length by the
// TextEncoder, so batching is a flatten + reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::EncodedSample;

/// A batch of encoded sentences ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct EncodedBatch<B: Backend> {
    /// Token ids — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding — shape: [batch_size, seq_len]
    pub attention_mask: Tensor<B, 2, Int>,

    /// Class index per sample — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

/// Stateless: the target device is supplied per call by the DataLoader.
#[derive(Clone, Debug, Default)]
pub struct SentimentBatcher;

impl<B: Backend> Batcher<B, EncodedSample, EncodedBatch<B>> for SentimentBatcher {
    fn batch(&self, items: Vec<EncodedSample>, device: &B::Device) -> EncodedBatch<B> {
        let batch_size = items.len();
        let seq_len    = items[0].seq_len();

        let ids_flat: Vec<i64> = items
            .iter()
            .flat_map(|s| s.input_ids.iter().map(|&x| x as i64))
            .collect();

        let mask_flat: Vec<i64> = items
            .iter()
            .flat_map(|s| s.attention_mask.iter().map(|&x| x as i64))
            .collect();

        let labels: Vec<i64> = items
            .iter()
            .map(|s| s.label.id() as i64)
            .collect();

        let input_ids = Tensor::<B, 2, Int>::from_data(
            TensorData::new(ids_flat, [batch_size, seq_len]), device,
        );
        let attention_mask = Tensor::<B, 2, Int>::from_data(
            TensorData::new(mask_flat, [batch_size, seq_len]), device,
        );
        let labels = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [batch_size]), device,
        );

        EncodedBatch { input_ids, attention_mask, labels }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::example::Label;
    use crate::test_support::TestBackend;

    #[test]
    fn test_batch_shapes_and_values() {
        let device = Default::default();
        let items  = vec![
            EncodedSample { input_ids: vec![2, 5, 3, 0], attention_mask: vec![1, 1, 1, 0], label: Label::Positive },
            EncodedSample { input_ids: vec![2, 6, 7, 3], attention_mask: vec![1, 1, 1, 1], label: Label::Negative },
        ];

        let batch: EncodedBatch<TestBackend> = SentimentBatcher.batch(items, &device);

        assert_eq!(batch.input_ids.dims(),      [2, 4]);
        assert_eq!(batch.attention_mask.dims(), [2, 4]);
        assert_eq!(batch.labels.dims(),         [2]);

        let labels = batch.labels.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(labels, vec![1, 0]);

        let mask = batch.attention_mask.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(mask, vec![1, 1, 1, 0, 1, 1, 1, 1]);
    }
}
