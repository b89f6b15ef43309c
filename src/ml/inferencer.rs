// ============================================================
// Layer 5 — Predictor
// ============================================================
// Classifies one sentence at a time with a loaded model.
//
//   text → TextEncoder → [1, L] ids + mask → model → [1, 2] logits
//
// The label is the index of the larger logit; a tie resolves to
// negative (index 0). No batching, no confidence threshold.

use anyhow::{anyhow, ensure, Result};
use burn::prelude::*;

use crate::data::encoder::TextEncoder;
use crate::domain::example::Label;
use crate::infra::model_store::ModelStore;
use crate::ml::model::SentimentClassifier;

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: Label,

    /// Raw [negative, positive] logits
    pub logits: [f32; 2],
}

pub struct Predictor<B: Backend> {
    model:   SentimentClassifier<B>,
    encoder: TextEncoder,
    device:  B::Device,
}

impl<B: Backend> Predictor<B> {
    /// `model` should already be in inference mode (`.valid()` of a trained model).
    pub fn new(model: SentimentClassifier<B>, encoder: TextEncoder, device: B::Device) -> Self {
        Self { model, encoder, device }
    }

    /// Load model and tokenizer from a saved model directory.
    pub fn from_store(store: &ModelStore, max_length: usize, device: B::Device) -> Result<Self> {
        let loaded = store.load::<B>(&device)?;
        loaded.config.check_max_length(max_length)?;
        let encoder = TextEncoder::new(loaded.tokenizer, max_length)?;
        Ok(Self::new(loaded.model, encoder, device))
    }

    pub fn predict(&self, text: &str) -> Result<Prediction> {
        let encoded = self.encoder.encode(text)?;
        let seq_len = encoded.input_ids.len();

        let ids: Vec<i64>  = encoded.input_ids.iter().map(|&x| x as i64).collect();
        let mask: Vec<i64> = encoded.attention_mask.iter().map(|&x| x as i64).collect();

        let input_ids = Tensor::<B, 2, Int>::from_data(TensorData::new(ids, [1, seq_len]), &self.device);
        let attention_mask =
            Tensor::<B, 2, Int>::from_data(TensorData::new(mask, [1, seq_len]), &self.device);

        let logits: Vec<f32> = self
            .model
            .forward(input_ids, attention_mask)
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| anyhow!("Cannot read logits: {e:?}"))?;
        ensure!(logits.len() == 2, "expected 2 logits, got {}", logits.len());

        Ok(Prediction {
            label:  Label::from_logits(logits[0], logits[1]),
            logits: [logits[0], logits[1]],
        })
    }
}
