use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::example::Label;

/// One tokenised example, padded/truncated to the encoder's fixed length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedSample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub label:          Label,
}

impl EncodedSample {
    pub fn seq_len(&self) -> usize {
        self.input_ids.len()
    }
}

/// Random-access container over encoded samples.
pub struct SentimentDataset {
    samples: Vec<EncodedSample>,
}

impl SentimentDataset {
    pub fn new(samples: Vec<EncodedSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<EncodedSample> for SentimentDataset {
    fn get(&self, index: usize) -> Option<EncodedSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(label: Label) -> EncodedSample {
        EncodedSample {
            input_ids:      vec![2, 7, 3, 0],
            attention_mask: vec![1, 1, 1, 0],
            label,
        }
    }

    #[test]
    fn test_indexing_and_len() {
        let ds = SentimentDataset::new(vec![sample(Label::Positive), sample(Label::Negative)]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1).unwrap().label, Label::Negative);
        assert!(ds.get(2).is_none());
    }
}
