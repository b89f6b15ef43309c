// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Classifies a single sentence with a saved model directory.

use anyhow::Result;
use burn::tensor::backend::AutodiffBackend;
use std::path::PathBuf;

use crate::infra::model_store::ModelStore;
use crate::ml::{
    backend::{dispatch, BackendTask, DeviceChoice},
    inferencer::{Prediction, Predictor},
};

#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub model_dir:  PathBuf,
    pub max_length: usize,
    pub device:     DeviceChoice,
}

pub struct PredictUseCase {
    config: PredictConfig,
}

impl PredictUseCase {
    pub fn new(config: PredictConfig) -> Self {
        Self { config }
    }

    pub fn predict(&self, text: &str) -> Result<Prediction> {
        dispatch(self.config.device, false, PredictTask { cfg: &self.config, text })
    }
}

struct PredictTask<'a> {
    cfg:  &'a PredictConfig,
    text: &'a str,
}

impl BackendTask for PredictTask<'_> {
    type Output = Prediction;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<Prediction> {
        let store     = ModelStore::new(&self.cfg.model_dir);
        let predictor = Predictor::<B::InnerBackend>::from_store(&store, self.cfg.max_length, device)?;
        predictor.predict(self.text)
    }
}
