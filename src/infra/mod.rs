// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Files on disk:
//
//   model_store.rs     — model directory: config.json,
//                        tokenizer.json, model.mpk (or an
//                        imported model.safetensors)
//
//   tokenizer_store.rs — tokenizer.json load / save
//
//   checkpoint.rs      — checkpoint-{step} directories,
//                        rotation, trainer_state.json,
//                        train_config.json
//
//   metrics.rs         — metrics.csv, one row per evaluation
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling with anyhow)

/// Fine-tuned / pretrained model directories
pub mod model_store;

/// Tokenizer persistence
pub mod tokenizer_store;

/// Step checkpoints and run metadata
pub mod checkpoint;

/// Evaluation CSV logger
pub mod metrics;
