// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that runs tensors lives here:
//
//   backend.rs   — maps --device / fp16 to a concrete Burn
//                  backend and runs generic code on it
//
//   model.rs     — BERT-style encoder with a classification head
//                  • token / position / segment embeddings
//                  • post-norm self-attention blocks (GELU FFN)
//                  • tanh pooler over the [CLS] position
//                  • dropout + linear head → 2 logits
//
//   trainer.rs   — step-based fine-tuning loop: gradient
//                  accumulation, warmup + linear decay,
//                  periodic evaluation and checkpointing
//
//   evaluator.rs — one inference pass → loss + metrics
//
//   inferencer.rs — single-sentence predictor
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Devlin et al. (2019) BERT

/// Runtime device choice → generic backend code
pub mod backend;

/// Encoder + classification head
pub mod model;

/// Fine-tuning driver
pub mod trainer;

/// Evaluation pass over a data loader
pub mod evaluator;

/// Single-example predictor
pub mod inferencer;
