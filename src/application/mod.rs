// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Each use case coordinates the data, ml and infra layers for
// one command. Configuration arrives as plain structs; clap
// types stop at Layer 1.
//
// Every pipeline picks its backend through ml::backend::dispatch
// and then runs as generic code over that backend.

/// Pipeline A: fine-tune a pretrained classifier
pub mod finetune_use_case;

/// Pipeline B: score a saved model on dev.tsv
pub mod evaluate_use_case;

/// Classify a single sentence
pub mod predict_use_case;
