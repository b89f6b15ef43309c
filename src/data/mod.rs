// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From a TSV file on disk to tensor batches on the device:
//
//   train.tsv / dev.tsv
//       │
//       ▼
//   TsvLoader         → (sentence, label) rows, incomplete rows dropped
//       │
//       ▼
//   split_train_val   → seeded train / validation partition
//       │
//       ▼
//   TextEncoder       → fixed-length token ids + attention mask
//       │
//       ▼
//   SentimentDataset  → implements Burn's Dataset trait
//       │
//       ▼
//   SentimentBatcher  → stacks samples into tensors on the device
//       │
//       ▼
//   DataLoader        → feeds batches to training / evaluation
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads tab-separated labelled sentences with the csv crate
pub mod loader;

/// Shuffles and splits data into train/validation sets
pub mod splitter;

/// Tokenises text to fixed-length id / mask sequences
pub mod encoder;

/// Implements Burn's Dataset trait for encoded samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
