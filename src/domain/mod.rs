// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe the sentiment task itself:
// a labelled example, the binary label, and the quality
// metrics computed from predicted vs. true labels.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, traits and pure functions
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

// A (text, label) pair and the binary Label enum
pub mod example;

// Accuracy / precision / recall / F1 for binary classification
pub mod metrics;

// Core abstractions (traits) that other layers implement
pub mod traits;
