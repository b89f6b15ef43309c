// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seam between the domain and the layers that do I/O:
// something that yields labelled examples.

use anyhow::Result;
use crate::domain::example::Example;

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Any component that can produce labelled examples.
///
/// Implementations:
///   - TsvLoader → reads a tab-separated file with a header row
pub trait ExampleSource {
    /// Load every complete example, in source order.
    fn load(&self) -> Result<Vec<Example>>;
}
