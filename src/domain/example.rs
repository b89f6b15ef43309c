// ============================================================
// Layer 3 — Example Domain Type
// ============================================================
// One row of the sentiment dataset: a sentence and its label.
//
// The label set is exactly {0, 1}, so it is an enum rather than
// a bare integer — an out-of-range label cannot be represented
// once a row has been parsed.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Binary sentiment label. Discriminants match the on-disk encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Negative = 0,
    Positive = 1,
}

impl Label {
    /// Parse the integer label used in the TSV files.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Label::Negative),
            1 => Ok(Label::Positive),
            other => bail!("label must be 0 or 1, got {other}"),
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Pick the class whose logit is larger.
    /// Ties resolve to the first index (negative), like argmax.
    pub fn from_logits(negative: f32, positive: f32) -> Self {
        if positive > negative {
            Label::Positive
        } else {
            Label::Negative
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Negative => "negative",
            Label::Positive => "positive",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A labelled sentence as read from disk, before tokenisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub text:  String,
    pub label: Label,
}

impl Example {
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self { text: text.into(), label }
    }
}

/// Split a list of examples into parallel text / label-id vectors.
pub fn into_columns(examples: Vec<Example>) -> (Vec<String>, Vec<u8>) {
    examples
        .into_iter()
        .map(|e| (e.text, e.label.id()))
        .unzip()
}
