// ============================================================
// Layer 4 — TSV Loader
// ============================================================
// Reads a tab-separated table with a header row and turns the
// `sentence` and `label` columns into Examples.
//
// Behaviour:
//   - Columns are located by header name, so extra columns and
//     any column order are fine.
//   - Quoting is disabled: GLUE-style sentiment files contain
//     bare quote characters inside sentences.
//   - Records may be short (flexible = true); a missing or blank
//     sentence/label cell marks the row incomplete and it is
//     dropped, never guessed.
//   - A present label that is not 0 or 1 is a hard error.
//
// Reference: csv crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use std::path::{Path, PathBuf};

use crate::domain::example::{into_columns, Example, Label};
use crate::domain::traits::ExampleSource;

/// Header names of the two required columns
pub const TEXT_COLUMN:  &str = "sentence";
pub const LABEL_COLUMN: &str = "label";

/// Row accounting for one loaded file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Data rows in the file (header excluded)
    pub rows:     usize,
    /// Rows dropped because a required field was missing
    pub dropped:  usize,
    pub positive: usize,
    pub negative: usize,
}

impl LoadStats {
    pub fn kept(&self) -> usize {
        self.rows - self.dropped
    }
}

/// Loads labelled sentences from one TSV file.
pub struct TsvLoader {
    path: PathBuf,
}

impl TsvLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every complete row, returning the examples plus row accounting.
    pub fn load_with_stats(&self) -> Result<(Vec<Example>, LoadStats)> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open data file '{}'", self.path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("Cannot read header row of '{}'", self.path.display()))?
            .clone();
        let text_col  = self.column_index(&headers, TEXT_COLUMN)?;
        let label_col = self.column_index(&headers, LABEL_COLUMN)?;

        let mut examples = Vec::new();
        let mut stats    = LoadStats::default();

        for (i, record) in reader.records().enumerate() {
            // +2: one for the header, one for 1-based line numbers
            let line   = i + 2;
            let record = record.with_context(|| {
                format!("Malformed record at line {} of '{}'", line, self.path.display())
            })?;
            stats.rows += 1;

            let text  = non_blank(record.get(text_col));
            let label = non_blank(record.get(label_col));
            let (Some(text), Some(label)) = (text, label) else {
                tracing::debug!("Dropping incomplete row at line {}", line);
                stats.dropped += 1;
                continue;
            };

            let label = label
                .trim()
                .parse::<u8>()
                .map_err(|e| anyhow!("{e}"))
                .and_then(Label::from_id)
                .with_context(|| {
                    format!(
                        "Invalid label '{}' at line {} of '{}'",
                        label, line, self.path.display()
                    )
                })?;

            match label {
                Label::Positive => stats.positive += 1,
                Label::Negative => stats.negative += 1,
            }
            examples.push(Example::new(text, label));
        }

        tracing::info!(
            "Loaded {} examples from '{}' ({} positive, {} negative, {} incomplete rows dropped)",
            examples.len(),
            self.path.display(),
            stats.positive,
            stats.negative,
            stats.dropped,
        );
        Ok((examples, stats))
    }

    fn column_index(&self, headers: &StringRecord, name: &str) -> Result<usize> {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
            .ok_or_else(|| {
                anyhow!(
                    "Required column '{}' not found in '{}' (header: {:?})",
                    name,
                    self.path.display(),
                    headers.iter().collect::<Vec<_>>()
                )
            })
    }
}

impl ExampleSource for TsvLoader {
    fn load(&self) -> Result<Vec<Example>> {
        Ok(self.load_with_stats()?.0)
    }
}

/// Load a file as parallel text / label-id sequences.
pub fn load_columns(path: impl AsRef<Path>) -> Result<(Vec<String>, Vec<u8>)> {
    let examples = TsvLoader::new(path.as_ref()).load()?;
    Ok(into_columns(examples))
}

fn non_blank(field: Option<&str>) -> Option<&str> {
    field.filter(|s| !s.trim().is_empty())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn tsv(lines: &[&str]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        f.flush().unwrap();
        f
    }

    #[test]
    fn test_loads_sentence_and_label_columns() {
        let f = tsv(&["sentence\tlabel", "great film\t1", "bad film\t0"]);
        let (texts, labels) = load_columns(f.path()).unwrap();
        assert_eq!(texts,  vec!["great film", "bad film"]);
        assert_eq!(labels, vec![1, 0]);
    }

    #[test]
    fn test_columns_found_by_name() {
        let f = tsv(&["idx\tlabel\tsentence", "0\t1\tloved it", "1\t0\thated it"]);
        let (texts, labels) = load_columns(f.path()).unwrap();
        assert_eq!(texts,  vec!["loved it", "hated it"]);
        assert_eq!(labels, vec![1, 0]);
    }

    #[test]
    fn test_incomplete_rows_are_dropped() {
        let f = tsv(&[
            "sentence\tlabel",
            "fine movie\t1",
            "\t0",             // blank sentence
            "no label here\t", // blank label
            "short row",       // missing label field entirely
            "dull\t0",
        ]);
        let (examples, stats) = TsvLoader::new(f.path()).load_with_stats().unwrap();
        assert_eq!(stats.rows, 5);
        assert_eq!(stats.dropped, 3);
        assert_eq!(examples.len(), stats.kept());
        assert_eq!(stats.positive, 1);
        assert_eq!(stats.negative, 1);
    }

    #[test]
    fn test_labels_are_binary() {
        let f = tsv(&["sentence\tlabel", "a\t1", "b\t0", "c\t1"]);
        let (_, labels) = load_columns(f.path()).unwrap();
        assert!(labels.iter().all(|l| *l == 0 || *l == 1));
    }

    #[test]
    fn test_out_of_range_label_is_error() {
        let f = tsv(&["sentence\tlabel", "odd\t2"]);
        assert!(TsvLoader::new(f.path()).load().is_err());
    }

    #[test]
    fn test_non_numeric_label_is_error() {
        let f = tsv(&["sentence\tlabel", "odd\tpositive"]);
        assert!(TsvLoader::new(f.path()).load().is_err());
    }

    #[test]
    fn test_missing_column_is_error() {
        let f = tsv(&["text\tlabel", "a\t1"]);
        let err = TsvLoader::new(f.path()).load().unwrap_err();
        assert!(err.to_string().contains("sentence"));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(TsvLoader::new("does/not/exist.tsv").load().is_err());
    }

    #[test]
    fn test_quotes_are_kept_literally() {
        let f = tsv(&["sentence\tlabel", "it 's \"fine\"\t1"]);
        let (texts, _) = load_columns(f.path()).unwrap();
        assert_eq!(texts[0], "it 's \"fine\"");
    }
}
