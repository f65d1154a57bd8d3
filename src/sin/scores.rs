//! Percent-correct score tables and their word/sentence split.

use crate::error::{AudioValError, Result};
use crate::stats::{friedman_test, wilcoxon_pairwise, FriedmanTest, WilcoxonPair};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One named column of per-subject scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// A table of score columns with one row per subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    columns: Vec<ScoreColumn>,
}

impl ScoreTable {
    /// Build a table from columns, which must all have the same length.
    pub fn new(columns: Vec<ScoreColumn>) -> Result<Self> {
        if columns.is_empty() {
            return Err(AudioValError::EmptyData(
                "Score table has no columns".to_string(),
            ));
        }
        let n = columns[0].values.len();
        if columns.iter().any(|c| c.values.len() != n) {
            return Err(AudioValError::InvalidParameter(
                "Score table columns must have equal length".to_string(),
            ));
        }
        Ok(Self { columns })
    }

    pub fn n_rows(&self) -> usize {
        self.columns[0].values.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column display names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Values of one column by display name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Friedman test over the table's columns as treatments.
    pub fn friedman(&self) -> Result<FriedmanTest> {
        let columns: Vec<Vec<f64>> = self.columns.iter().map(|c| c.values.clone()).collect();
        friedman_test(&columns)
    }

    /// Wilcoxon signed-rank test for every unordered pair of columns.
    pub fn wilcoxon_pairwise(&self) -> Result<Vec<WilcoxonPair>> {
        let names: Vec<&str> = self.column_names();
        let columns: Vec<Vec<f64>> = self.columns.iter().map(|c| c.values.clone()).collect();
        wilcoxon_pairwise(&names, &columns)
    }
}

/// Reformat an export header for display: drop the final underscore token
/// and join the rest with spaces (`Aided_Words_50` becomes `Aided Words`).
fn display_name(header: &str) -> String {
    let tokens: Vec<&str> = header.split('_').collect();
    tokens[..tokens.len().saturating_sub(1)].join(" ")
}

/// Split a combined score export into word and sentence tables.
///
/// Columns whose header contains `Words` (resp. `Sentences`) are selected
/// into the word (resp. sentence) table with reformatted display names; all
/// other columns are dropped. Every selected cell must parse as a number.
pub fn organize_scores<P: AsRef<Path>>(path: P) -> Result<(ScoreTable, ScoreTable)> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let rows: Vec<Vec<String>> = reader
        .records()
        .map(|r| r.map(|rec| rec.iter().map(|c| c.to_string()).collect()))
        .collect::<std::result::Result<_, csv::Error>>()?;
    organize_scores_from(&headers, &rows)
}

/// Split already-parsed header/row data into word and sentence tables.
pub fn organize_scores_from(
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<(ScoreTable, ScoreTable)> {
    if rows.is_empty() {
        return Err(AudioValError::EmptyData(
            "Score export contained no rows".to_string(),
        ));
    }
    let words = select_columns(headers, rows, "Words")?;
    let sentences = select_columns(headers, rows, "Sentences")?;
    info!(
        "organized {} word and {} sentence columns over {} subjects",
        words.n_columns(),
        sentences.n_columns(),
        words.n_rows()
    );
    Ok((words, sentences))
}

fn select_columns(headers: &[String], rows: &[Vec<String>], marker: &str) -> Result<ScoreTable> {
    let selected: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.contains(marker))
        .map(|(i, _)| i)
        .collect();
    if selected.is_empty() {
        return Err(AudioValError::MissingColumn(marker.to_string()));
    }

    let mut columns = Vec::with_capacity(selected.len());
    for &col in &selected {
        let mut values = Vec::with_capacity(rows.len());
        for (row_idx, row) in rows.iter().enumerate() {
            let cell = row.get(col).map(String::as_str).unwrap_or("");
            let value: f64 = cell.trim().parse().map_err(|_| AudioValError::InvalidScore {
                value: cell.to_string(),
                row: row_idx + 1,
                column: headers[col].clone(),
            })?;
            values.push(value);
        }
        columns.push(ScoreColumn {
            name: display_name(&headers[col]),
            values,
        });
    }
    ScoreTable::new(columns)
}
