//! Output of one analysis run.

use crate::config::AnalysisConfig;
use chrono::{DateTime, Utc};
use cryptolab_core::analysis::CorrelationMatrix;
use cryptolab_core::data::DataSource;
use cryptolab_core::domain::{DatasetHash, RunId};
use cryptolab_core::table::MergedTable;
use serde::Serialize;

/// Correlation matrix over one date window of the combined table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowCorrelation {
    /// `"2017"` for a calendar year, `"all"` for the whole table.
    pub label: String,
    pub year: Option<i32>,
    /// Rows of the combined table inside the window.
    pub rows: usize,
    pub matrix: CorrelationMatrix,
    /// Columns left out because they had too few values in the window.
    pub dropped: Vec<String>,
}

/// Where one input series came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesProvenance {
    /// Column label in the merged tables.
    pub label: String,
    /// Dataset code or trading pair sent to the provider.
    pub symbol: String,
    pub provider: String,
    pub source: DataSource,
    pub points: usize,
    pub cache_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub run_id: RunId,
    pub dataset_hash: DatasetHash,
    pub created_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub config: AnalysisConfig,
    /// Index field per exchange plus the average column.
    pub btc_by_exchange: MergedTable,
    /// Altcoins in USD plus the index column.
    pub combined_usd: MergedTable,
    pub correlations: Vec<WindowCorrelation>,
    pub sources: Vec<SeriesProvenance>,
}

impl AnalysisResult {
    /// True when any input was generated rather than fetched.
    pub fn has_synthetic(&self) -> bool {
        self.sources.iter().any(|s| s.source == DataSource::Synthetic)
    }

    pub fn correlation(&self, label: &str) -> Option<&WindowCorrelation> {
        self.correlations.iter().find(|c| c.label == label)
    }
}

/// BLAKE3 over column names, dates and value bits of every table, in order.
/// Missing values hash differently from every float.
pub fn compute_dataset_hash(tables: &[&MergedTable]) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();
    for table in tables {
        hasher.update(&(table.len() as u64).to_le_bytes());
        for date in table.dates() {
            hasher.update(date.to_string().as_bytes());
        }
        for column in table.columns() {
            hasher.update(column.name.as_bytes());
            hasher.update(&[0]);
            for value in &column.values {
                match value {
                    Some(v) => {
                        hasher.update(&[1]);
                        hasher.update(&v.to_bits().to_le_bytes());
                    }
                    None => {
                        hasher.update(&[0]);
                    }
                }
            }
        }
    }
    DatasetHash::from_hash(hasher.finalize().to_hex().as_str())
}
