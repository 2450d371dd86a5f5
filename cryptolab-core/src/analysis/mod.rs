//! Derived columns, transforms and correlation over merged price tables.
//!
//! Everything here is a pure function: tables in, new tables or matrices
//! out. Nothing mutates its input.

pub mod average;
pub mod correlation;
pub mod transform;

pub use average::{average_column, with_average};
pub use correlation::{correlation_matrix, pearson, CorrelationMatrix};
pub use transform::{clean_zeros, scale_by, Transform};

use crate::table::TableError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("no columns selected")]
    EmptySelection,

    /// Zero variance: every paired value of `column` is identical, so the
    /// correlation with `paired_with` is undefined.
    #[error("column '{column}' has zero variance against '{paired_with}'; correlation is undefined")]
    DegenerateInput { column: String, paired_with: String },

    #[error("'{a}' and '{b}' share {observations} observations; at least 2 are required")]
    InsufficientData {
        a: String,
        b: String,
        observations: usize,
    },

    #[error(transparent)]
    Table(#[from] TableError),
}
