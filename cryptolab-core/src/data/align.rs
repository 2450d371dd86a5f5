//! Multi-series date alignment.
//!
//! Given labelled price series, pick one field from each and lay them out on
//! a common date axis as a [`MergedTable`]. Column order follows input order.
//!
//! Gaps are forward-filled by default: a series with no value on a date takes
//! its last known prior value. Nothing is ever filled before a series' first
//! real observation.

use crate::domain::{PriceField, PriceSeries};
use crate::table::{Column, MergedTable, TableError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Which dates make up the merged axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignMode {
    /// Every date present in any input.
    #[default]
    Union,
    /// Only dates present in all inputs.
    Intersection,
}

/// What to put in a column on a date the series has no value for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    #[default]
    ForwardFill,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlignOptions {
    #[serde(default)]
    pub mode: AlignMode,
    #[serde(default)]
    pub fill: FillPolicy,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignmentError {
    #[error("nothing to align: no input series")]
    NoInputs,

    #[error("duplicate series label '{0}'")]
    DuplicateLabel(String),

    #[error("input series contain no dates")]
    NoDates,

    #[error("input series share no common date")]
    NoOverlap,

    #[error("column '{column}' has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),
}

impl From<TableError> for AlignmentError {
    fn from(e: TableError) -> Self {
        match e {
            TableError::LengthMismatch {
                column,
                expected,
                actual,
            } => AlignmentError::LengthMismatch {
                column,
                expected,
                actual,
            },
            TableError::DuplicateColumn(name) => AlignmentError::DuplicateLabel(name),
            TableError::UnknownColumn(name) => AlignmentError::UnknownColumn(name),
            // The merged axis is built sorted and deduplicated.
            TableError::UnorderedDates(_) => AlignmentError::NoDates,
        }
    }
}

/// Merge `field` of each labelled series into one table.
pub fn align_series(
    inputs: &[(&str, &PriceSeries)],
    field: PriceField,
    opts: &AlignOptions,
) -> Result<MergedTable, AlignmentError> {
    if inputs.is_empty() {
        return Err(AlignmentError::NoInputs);
    }
    for (i, (label, _)) in inputs.iter().enumerate() {
        if inputs[..i].iter().any(|(l, _)| l == label) {
            return Err(AlignmentError::DuplicateLabel(label.to_string()));
        }
    }

    let dates = date_axis(inputs, opts.mode)?;
    let columns = inputs
        .iter()
        .map(|(label, series)| Column::new(*label, fill_column(series, field, &dates, opts.fill)))
        .collect();

    tracing::debug!(
        series = inputs.len(),
        dates = dates.len(),
        %field,
        mode = ?opts.mode,
        "aligned series"
    );
    Ok(MergedTable::new(dates, columns)?)
}

fn date_axis(
    inputs: &[(&str, &PriceSeries)],
    mode: AlignMode,
) -> Result<Vec<NaiveDate>, AlignmentError> {
    let union: BTreeSet<NaiveDate> = inputs
        .iter()
        .flat_map(|(_, s)| s.points().iter().map(|p| p.date))
        .collect();
    if union.is_empty() {
        return Err(AlignmentError::NoDates);
    }

    match mode {
        AlignMode::Union => Ok(union.into_iter().collect()),
        AlignMode::Intersection => {
            let common: Vec<NaiveDate> = union
                .into_iter()
                .filter(|d| inputs.iter().all(|(_, s)| s.get(*d).is_some()))
                .collect();
            if common.is_empty() {
                return Err(AlignmentError::NoOverlap);
            }
            Ok(common)
        }
    }
}

/// One value per axis date. Both `axis` and the series are sorted, so this
/// is a single merge walk.
fn fill_column(
    series: &PriceSeries,
    field: PriceField,
    axis: &[NaiveDate],
    fill: FillPolicy,
) -> Vec<Option<f64>> {
    let points = series.points();
    let mut next = 0;
    let mut last: Option<f64> = None;

    axis.iter()
        .map(|date| {
            while next < points.len() && points[next].date < *date {
                next += 1;
            }
            let observed = points
                .get(next)
                .filter(|p| p.date == *date)
                .and_then(|p| p.value(field));
            match (observed, fill) {
                (Some(v), _) => {
                    last = Some(v);
                    Some(v)
                }
                (None, FillPolicy::ForwardFill) => last,
                (None, FillPolicy::Null) => None,
            }
        })
        .collect()
}
