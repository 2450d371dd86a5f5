//! Column transforms applied before correlating, plus the cleaning and
//! currency-conversion steps the pipeline runs on raw prices.

use super::AnalysisError;
use crate::table::{Column, MergedTable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Raw,
    /// Natural log; null for non-positive values.
    Log,
    /// Day-over-day percent change, `x_t / x_{t-1} - 1`.
    #[default]
    PctChange,
}

impl Transform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transform::Raw => "raw",
            Transform::Log => "log",
            Transform::PctChange => "pct_change",
        }
    }

    /// Transform one column's values.
    pub fn apply_values(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        match self {
            Transform::Raw => values.to_vec(),
            Transform::Log => values
                .iter()
                .map(|v| v.filter(|x| *x > 0.0).map(f64::ln))
                .collect(),
            Transform::PctChange => {
                let mut out = Vec::with_capacity(values.len());
                out.extend(values.first().map(|_| None));
                out.extend(values.windows(2).map(|w| match (w[0], w[1]) {
                    (Some(prev), Some(cur)) if prev != 0.0 => Some(cur / prev - 1.0),
                    _ => None,
                }));
                out
            }
        }
    }

    /// Transform every column of a table.
    pub fn apply(&self, table: &MergedTable) -> Result<MergedTable, AnalysisError> {
        let columns = table
            .columns()
            .iter()
            .map(|c| Column::new(c.name.clone(), self.apply_values(&c.values)))
            .collect();
        Ok(MergedTable::new(table.dates().to_vec(), columns)?)
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Transform::Raw),
            "log" => Ok(Transform::Log),
            "pct_change" => Ok(Transform::PctChange),
            other => Err(format!(
                "unknown transform '{other}'. Valid: raw, log, pct_change"
            )),
        }
    }
}

/// Replace exact zeros with null. Exchanges publish all-zero rows on outage
/// days.
pub fn clean_zeros(table: &MergedTable) -> MergedTable {
    table.map_values(|v| v.filter(|x| *x != 0.0))
}

/// Multiply each of `columns` by `base` on the same date. Used to turn
/// BTC-quoted prices into USD. Other columns pass through unchanged.
pub fn scale_by(
    table: &MergedTable,
    base: &str,
    columns: &[&str],
) -> Result<MergedTable, AnalysisError> {
    let base_values = &table
        .column(base)
        .ok_or_else(|| AnalysisError::UnknownColumn(base.to_string()))?
        .values;
    if let Some(missing) = columns.iter().find(|c| table.column(c).is_none()) {
        return Err(AnalysisError::UnknownColumn(missing.to_string()));
    }

    let scaled = table
        .columns()
        .iter()
        .map(|c| {
            if !columns.contains(&c.name.as_str()) {
                return c.clone();
            }
            let values = c
                .values
                .iter()
                .zip(base_values)
                .map(|(v, b)| Some((*v)? * (*b)?))
                .collect();
            Column::new(c.name.clone(), values)
        })
        .collect();
    Ok(MergedTable::new(table.dates().to_vec(), scaled)?)
}
