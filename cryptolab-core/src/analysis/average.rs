//! Cross-column average, e.g. one BTC price from several exchanges.

use super::AnalysisError;
use crate::table::{Column, MergedTable};

/// Unweighted mean of `subset` on each date, over whichever of those columns
/// have a value. Null when all of them are null.
pub fn average_column(
    table: &MergedTable,
    subset: &[&str],
    name: &str,
) -> Result<Column, AnalysisError> {
    if subset.is_empty() {
        return Err(AnalysisError::EmptySelection);
    }
    let cols = subset
        .iter()
        .map(|c| {
            table
                .column(c)
                .ok_or_else(|| AnalysisError::UnknownColumn(c.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let values = (0..table.len())
        .map(|i| {
            let (sum, n) = cols
                .iter()
                .filter_map(|c| c.values[i])
                .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
            (n > 0).then(|| sum / n as f64)
        })
        .collect();

    Ok(Column::new(name, values))
}

/// `table` with the average of `subset` appended as `name`.
pub fn with_average(
    table: &MergedTable,
    subset: &[&str],
    name: &str,
) -> Result<MergedTable, AnalysisError> {
    let avg = average_column(table, subset, name)?;
    Ok(table.with_column(avg)?)
}
