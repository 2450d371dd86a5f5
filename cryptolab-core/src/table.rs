//! A date-indexed table of named, nullable `f64` columns.
//!
//! Every column has exactly one value slot per date, column names are
//! unique and dates are strictly increasing. [`MergedTable::new`] is the only
//! constructor and checks all three; every other operation returns a new
//! table built through it.

use chrono::{Datelike, NaiveDate};
use polars::prelude::{DataFrame, DataType, NamedFrom, PolarsResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("column '{column}' has {actual} values but the table has {expected} dates")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("dates must be strictly increasing (violated at {0})")]
    UnorderedDates(NaiveDate),
}

/// One named column; `None` marks a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Number of non-null values.
    pub fn observed(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedTable {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl MergedTable {
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<Column>) -> Result<Self, TableError> {
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(TableError::UnorderedDates(w[1]));
        }
        for (i, col) in columns.iter().enumerate() {
            if col.values.len() != dates.len() {
                return Err(TableError::LengthMismatch {
                    column: col.name.clone(),
                    expected: dates.len(),
                    actual: col.values.len(),
                });
            }
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(TableError::DuplicateColumn(col.name.clone()));
            }
        }
        Ok(Self { dates, columns })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of rows (dates).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Values of row `i` in column order.
    pub fn row(&self, i: usize) -> Option<(NaiveDate, Vec<Option<f64>>)> {
        let date = *self.dates.get(i)?;
        Some((date, self.columns.iter().map(|c| c.values[i]).collect()))
    }

    /// Append a column, returning a new table.
    pub fn with_column(&self, column: Column) -> Result<Self, TableError> {
        let mut columns = self.columns.clone();
        columns.push(column);
        Self::new(self.dates.clone(), columns)
    }

    /// Keep only the named columns, in the order given.
    pub fn select(&self, names: &[&str]) -> Result<Self, TableError> {
        let columns = names
            .iter()
            .map(|name| {
                self.column(name)
                    .cloned()
                    .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(self.dates.clone(), columns)
    }

    /// Rows whose date satisfies `keep`.
    pub fn filter_dates(&self, keep: impl Fn(NaiveDate) -> bool) -> Self {
        let idx: Vec<usize> = (0..self.dates.len()).filter(|&i| keep(self.dates[i])).collect();
        Self {
            dates: idx.iter().map(|&i| self.dates[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), idx.iter().map(|&i| c.values[i]).collect()))
                .collect(),
        }
    }

    /// Rows within `start..=end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        self.filter_dates(|d| d >= start && d <= end)
    }

    /// Rows falling in calendar year `year`.
    pub fn for_year(&self, year: i32) -> Self {
        self.filter_dates(|d| d.year() == year)
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.len());
        self.slice(0, n)
    }

    /// Last `n` rows.
    pub fn tail(&self, n: usize) -> Self {
        let n = n.min(self.len());
        self.slice(self.len() - n, self.len())
    }

    fn slice(&self, from: usize, to: usize) -> Self {
        Self {
            dates: self.dates[from..to].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.values[from..to].to_vec()))
                .collect(),
        }
    }

    /// Apply `f` to every value of every column.
    pub fn map_values(&self, f: impl Fn(Option<f64>) -> Option<f64>) -> Self {
        Self {
            dates: self.dates.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.values.iter().map(|v| f(*v)).collect()))
                .collect(),
        }
    }

    /// Convert to a Polars DataFrame with a `date` column followed by one
    /// nullable Float64 column per table column.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        // NaiveDate::default() is the Unix epoch.
        let epoch = NaiveDate::default();
        let days: Vec<i32> = self
            .dates
            .iter()
            .map(|d| (*d - epoch).num_days() as i32)
            .collect();

        let mut cols = Vec::with_capacity(self.columns.len() + 1);
        cols.push(polars::prelude::Column::new("date".into(), days).cast(&DataType::Date)?);
        for col in &self.columns {
            cols.push(polars::prelude::Column::new(
                col.name.as_str().into(),
                col.values.clone(),
            ));
        }
        DataFrame::new(cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 1, day).unwrap()
    }

    fn sample() -> MergedTable {
        MergedTable::new(
            vec![d(1), d(2), d(3), d(4)],
            vec![
                Column::new("KRAKEN", vec![Some(1.0), Some(2.0), None, Some(4.0)]),
                Column::new("BITSTAMP", vec![Some(1.5), None, Some(3.5), Some(4.5)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_length_mismatch() {
        let err = MergedTable::new(vec![d(1), d(2)], vec![Column::new("A", vec![Some(1.0)])])
            .unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn new_rejects_duplicate_columns() {
        let err = MergedTable::new(
            vec![d(1)],
            vec![Column::new("A", vec![None]), Column::new("A", vec![None])],
        )
        .unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("A".into()));
    }

    #[test]
    fn new_rejects_unordered_dates() {
        let err = MergedTable::new(vec![d(2), d(1)], vec![]).unwrap_err();
        assert_eq!(err, TableError::UnorderedDates(d(1)));
    }

    #[test]
    fn select_reorders_and_validates() {
        let t = sample();
        let s = t.select(&["BITSTAMP", "KRAKEN"]).unwrap();
        assert_eq!(s.column_names(), vec!["BITSTAMP", "KRAKEN"]);
        assert!(matches!(t.select(&["ITBIT"]), Err(TableError::UnknownColumn(_))));
    }

    #[test]
    fn with_column_returns_new_table() {
        let t = sample();
        let t2 = t
            .with_column(Column::new("AVG", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]))
            .unwrap();
        assert_eq!(t.width(), 2);
        assert_eq!(t2.width(), 3);
    }

    #[test]
    fn head_tail_and_between() {
        let t = sample();
        assert_eq!(t.head(2).dates(), &[d(1), d(2)]);
        assert_eq!(t.tail(1).dates(), &[d(4)]);
        assert_eq!(t.tail(10).len(), 4);
        let b = t.between(d(2), d(3));
        assert_eq!(b.len(), 2);
        assert_eq!(b.column("BITSTAMP").unwrap().values, vec![None, Some(3.5)]);
    }

    #[test]
    fn for_year_filters_calendar_year() {
        let t = MergedTable::new(
            vec![
                NaiveDate::from_ymd_opt(2016, 12, 31).unwrap(),
                NaiveDate::from_ymd_opt(2017, 1, 1).unwrap(),
            ],
            vec![Column::new("A", vec![Some(1.0), Some(2.0)])],
        )
        .unwrap();
        assert_eq!(t.for_year(2017).len(), 1);
        assert_eq!(t.for_year(2015).len(), 0);
    }

    #[test]
    fn row_reads_across_columns() {
        let (date, values) = sample().row(1).unwrap();
        assert_eq!(date, d(2));
        assert_eq!(values, vec![Some(2.0), None]);
    }

    #[test]
    fn dataframe_keeps_nulls() {
        let df = sample().to_dataframe().unwrap();
        assert_eq!(df.height(), 4);
        assert_eq!(df.width(), 3);
        let kraken = df.column("KRAKEN").unwrap().f64().unwrap();
        assert_eq!(kraken.get(2), None);
        assert_eq!(kraken.get(3), Some(4.0));
    }
}
