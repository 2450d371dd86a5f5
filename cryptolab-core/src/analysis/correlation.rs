//! Pairwise Pearson correlation.
//!
//! Each pair uses only the dates where both columns have a value
//! (pairwise-complete observations). A column whose paired values are all
//! identical has no defined correlation and is reported as an error rather
//! than coerced to 0.

use super::transform::Transform;
use super::AnalysisError;
use crate::table::MergedTable;
use serde::Serialize;

/// Square, symmetric matrix of coefficients in `[-1, 1]` with an exact
/// 1.0 diagonal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    labels: Vec<String>,
    values: Vec<Vec<f64>>,
    transform: Transform,
    /// Paired observations behind each coefficient.
    observations: Vec<Vec<usize>>,
}

impl CorrelationMatrix {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Row-major coefficients.
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn observations(&self) -> &[Vec<usize>] {
        &self.observations
    }

    pub fn size(&self) -> usize {
        self.labels.len()
    }

    fn index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Coefficient for a pair of labels.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.values[self.index(a)?][self.index(b)?])
    }

    /// Off-diagonal pairs `(a, b, r)` with `a` before `b`, strongest first.
    pub fn ranked_pairs(&self) -> Vec<(&str, &str, f64)> {
        let mut pairs = Vec::new();
        for i in 0..self.size() {
            for j in (i + 1)..self.size() {
                pairs.push((self.labels[i].as_str(), self.labels[j].as_str(), self.values[i][j]));
            }
        }
        pairs.sort_by(|x, y| y.2.abs().total_cmp(&x.2.abs()));
        pairs
    }
}

/// Correlate every pair of columns of `table` after applying `transform`.
pub fn correlation_matrix(
    table: &MergedTable,
    transform: Transform,
) -> Result<CorrelationMatrix, AnalysisError> {
    if table.width() == 0 {
        return Err(AnalysisError::EmptySelection);
    }
    let transformed = transform.apply(table)?;
    let cols = transformed.columns();
    let n = cols.len();

    let mut values = vec![vec![1.0; n]; n];
    let mut observations = vec![vec![0usize; n]; n];

    for i in 0..n {
        // A constant column is degenerate even against itself.
        let own = pearson(&cols[i].name, &cols[i].values, &cols[i].name, &cols[i].values)?;
        observations[i][i] = own.1;

        for j in (i + 1)..n {
            let (r, count) = pearson(&cols[i].name, &cols[i].values, &cols[j].name, &cols[j].values)?;
            values[i][j] = r;
            values[j][i] = r;
            observations[i][j] = count;
            observations[j][i] = count;
        }
    }

    tracing::debug!(columns = n, rows = table.len(), %transform, "computed correlation matrix");
    Ok(CorrelationMatrix {
        labels: cols.iter().map(|c| c.name.clone()).collect(),
        values,
        transform,
        observations,
    })
}

/// Pearson r over pairwise-complete observations, with the number of pairs
/// used. Non-finite values count as missing.
pub fn pearson(
    a_name: &str,
    a: &[Option<f64>],
    b_name: &str,
    b: &[Option<f64>],
) -> Result<(f64, usize), AnalysisError> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();

    let count = pairs.len();
    if count < 2 {
        return Err(AnalysisError::InsufficientData {
            a: a_name.to_string(),
            b: b_name.to_string(),
            observations: count,
        });
    }

    if is_constant(pairs.iter().map(|p| p.0)) {
        return Err(degenerate(a_name, b_name));
    }
    if is_constant(pairs.iter().map(|p| p.1)) {
        return Err(degenerate(b_name, a_name));
    }

    let nf = count as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / nf;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let r = sxy / (sxx.sqrt() * syy.sqrt());
    Ok((r.clamp(-1.0, 1.0), count))
}

fn is_constant(mut values: impl Iterator<Item = f64>) -> bool {
    match values.next() {
        Some(first) => values.all(|v| v == first),
        None => true,
    }
}

fn degenerate(column: &str, paired_with: &str) -> AnalysisError {
    AnalysisError::DegenerateInput {
        column: column.to_string(),
        paired_with: paired_with.to_string(),
    }
}
