//! Correlation matrix export (CSV/JSON).

use anyhow::{Context, Result};
use cryptolab_core::analysis::CorrelationMatrix;
use std::path::Path;

/// Square CSV with labels along the first row and column.
pub fn write_matrix_csv(path: &Path, matrix: &CorrelationMatrix) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create correlation CSV {}", path.display()))?;

    let mut header = vec![String::new()];
    header.extend(matrix.labels().iter().cloned());
    writer.write_record(&header)?;

    for (label, row) in matrix.labels().iter().zip(matrix.values()) {
        let mut record = vec![label.clone()];
        record.extend(row.iter().map(|r| format!("{r:.6}")));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_matrix_json(path: &Path, matrix: &CorrelationMatrix) -> Result<()> {
    let json = serde_json::to_string_pretty(matrix)
        .context("Failed to serialize correlation matrix")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write correlation JSON to {}", path.display()))?;
    Ok(())
}
