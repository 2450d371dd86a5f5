//! Merged table export (CSV/Parquet).

use anyhow::{Context, Result};
use cryptolab_core::table::MergedTable;
use polars::prelude::ParquetWriter;
use std::fs::File;
use std::path::Path;

/// `date` followed by one column per table column; missing values are
/// empty cells.
pub fn write_table_csv(path: &Path, table: &MergedTable) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create table CSV {}", path.display()))?;

    let mut header = vec!["date"];
    header.extend(table.column_names());
    writer.write_record(&header)?;

    for i in 0..table.len() {
        let Some((date, values)) = table.row(i) else {
            break;
        };
        let mut record = Vec::with_capacity(values.len() + 1);
        record.push(date.to_string());
        record.extend(values.iter().map(|v| v.map(|x| x.to_string()).unwrap_or_default()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_table_parquet(path: &Path, table: &MergedTable) -> Result<()> {
    let mut df = table
        .to_dataframe()
        .context("Failed to build table dataframe")?;

    let mut file = File::create(path)
        .with_context(|| format!("Failed to create table parquet {}", path.display()))?;
    ParquetWriter::new(&mut file)
        .finish(&mut df)
        .context("Failed to write table parquet")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cryptolab_core::table::Column;

    fn table() -> MergedTable {
        MergedTable::new(
            vec![
                NaiveDate::from_ymd_opt(2017, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2017, 1, 2).unwrap(),
            ],
            vec![
                Column::new("ETH", vec![Some(8.25), None]),
                Column::new("BTC", vec![Some(1000.0), Some(1001.5)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn csv_has_header_and_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        write_table_csv(&path, &table()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "date,ETH,BTC\n2017-01-01,8.25,1000\n2017-01-02,,1001.5\n");
    }

    #[test]
    fn parquet_reads_back() {
        use polars::prelude::{ParquetReader, SerReader};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.parquet");
        write_table_parquet(&path, &table()).unwrap();
        let df = ParquetReader::new(File::open(&path).unwrap()).finish().unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.column("ETH").unwrap().null_count(), 1);
    }
}
