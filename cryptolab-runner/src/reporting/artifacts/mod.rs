//! Artifact manager for persisting run outputs.

mod correlation;
mod manifest;
mod table;

use crate::reporting::charts::{render_result_charts, ChartPaths};
use crate::result::AnalysisResult;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub use correlation::{write_matrix_csv, write_matrix_json};
pub use manifest::{RunManifest, WindowSummary};
pub use table::{write_table_csv, write_table_parquet};

/// Files written for one correlation window.
#[derive(Debug, Clone)]
pub struct MatrixPaths {
    pub label: String,
    pub csv: PathBuf,
    pub json: PathBuf,
}

/// Artifact paths returned after export.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub run_dir: PathBuf,
    pub manifest: PathBuf,
    pub config: PathBuf,
    pub btc_csv: PathBuf,
    pub combined_csv: PathBuf,
    pub combined_parquet: PathBuf,
    pub correlations: Vec<MatrixPaths>,
    pub charts: Vec<ChartPaths>,
    pub report_markdown: Option<PathBuf>,
}

/// Manages writing all artifacts for a run.
#[derive(Debug, Clone)]
pub struct ArtifactManager {
    output_dir: PathBuf,
}

impl ArtifactManager {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .context("Failed to create artifact output directory")?;
        Ok(Self { output_dir })
    }

    pub fn run_dir(&self, result: &AnalysisResult) -> PathBuf {
        self.output_dir.join(result.run_id.short())
    }

    /// Save complete run artifacts. Charts are skipped when disabled in the
    /// run's config.
    pub fn save_run(&self, result: &AnalysisResult) -> Result<ArtifactPaths> {
        let run_dir = self.run_dir(result);
        std::fs::create_dir_all(&run_dir)
            .context("Failed to create run artifact directory")?;

        let manifest_path = run_dir.join("manifest.json");
        manifest::write_manifest(&manifest_path, result)?;
        let config_path = run_dir.join("config.toml");
        manifest::write_config(&config_path, result)?;

        let btc_csv = run_dir.join("btc_by_exchange.csv");
        table::write_table_csv(&btc_csv, &result.btc_by_exchange)?;

        let combined_csv = run_dir.join("combined_usd.csv");
        let combined_parquet = run_dir.join("combined_usd.parquet");
        table::write_table_csv(&combined_csv, &result.combined_usd)?;
        table::write_table_parquet(&combined_parquet, &result.combined_usd)?;

        let mut correlations = Vec::with_capacity(result.correlations.len());
        for window in &result.correlations {
            let paths = MatrixPaths {
                label: window.label.clone(),
                csv: run_dir.join(format!("correlation_{}.csv", window.label)),
                json: run_dir.join(format!("correlation_{}.json", window.label)),
            };
            correlation::write_matrix_csv(&paths.csv, &window.matrix)?;
            correlation::write_matrix_json(&paths.json, &window.matrix)?;
            correlations.push(paths);
        }

        let charts = if result.config.charts.enabled {
            render_result_charts(result, &run_dir)?
        } else {
            Vec::new()
        };

        tracing::info!(run_dir = %run_dir.display(), "saved run artifacts");
        Ok(ArtifactPaths {
            run_dir,
            manifest: manifest_path,
            config: config_path,
            btc_csv,
            combined_csv,
            combined_parquet,
            correlations,
            charts,
            report_markdown: None,
        })
    }
}
