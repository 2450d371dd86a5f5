//! Run manifest export (JSON).

use crate::result::{AnalysisResult, SeriesProvenance};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct WindowSummary {
    pub label: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub dropped: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest<'a> {
    pub run_id: &'a str,
    pub dataset_hash: &'a str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub duration_secs: f64,
    pub synthetic: bool,
    pub transform: &'a str,
    pub sources: &'a [SeriesProvenance],
    pub windows: Vec<WindowSummary>,
}

impl<'a> RunManifest<'a> {
    pub fn from_result(result: &'a AnalysisResult) -> Self {
        Self {
            run_id: &result.run_id.0,
            dataset_hash: &result.dataset_hash.0,
            timestamp: result.created_at,
            duration_secs: result.duration_secs,
            synthetic: result.has_synthetic(),
            transform: result.config.analysis.transform.as_str(),
            sources: &result.sources,
            windows: result
                .correlations
                .iter()
                .map(|w| WindowSummary {
                    label: w.label.clone(),
                    rows: w.rows,
                    columns: w.matrix.labels().to_vec(),
                    dropped: w.dropped.clone(),
                })
                .collect(),
        }
    }
}

pub fn write_manifest(path: &Path, result: &AnalysisResult) -> Result<()> {
    let manifest = RunManifest::from_result(result);
    let json = serde_json::to_string_pretty(&manifest)
        .context("Failed to serialize run manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write manifest to {}", path.display()))?;
    Ok(())
}

/// The exact config of a run, so it can be reproduced with `run --config`.
pub fn write_config(path: &Path, result: &AnalysisResult) -> Result<()> {
    let toml = result.config.to_toml().context("Failed to serialize run config")?;
    std::fs::write(path, toml)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    Ok(())
}
