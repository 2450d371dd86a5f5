//! CryptoLab Runner: configuration, series loading, the analysis pipeline
//! and its artifacts.
//!
//! This crate builds on `cryptolab-core` to provide:
//! - TOML configuration with validation and deterministic run IDs
//! - Series loading with cache/download/synthetic fallback
//! - The BTC index + altcoin correlation pipeline
//! - CSV/Parquet/JSON artifacts, Plotly charts and a Markdown report

pub mod config;
pub mod data_loader;
pub mod pipeline;
pub mod reporting;
pub mod result;

pub use config::{AnalysisConfig, ConfigError};
pub use data_loader::{
    load_many, load_series, FetchProgress, LoadError, LoadOptions, LoadedSeries, LogProgress,
    ProviderSet,
};
pub use pipeline::{run_analysis, run_from_config, PipelineError};
pub use reporting::{export_run_with_report, ArtifactManager, ArtifactPaths};
pub use result::{compute_dataset_hash, AnalysisResult, SeriesProvenance, WindowCorrelation};
