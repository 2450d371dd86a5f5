//! End-to-end analysis: load, align, index, convert, correlate.
//!
//! The flow is strictly linear and stops at the first error:
//! 1. load every exchange series and merge them on the index field
//! 2. clean outage zeros and append the cross-exchange average
//! 3. load every altcoin pair, merge, and convert BTC quotes to USD
//! 4. correlate the combined table per configured year (or as a whole)

use crate::config::{AnalysisConfig, ConfigError};
use crate::data_loader::{load_many, FetchProgress, LoadError, LoadOptions, LoadedSeries, ProviderSet};
use crate::result::{compute_dataset_hash, AnalysisResult, SeriesProvenance, WindowCorrelation};
use chrono::{NaiveDate, Utc};
use cryptolab_core::analysis::{clean_zeros, correlation_matrix, scale_by, with_average, AnalysisError};
use cryptolab_core::data::{align_series, AlignmentError, FetchRequest, RetrievalError, SeriesCache};
use cryptolab_core::domain::PriceSeries;
use cryptolab_core::table::{Column, MergedTable, TableError};
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("provider setup failed: {0}")]
    Provider(#[from] RetrievalError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("alignment failed: {0}")]
    Alignment(#[from] AlignmentError),

    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("window '{label}' has no usable data")]
    EmptyWindow { label: String },
}

/// Build providers and the cache from `config`, then run the analysis.
pub fn run_from_config(
    config: &AnalysisConfig,
    progress: Option<&dyn FetchProgress>,
    opts: &LoadOptions,
) -> Result<AnalysisResult, PipelineError> {
    let providers = ProviderSet::from_config(config)?;
    let cache = SeriesCache::new(&config.paths.cache_dir);
    run_analysis(config, &providers, &cache, progress, opts)
}

pub fn run_analysis(
    config: &AnalysisConfig,
    providers: &ProviderSet,
    cache: &SeriesCache,
    progress: Option<&dyn FetchProgress>,
    opts: &LoadOptions,
) -> Result<AnalysisResult, PipelineError> {
    let started = Instant::now();
    config.validate()?;
    let run_id = config.run_id()?;
    tracing::info!(run_id = %run_id.short(), offline = opts.offline, synthetic = opts.synthetic, "starting analysis");

    let index = &config.index;
    let exchange_requests: Vec<FetchRequest> = index
        .symbols
        .iter()
        .map(|s| request(config, index.dataset_for(s)))
        .collect();
    let exchanges = load_many(&index.provider, &exchange_requests, providers, cache, progress, opts)?;
    let btc_by_exchange = index_table(config, &exchanges)?;

    let altcoins = &config.altcoins;
    let pair_requests: Vec<FetchRequest> = altcoins
        .symbols
        .iter()
        .map(|s| request(config, altcoins.pair_for(s)))
        .collect();
    let pairs = load_many(&altcoins.provider, &pair_requests, providers, cache, progress, opts)?;
    let combined_usd = usd_table(config, &pairs, &btc_by_exchange)?;

    let correlations = correlate_windows(config, &combined_usd)?;

    let mut sources = provenance(&index.symbols, &index.provider, &exchanges);
    sources.extend(provenance(&altcoins.symbols, &altcoins.provider, &pairs));

    let result = AnalysisResult {
        run_id,
        dataset_hash: compute_dataset_hash(&[&btc_by_exchange, &combined_usd]),
        created_at: Utc::now(),
        duration_secs: started.elapsed().as_secs_f64(),
        config: config.clone(),
        btc_by_exchange,
        combined_usd,
        correlations,
        sources,
    };
    if result.has_synthetic() {
        tracing::warn!("result includes synthetic series; do not draw conclusions from it");
    }
    tracing::info!(
        dataset_hash = %result.dataset_hash,
        windows = result.correlations.len(),
        secs = result.duration_secs,
        "analysis complete"
    );
    Ok(result)
}

fn request(config: &AnalysisConfig, symbol: String) -> FetchRequest {
    FetchRequest::new(symbol).with_range(config.range.start, config.range.end)
}

fn labelled<'a>(labels: &'a [String], loaded: &'a [LoadedSeries]) -> Vec<(&'a str, &'a PriceSeries)> {
    labels
        .iter()
        .map(String::as_str)
        .zip(loaded.iter().map(|l| &l.series))
        .collect()
}

/// Exchange prices, zero-cleaned, plus their average.
fn index_table(config: &AnalysisConfig, exchanges: &[LoadedSeries]) -> Result<MergedTable, PipelineError> {
    let index = &config.index;
    let mut table = align_series(&labelled(&index.symbols, exchanges), index.field, &config.align)?;
    if index.clean_zeros {
        table = clean_zeros(&table);
    }
    let subset: Vec<&str> = index.symbols.iter().map(String::as_str).collect();
    Ok(with_average(&table, &subset, &index.average_label)?)
}

/// Altcoin prices in USD with the BTC index appended under `index.label`.
fn usd_table(
    config: &AnalysisConfig,
    pairs: &[LoadedSeries],
    btc_by_exchange: &MergedTable,
) -> Result<MergedTable, PipelineError> {
    let (index, altcoins) = (&config.index, &config.altcoins);
    let quoted = align_series(&labelled(&altcoins.symbols, pairs), altcoins.field, &config.align)?;

    let average = btc_by_exchange
        .column(&index.average_label)
        .ok_or_else(|| AnalysisError::UnknownColumn(index.average_label.clone()))?;
    let btc = Column::new(
        index.label.clone(),
        values_on(btc_by_exchange.dates(), &average.values, quoted.dates()),
    );

    let coins: Vec<&str> = altcoins.symbols.iter().map(String::as_str).collect();
    Ok(scale_by(&quoted.with_column(btc)?, &index.label, &coins)?)
}

/// Pick `values` (indexed by `dates`) on each of `targets`; null where the
/// date is absent.
fn values_on(dates: &[NaiveDate], values: &[Option<f64>], targets: &[NaiveDate]) -> Vec<Option<f64>> {
    targets
        .iter()
        .map(|d| dates.binary_search(d).ok().and_then(|i| values[i]))
        .collect()
}

fn correlate_windows(
    config: &AnalysisConfig,
    combined: &MergedTable,
) -> Result<Vec<WindowCorrelation>, PipelineError> {
    let windows: Vec<(String, Option<i32>, MergedTable)> = if config.analysis.years.is_empty() {
        vec![("all".to_string(), None, combined.clone())]
    } else {
        config
            .analysis
            .years
            .iter()
            .map(|&y| (y.to_string(), Some(y), combined.for_year(y)))
            .collect()
    };

    windows
        .into_iter()
        .map(|(label, year, window)| correlate_window(config, label, year, &window))
        .collect()
}

fn correlate_window(
    config: &AnalysisConfig,
    label: String,
    year: Option<i32>,
    window: &MergedTable,
) -> Result<WindowCorrelation, PipelineError> {
    let settings = &config.analysis;
    if window.is_empty() {
        return Err(PipelineError::EmptyWindow { label });
    }

    // Sparse columns (a coin that was not listed yet) are judged after the
    // transform, since that is what gets correlated.
    let transformed = settings.transform.apply(window)?;
    let (kept, dropped): (Vec<&Column>, Vec<&Column>) = transformed
        .columns()
        .iter()
        .partition(|c| c.observed() >= settings.min_observations);
    let dropped: Vec<String> = dropped.into_iter().map(|c| c.name.clone()).collect();
    if !dropped.is_empty() {
        tracing::warn!(window = %label, columns = ?dropped, "dropping columns with too few observations");
    }
    if kept.is_empty() {
        return Err(PipelineError::EmptyWindow { label });
    }

    let names: Vec<&str> = kept.iter().map(|c| c.name.as_str()).collect();
    let matrix = correlation_matrix(&window.select(&names)?, settings.transform)?;
    tracing::info!(window = %label, columns = matrix.size(), rows = window.len(), "correlated window");

    Ok(WindowCorrelation {
        label,
        year,
        rows: window.len(),
        matrix,
        dropped,
    })
}

fn provenance(labels: &[String], provider: &str, loaded: &[LoadedSeries]) -> Vec<SeriesProvenance> {
    labels
        .iter()
        .zip(loaded)
        .map(|(label, l)| SeriesProvenance {
            label: label.clone(),
            symbol: l.series.source().symbol.clone(),
            provider: provider.to_string(),
            source: l.source,
            points: l.series.len(),
            cache_key: l.key.to_string(),
        })
        .collect()
}
