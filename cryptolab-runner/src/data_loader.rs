//! Series loading and source resolution for the pipeline.
//!
//! Implements the fallback policy for every requested series:
//! 1. If cached (and not `force`) → use it
//! 2. If not offline → fetch from the named provider and cache the result
//!    (unless the provider itself is synthetic)
//! 3. If synthetic data is enabled → generate it (tagged, never cached)
//! 4. Otherwise → fail with a clear error
//!
//! Synthetic data is a developer-only mode. Results built on it are tagged.

use crate::config::AnalysisConfig;
use cryptolab_core::data::{
    CacheError, CacheKey, DataSource, FetchRequest, PoloniexProvider, PriceProvider,
    QuandlProvider, RetrievalError, SeriesCache, SyntheticProvider,
};
use cryptolab_core::domain::PriceSeries;
use std::cell::Cell;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(
        "no cached data for '{symbol}' and no network access (use --synthetic for synthetic data)"
    )]
    NotCachedOffline { symbol: String },

    #[error("failed to fetch '{symbol}' from {provider}: {source}")]
    FetchFailed {
        symbol: String,
        provider: String,
        #[source]
        source: RetrievalError,
    },

    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Options controlling where series may come from.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Never make network requests.
    pub offline: bool,
    /// Generate synthetic series when real data is unavailable.
    pub synthetic: bool,
    /// Re-fetch even if cached.
    pub force: bool,
}

/// Progress callbacks for multi-series loads.
pub trait FetchProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize);
    fn on_complete(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        outcome: Result<DataSource, &LoadError>,
    );
    fn on_batch_complete(&self, loaded: usize, total: usize);
}

/// Reports progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl FetchProgress for LogProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        tracing::info!(symbol, "[{}/{}] loading", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        outcome: Result<DataSource, &LoadError>,
    ) {
        match outcome {
            Ok(source) => tracing::info!(symbol, ?source, "[{}/{}] loaded", index + 1, total),
            Err(e) => tracing::error!(symbol, error = %e, "[{}/{}] failed", index + 1, total),
        }
    }

    fn on_batch_complete(&self, loaded: usize, total: usize) {
        tracing::info!(loaded, total, "series loaded");
    }
}

/// Named providers available to the pipeline, plus the synthetic fallback.
pub struct ProviderSet {
    providers: BTreeMap<String, Box<dyn PriceProvider>>,
    synthetic: SyntheticProvider,
}

impl ProviderSet {
    /// An empty set; only the synthetic fallback is available.
    pub fn new(synthetic: SyntheticProvider) -> Self {
        Self {
            providers: BTreeMap::new(),
            synthetic,
        }
    }

    /// Quandl, Poloniex and synthetic providers built from `config`. The
    /// Quandl key is read from the environment variable the config names.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, RetrievalError> {
        let p = &config.providers;
        let quandl = QuandlProvider::new(p.quandl.provider_config(p.quandl.api_key_from_env()))?;
        let poloniex = PoloniexProvider::new(p.poloniex.provider_config())?;
        let synthetic_config = p.synthetic.provider_config(&config.range);

        let mut set = Self::new(SyntheticProvider::new(synthetic_config.clone()));
        set.insert(Box::new(quandl));
        set.insert(Box::new(poloniex));
        set.insert(Box::new(SyntheticProvider::new(synthetic_config)));
        Ok(set)
    }

    /// Add or replace a provider under its own name.
    pub fn insert(&mut self, provider: Box<dyn PriceProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<&dyn PriceProvider> {
        self.providers.get(name).map(|p| p.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    pub fn synthetic(&self) -> &SyntheticProvider {
        &self.synthetic
    }
}

/// One resolved series and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: PriceSeries,
    pub source: DataSource,
    pub key: CacheKey,
}

/// Resolve one series following the fallback policy.
///
/// The online path goes through [`SeriesCache::get_or_fetch`]. `force`
/// replaces the entry instead, and synthetic providers skip the cache.
pub fn load_series(
    provider_name: &str,
    request: &FetchRequest,
    providers: &ProviderSet,
    cache: &SeriesCache,
    opts: &LoadOptions,
) -> Result<LoadedSeries, LoadError> {
    let key = CacheKey::for_request(provider_name, request)?;

    let mut fetch_error = None;
    if opts.offline {
        if !opts.force {
            if let Some(series) = cache.load(&key)? {
                return Ok(LoadedSeries {
                    series,
                    source: DataSource::Cache,
                    key,
                });
            }
        }
    } else {
        let provider = providers
            .get(provider_name)
            .ok_or_else(|| LoadError::UnknownProvider(provider_name.to_string()))?;
        let fetched = Cell::new(false);
        let fetch = || {
            fetched.set(true);
            provider.fetch(request).map_err(|source| LoadError::FetchFailed {
                symbol: request.symbol.clone(),
                provider: provider_name.to_string(),
                source,
            })
        };

        let outcome = match (provider.source(), opts.force) {
            (DataSource::Synthetic, _) => fetch(),
            (_, true) => fetch().and_then(|series| {
                cache.store(&key, &series)?;
                Ok(series)
            }),
            (_, false) => cache.get_or_fetch(&key, fetch),
        };

        match outcome {
            Ok(series) => {
                let source = if fetched.get() {
                    provider.source()
                } else {
                    DataSource::Cache
                };
                return Ok(LoadedSeries {
                    series,
                    source,
                    key,
                });
            }
            Err(e @ LoadError::FetchFailed { .. }) => {
                tracing::warn!(error = %e, "fetch failed");
                fetch_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    if opts.synthetic {
        let series = providers
            .synthetic()
            .fetch(request)
            .map_err(|source| LoadError::FetchFailed {
                symbol: request.symbol.clone(),
                provider: "synthetic".to_string(),
                source,
            })?;
        return Ok(LoadedSeries {
            series,
            source: DataSource::Synthetic,
            key,
        });
    }

    Err(fetch_error.unwrap_or_else(|| LoadError::NotCachedOffline {
        symbol: request.symbol.clone(),
    }))
}

/// Resolve several series from one provider, stopping at the first failure.
pub fn load_many(
    provider_name: &str,
    requests: &[FetchRequest],
    providers: &ProviderSet,
    cache: &SeriesCache,
    progress: Option<&dyn FetchProgress>,
    opts: &LoadOptions,
) -> Result<Vec<LoadedSeries>, LoadError> {
    let total = requests.len();
    let mut loaded = Vec::with_capacity(total);

    for (i, request) in requests.iter().enumerate() {
        if let Some(p) = progress {
            p.on_start(&request.symbol, i, total);
        }
        match load_series(provider_name, request, providers, cache, opts) {
            Ok(series) => {
                if let Some(p) = progress {
                    p.on_complete(&request.symbol, i, total, Ok(series.source));
                }
                loaded.push(series);
            }
            Err(e) => {
                if let Some(p) = progress {
                    p.on_complete(&request.symbol, i, total, Err(&e));
                }
                return Err(e);
            }
        }
    }

    if let Some(p) = progress {
        p.on_batch_complete(loaded.len(), total);
    }
    Ok(loaded)
}
