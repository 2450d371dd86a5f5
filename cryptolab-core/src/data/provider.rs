//! Price provider trait and structured error types.
//!
//! The PriceProvider trait abstracts over data sources (Quandl, Poloniex,
//! synthetic) so the pipeline can swap implementations and mock them in tests.

use crate::data::cache::CacheError;
use crate::domain::{PriceSeries, SeriesError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single historical-data query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchRequest {
    pub symbol: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl FetchRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            start: None,
            end: None,
        }
    }

    pub fn with_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }
}

/// The provider answered, but not with something we can read.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("response is missing column '{0}'")]
    MissingColumn(String),

    #[error("unparseable date '{0}'")]
    BadDate(String),

    #[error("invalid timestamp {0}")]
    BadTimestamp(i64),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("response contains no rows")]
    Empty,
}

/// Why a series could not be retrieved.
///
/// These are designed to be displayable in CLI output as-is.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("HTTP {status} for {symbol}")]
    Http { status: u16, symbol: String },

    #[error("malformed response: {0}")]
    Parse(#[from] ParseError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Where a loaded series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Quandl,
    Poloniex,
    Cache,
    Synthetic,
}

/// Trait for price providers.
///
/// Implementations handle the specifics of one remote API.
/// The cache layer sits above this trait; providers don't know about it.
pub trait PriceProvider {
    /// Short, stable name used in cache keys and config files.
    fn name(&self) -> &str;

    /// Data source tag recorded for series this provider returns.
    fn source(&self) -> DataSource;

    /// Fetch daily price history for one symbol.
    fn fetch(&self, request: &FetchRequest) -> Result<PriceSeries, RetrievalError>;
}

/// Map a transport error the way every HTTP provider does.
pub(crate) fn transport_error(e: reqwest::Error) -> RetrievalError {
    RetrievalError::NetworkUnreachable(e.without_url().to_string())
}

/// Map a non-success HTTP status to a retrieval error.
pub(crate) fn status_error(
    status: reqwest::StatusCode,
    symbol: &str,
    retry_after: Option<u64>,
) -> RetrievalError {
    match status {
        reqwest::StatusCode::NOT_FOUND => RetrievalError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        reqwest::StatusCode::TOO_MANY_REQUESTS => RetrievalError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(60),
        },
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            RetrievalError::AuthenticationRequired(format!("HTTP {status} for {symbol}"))
        }
        _ => RetrievalError::Http {
            status: status.as_u16(),
            symbol: symbol.to_string(),
        },
    }
}

/// Read the `Retry-After` header as whole seconds.
pub(crate) fn retry_after(resp: &reqwest::blocking::Response) -> Option<u64> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}
