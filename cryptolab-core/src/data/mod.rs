//! Price retrieval, caching and alignment

pub mod align;
pub mod cache;
pub mod poloniex;
pub mod provider;
pub mod quandl;
pub mod synthetic;

pub use align::{align_series, AlignMode, AlignOptions, AlignmentError, FillPolicy};
pub use cache::{CacheEntry, CacheError, CacheKey, CacheListing, CacheMeta, SeriesCache};
pub use poloniex::{PoloniexConfig, PoloniexProvider};
pub use provider::{DataSource, FetchRequest, ParseError, PriceProvider, RetrievalError};
pub use quandl::{QuandlConfig, QuandlProvider};
pub use synthetic::{SyntheticConfig, SyntheticProvider};
