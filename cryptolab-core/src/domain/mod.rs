//! Domain types for cryptolab

pub mod ids;
pub mod price;
pub mod series;

pub use ids::{DatasetHash, RunId};
pub use price::{PriceField, PricePoint};
pub use series::{PriceSeries, SeriesError, SeriesSource};
