//! CryptoLab Core: price series, providers, cache, alignment and analysis.
//!
//! This crate holds everything below the pipeline:
//! - Domain types (price points, series, run and dataset identifiers)
//! - Price providers (Quandl, Poloniex, synthetic) behind one trait
//! - The on-disk series cache
//! - Date alignment into a strongly-typed merged table
//! - Averages, transforms and Pearson correlation matrices

pub mod analysis;
pub mod data;
pub mod domain;
pub mod table;
