//! JSON series cache, one file per key.
//!
//! Layout: `{cache_dir}/{key}.json`, holding a [`CacheEntry`] (metadata plus
//! the series).
//!
//! - Atomic writes (write to `.json.tmp`, rename into place)
//! - Corrupt files are renamed to `{key}.json.quarantined` and treated as a miss
//! - No expiry: entries live until removed explicitly

use super::provider::FetchRequest;
use crate::domain::PriceSeries;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const EXT: &str = "json";
const TMP_EXT: &str = "json.tmp";
const QUARANTINE_EXT: &str = "json.quarantined";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid cache key '{0}'")]
    InvalidKey(String),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// File-name-safe identifier of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key taken verbatim from a name, with path separators replaced:
    /// `BCHARTS/KRAKENUSD` becomes `BCHARTS-KRAKENUSD`.
    pub fn literal(name: &str) -> Result<Self, CacheError> {
        let key: String = name
            .trim()
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '-' } else { c })
            .collect();
        if key.is_empty() || key.starts_with('.') {
            return Err(CacheError::InvalidKey(name.to_string()));
        }
        Ok(Self(key))
    }

    /// Key derived from a provider and request:
    /// `{provider}_{symbol}_{hash16}`, where `hash16` is the first 16 hex
    /// chars of the BLAKE3 hash of the request's JSON.
    pub fn for_request(provider: &str, request: &FetchRequest) -> Result<Self, CacheError> {
        let json = serde_json::to_vec(request)?;
        let hash = blake3::hash(&json).to_hex();
        Self::literal(&format!("{provider}_{}_{}", request.symbol, &hash[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata stored alongside every cached series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub key: CacheKey,
    pub provider: String,
    pub symbol: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub point_count: usize,
    /// BLAKE3 of the serialized series.
    pub data_hash: String,
    pub cached_at: DateTime<Utc>,
}

/// What one cache file holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub meta: CacheMeta,
    pub series: PriceSeries,
}

/// Meta-only view of a cache file; the series is skipped.
#[derive(Deserialize)]
struct MetaOnly {
    meta: CacheMeta,
}

/// One file found in the cache directory.
#[derive(Debug, Clone)]
pub struct CacheListing {
    pub key: CacheKey,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// `None` when the file's metadata could not be read.
    pub meta: Option<CacheMeta>,
}

/// Directory-backed series cache.
#[derive(Debug, Clone)]
pub struct SeriesCache {
    cache_dir: PathBuf,
}

impl SeriesCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// `{cache_dir}/{key}.json`
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(format!("{key}.{EXT}"))
    }

    fn with_ext(&self, key: &CacheKey, ext: &str) -> PathBuf {
        self.cache_dir.join(format!("{key}.{ext}"))
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entry_path(key).is_file()
    }

    /// Return the cached series for `key`, or run `fetch`, store its result
    /// and return it.
    pub fn get_or_fetch<E, F>(&self, key: &CacheKey, fetch: F) -> Result<PriceSeries, E>
    where
        F: FnOnce() -> Result<PriceSeries, E>,
        E: From<CacheError>,
    {
        if let Some(series) = self.load(key)? {
            return Ok(series);
        }
        let series = fetch()?;
        self.store(key, &series)?;
        Ok(series)
    }

    /// Load a cached series. Missing and corrupt entries are both `None`;
    /// corrupt files are quarantined first.
    pub fn load(&self, key: &CacheKey) -> Result<Option<PriceSeries>, CacheError> {
        let path = self.entry_path(key);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(%key, "cache miss");
                return Ok(None);
            }
            Err(e) => return Err(io_err(&path)(e)),
        };

        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => {
                tracing::info!(%key, points = entry.series.len(), "cache hit");
                Ok(Some(entry.series))
            }
            Err(e) => {
                self.quarantine(key, &e.to_string())?;
                Ok(None)
            }
        }
    }

    /// Persist `series` under `key`, replacing any existing entry.
    pub fn store(&self, key: &CacheKey, series: &PriceSeries) -> Result<CacheMeta, CacheError> {
        fs::create_dir_all(&self.cache_dir).map_err(io_err(&self.cache_dir))?;

        let meta = CacheMeta {
            key: key.clone(),
            provider: series.source().provider.clone(),
            symbol: series.source().symbol.clone(),
            start_date: series.first_date(),
            end_date: series.last_date(),
            point_count: series.len(),
            data_hash: blake3::hash(&serde_json::to_vec(series)?).to_hex().to_string(),
            cached_at: Utc::now(),
        };
        let entry = CacheEntry {
            meta,
            series: series.clone(),
        };
        let json = serde_json::to_vec_pretty(&entry)?;

        let path = self.entry_path(key);
        let tmp = self.with_ext(key, TMP_EXT);
        fs::write(&tmp, json).map_err(io_err(&tmp))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(&path)(e));
        }

        tracing::info!(%key, points = entry.meta.point_count, "cached series");
        Ok(entry.meta)
    }

    /// Read only the metadata of an entry.
    pub fn meta(&self, key: &CacheKey) -> Result<Option<CacheMeta>, CacheError> {
        let path = self.entry_path(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice::<MetaOnly>(&bytes).ok().map(|m| m.meta)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&path)(e)),
        }
    }

    /// Every `*.json` entry in the cache directory, sorted by key.
    pub fn entries(&self) -> Result<Vec<CacheListing>, CacheError> {
        let mut out = Vec::new();
        for path in self.files_with_ext(EXT)? {
            let Some(stem) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".json"))
            else {
                continue;
            };
            let key = CacheKey(stem.to_string());
            let size_bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            let meta = self.meta(&key)?;
            out.push(CacheListing {
                key,
                path,
                size_bytes,
                meta,
            });
        }
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    /// Quarantined files left behind by corrupt entries.
    pub fn quarantined(&self) -> Result<Vec<PathBuf>, CacheError> {
        let mut files = self.files_with_ext(QUARANTINE_EXT)?;
        files.sort();
        Ok(files)
    }

    /// Delete one entry. Returns whether a file was removed.
    pub fn remove(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(%key, "removed cache entry");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err(&path)(e)),
        }
    }

    /// Delete every entry, quarantined file and stray temp file.
    /// Returns the number of files removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for ext in [EXT, TMP_EXT, QUARANTINE_EXT] {
            for path in self.files_with_ext(ext)? {
                fs::remove_file(&path).map_err(io_err(&path))?;
                removed += 1;
            }
        }
        tracing::info!(removed, dir = %self.cache_dir.display(), "cleared cache");
        Ok(removed)
    }

    fn quarantine(&self, key: &CacheKey, reason: &str) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        let target = self.with_ext(key, QUARANTINE_EXT);
        tracing::warn!(
            path = %path.display(),
            reason,
            "quarantining corrupt cache file"
        );
        fs::rename(&path, &target).map_err(io_err(&path))
    }

    /// Regular files directly under the cache dir named `{stem}.{ext}`.
    fn files_with_ext(&self, ext: &str) -> Result<Vec<PathBuf>, CacheError> {
        let dir = match fs::read_dir(&self.cache_dir) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(&self.cache_dir)(e)),
        };
        let suffix = format!(".{ext}");
        let mut out = Vec::new();
        for entry in dir {
            let entry = entry.map_err(io_err(&self.cache_dir))?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(stem) = name.strip_suffix(&suffix) else {
                continue;
            };
            if stem.is_empty() || !path.is_file() {
                continue;
            }
            out.push(path);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PricePoint, SeriesSource};

    fn series(symbol: &str) -> PriceSeries {
        let points = (1..=3)
            .map(|d| PricePoint {
                date: NaiveDate::from_ymd_opt(2017, 1, d).unwrap(),
                open: 1000.0 + d as f64,
                high: 1010.0 + d as f64,
                low: 990.0,
                close: 1005.1 + d as f64 / 3.0,
                volume: 10.0,
                quote_volume: f64::NAN,
                weighted_price: 1002.7 + d as f64 / 7.0,
            })
            .collect();
        PriceSeries::new(SeriesSource::new("quandl", symbol), points).unwrap()
    }

    #[test]
    fn literal_key_replaces_separators() {
        let key = CacheKey::literal("BCHARTS/KRAKENUSD").unwrap();
        assert_eq!(key.as_str(), "BCHARTS-KRAKENUSD");
        assert!(CacheKey::literal("").is_err());
        assert!(CacheKey::literal("../etc").is_err());
    }

    #[test]
    fn request_key_depends_on_range() {
        let a = FetchRequest::new("BTC_ETH");
        let b = FetchRequest::new("BTC_ETH")
            .with_range(NaiveDate::from_ymd_opt(2015, 1, 1), None);
        let ka = CacheKey::for_request("poloniex", &a).unwrap();
        let kb = CacheKey::for_request("poloniex", &b).unwrap();
        assert!(ka.as_str().starts_with("poloniex_BTC_ETH_"));
        assert_eq!(ka.as_str().len(), "poloniex_BTC_ETH_".len() + 16);
        assert_ne!(ka, kb);
        assert_eq!(ka, CacheKey::for_request("poloniex", &a).unwrap());
    }

    #[test]
    fn store_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SeriesCache::new(dir.path());
        let key = CacheKey::literal("BCHARTS/KRAKENUSD").unwrap();

        assert!(!cache.contains(&key));
        let meta = cache.store(&key, &series("BCHARTS/KRAKENUSD")).unwrap();
        assert!(cache.contains(&key));
        assert_eq!(meta.point_count, 3);
        assert_eq!(meta.start_date, NaiveDate::from_ymd_opt(2017, 1, 1));

        let loaded = cache.load(&key).unwrap().unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(loaded.points()[0].quote_volume.is_nan());
        assert_eq!(loaded.points()[2].close, series("x").points()[2].close);
        assert!(!dir.path().join("BCHARTS-KRAKENUSD.json.tmp").exists());
    }

    #[test]
    fn get_or_fetch_only_fetches_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SeriesCache::new(dir.path());
        let key = CacheKey::literal("k").unwrap();
        let mut calls = 0;

        let first: Result<_, CacheError> = cache.get_or_fetch(&key, || {
            calls += 1;
            Ok(series("k"))
        });
        let first = first.unwrap();
        let second: PriceSeries = cache
            .get_or_fetch(&key, || -> Result<PriceSeries, CacheError> {
                panic!("should be served from cache")
            })
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn fetch_errors_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SeriesCache::new(dir.path());
        let key = CacheKey::literal("k").unwrap();
        let res: Result<PriceSeries, CacheError> =
            cache.get_or_fetch(&key, || Err(CacheError::InvalidKey("boom".into())));
        assert!(res.is_err());
        assert!(!cache.contains(&key));
    }

    #[test]
    fn corrupt_file_is_quarantined_and_missed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SeriesCache::new(dir.path());
        let key = CacheKey::literal("bad").unwrap();
        fs::write(cache.entry_path(&key), b"{not json").unwrap();

        assert!(cache.load(&key).unwrap().is_none());
        assert!(!cache.contains(&key));
        assert!(dir.path().join("bad.json.quarantined").exists());
        assert_eq!(cache.quarantined().unwrap().len(), 1);
    }

    #[test]
    fn entries_remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SeriesCache::new(dir.path());
        for name in ["b", "a"] {
            cache.store(&CacheKey::literal(name).unwrap(), &series(name)).unwrap();
        }
        fs::write(dir.path().join("junk.json.quarantined"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let listed = cache.entries().unwrap();
        let keys: Vec<&str> = listed.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert!(listed[0].size_bytes > 0);
        assert_eq!(listed[0].meta.as_ref().unwrap().symbol, "a");

        assert!(cache.remove(&CacheKey::literal("a").unwrap()).unwrap());
        assert!(!cache.remove(&CacheKey::literal("a").unwrap()).unwrap());

        assert_eq!(cache.clear().unwrap(), 2);
        assert!(cache.entries().unwrap().is_empty());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn missing_dir_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SeriesCache::new(dir.path().join("never-created"));
        assert!(cache.entries().unwrap().is_empty());
        assert_eq!(cache.clear().unwrap(), 0);
    }
}
