//! CryptoLab CLI: fetch, run, config and cache management commands.
//!
//! Commands:
//! - `fetch`: download price series from a provider into the cache
//! - `run`: execute the BTC index + altcoin correlation analysis
//! - `config`: print the default TOML configuration
//! - `cache status`: list cached series with their date ranges and sizes
//! - `cache clean`: remove one entry or the whole cache

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use cryptolab_core::data::{CacheKey, FetchRequest, SeriesCache};
use cryptolab_runner::{
    export_run_with_report, load_many, run_from_config, AnalysisConfig, AnalysisResult,
    LoadOptions, LogProgress, ProviderSet,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cryptolab",
    about = "CryptoLab CLI: crypto price fetching, caching and correlation analysis"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download price series and cache them.
    Fetch {
        /// Provider symbols (e.g. BCHARTS/KRAKENUSD for quandl, BTC_ETH for poloniex).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Provider: quandl, poloniex or synthetic.
        #[arg(long, default_value = "poloniex")]
        provider: String,

        /// Start date (YYYY-MM-DD). Defaults to the provider's earliest date.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Force re-download even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// TOML config supplying provider settings. Defaults are used otherwise.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Cache directory. Overrides the config.
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Run the analysis and export its artifacts.
    Run {
        /// Path to a TOML config file. Defaults are used otherwise.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Offline mode: no network access.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Use synthetic data as fallback.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Re-download every series even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Skip the Markdown report.
        #[arg(long, default_value_t = false)]
        no_report: bool,

        /// Cache directory. Overrides the config.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Output directory for artifacts. Overrides the config.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the default configuration as TOML.
    Config,
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached series with date ranges and sizes.
    Status {
        /// TOML config supplying `paths.cache_dir`.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Cache directory. Overrides the config.
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Remove one cache entry, or everything with --all.
    Clean {
        /// Cache key to remove (as shown by `cache status`).
        #[arg(long, conflicts_with = "all")]
        key: Option<String>,

        /// Remove every entry, including quarantined and temp files.
        #[arg(long, default_value_t = false)]
        all: bool,

        /// TOML config supplying `paths.cache_dir`.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Cache directory. Overrides the config.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Actually delete (without this flag, only previews what would be removed).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            symbols,
            provider,
            start,
            end,
            force,
            config,
            cache_dir,
        } => run_fetch(symbols, provider, start, end, force, config, cache_dir),
        Commands::Run {
            config,
            offline,
            synthetic,
            force,
            no_report,
            cache_dir,
            output_dir,
        } => {
            let opts = LoadOptions {
                offline,
                synthetic,
                force,
            };
            run_analysis_cmd(config, opts, !no_report, cache_dir, output_dir)
        }
        Commands::Config => {
            print!("{}", AnalysisConfig::default().to_toml()?);
            Ok(())
        }
        Commands::Cache { action } => match action {
            CacheAction::Status { config, cache_dir } => {
                run_cache_status(&resolve_cache_dir(config.as_deref(), cache_dir)?)
            }
            CacheAction::Clean {
                key,
                all,
                config,
                cache_dir,
                confirm,
            } => run_cache_clean(&resolve_cache_dir(config.as_deref(), cache_dir)?, key, all, confirm),
        },
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(p) => AnalysisConfig::from_file(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

/// `--cache-dir` if given, else the config's `paths.cache_dir`.
fn resolve_cache_dir(config_path: Option<&Path>, cache_dir: Option<PathBuf>) -> Result<PathBuf> {
    match cache_dir {
        Some(dir) => Ok(dir),
        None => Ok(load_config(config_path)?.paths.cache_dir),
    }
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("dates must be YYYY-MM-DD")
}

fn run_fetch(
    symbols: Vec<String>,
    provider: String,
    start: Option<String>,
    end: Option<String>,
    force: bool,
    config_path: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config_path.as_deref())?;
    if let Some(dir) = cache_dir {
        config.paths.cache_dir = dir;
    }
    let start = parse_date(start.as_deref())?;
    let end = parse_date(end.as_deref())?;

    let providers = ProviderSet::from_config(&config)?;
    if providers.get(&provider).is_none() {
        bail!(
            "unknown provider '{provider}'. Valid: {}",
            providers.names().join(", ")
        );
    }
    let cache = SeriesCache::new(&config.paths.cache_dir);
    let requests: Vec<FetchRequest> = symbols
        .iter()
        .map(|s| FetchRequest::new(s.as_str()).with_range(start, end))
        .collect();
    let opts = LoadOptions {
        force,
        ..LoadOptions::default()
    };

    let loaded = load_many(&provider, &requests, &providers, &cache, Some(&LogProgress), &opts)?;

    println!("{:<24} {:<10} {:>7}  {:<25}", "Symbol", "Source", "Points", "Date Range");
    println!("{}", "-".repeat(70));
    for l in &loaded {
        let range = match (l.series.first_date(), l.series.last_date()) {
            (Some(a), Some(b)) => format!("{a} to {b}"),
            _ => "(empty)".to_string(),
        };
        println!(
            "{:<24} {:<10} {:>7}  {:<25}",
            l.series.source().symbol,
            format!("{:?}", l.source),
            l.series.len(),
            range
        );
    }
    Ok(())
}

fn run_analysis_cmd(
    config_path: Option<PathBuf>,
    opts: LoadOptions,
    include_report: bool,
    cache_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config_path.as_deref())?;
    if let Some(dir) = cache_dir {
        config.paths.cache_dir = dir;
    }
    if let Some(dir) = output_dir {
        config.paths.output_dir = dir;
    }

    let result = run_from_config(&config, Some(&LogProgress), &opts)?;
    print_summary(&result);

    let paths = export_run_with_report(&config.paths.output_dir, &result, include_report)?;
    println!("Artifacts saved to: {}", paths.run_dir.display());
    Ok(())
}

fn print_summary(result: &AnalysisResult) {
    println!(
        "Run {}  (dataset {})",
        result.run_id.short(),
        result.dataset_hash.0.get(..12).unwrap_or_default()
    );
    if result.has_synthetic() {
        println!("WARNING: synthetic data in use; results are not market data");
    }
    for window in &result.correlations {
        let m = &window.matrix;
        println!();
        println!("Correlations {} ({} rows, {})", window.label, window.rows, m.transform());
        print!("{:>8}", "");
        for label in m.labels() {
            print!(" {label:>7}");
        }
        println!();
        for (label, row) in m.labels().iter().zip(m.values()) {
            print!("{label:>8}");
            for r in row {
                print!(" {r:>+7.3}");
            }
            println!();
        }
        if !window.dropped.is_empty() {
            println!("dropped (too few observations): {}", window.dropped.join(", "));
        }
    }
    println!();
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    let cache = SeriesCache::new(cache_dir);
    let entries = cache.entries()?;
    let quarantined = cache.quarantined()?;

    if entries.is_empty() && quarantined.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let total_size: u64 = entries.iter().map(|e| e.size_bytes).sum();
    println!("Cache: {}", cache_dir.display());
    println!("Entries: {}", entries.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!("{:<44} {:<25} {:>8} {:>10}", "Key", "Date Range", "Points", "Size");
    println!("{}", "-".repeat(90));
    for entry in &entries {
        let (range, points) = match &entry.meta {
            Some(meta) => {
                let range = match (meta.start_date, meta.end_date) {
                    (Some(a), Some(b)) => format!("{a} to {b}"),
                    _ => "(empty)".to_string(),
                };
                (range, meta.point_count.to_string())
            }
            None => ("(unreadable meta)".to_string(), "-".to_string()),
        };
        println!(
            "{:<44} {:<25} {:>8} {:>10}",
            entry.key.as_str(),
            range,
            points,
            format_size(entry.size_bytes)
        );
    }

    if !quarantined.is_empty() {
        println!();
        println!("Quarantined files: {}", quarantined.len());
        for path in &quarantined {
            println!("  {}", path.display());
        }
    }
    Ok(())
}

fn run_cache_clean(cache_dir: &Path, key: Option<String>, all: bool, confirm: bool) -> Result<()> {
    let cache = SeriesCache::new(cache_dir);

    match (key, all) {
        (Some(key), false) => {
            let key = CacheKey::literal(&key)?;
            if !cache.contains(&key) {
                println!("No cache entry '{key}' in {}", cache_dir.display());
                return Ok(());
            }
            if confirm {
                cache.remove(&key)?;
                println!("Removed {key}");
            } else {
                println!("Would remove {key} (pass --confirm to delete)");
            }
        }
        (None, true) => {
            if confirm {
                let removed = cache.clear()?;
                println!("Removed {removed} file(s) from {}", cache_dir.display());
            } else {
                let count = cache.entries()?.len() + cache.quarantined()?.len();
                println!(
                    "Would remove {count} file(s) from {} (pass --confirm to delete)",
                    cache_dir.display()
                );
            }
        }
        _ => bail!("pass either --key <KEY> or --all"),
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
