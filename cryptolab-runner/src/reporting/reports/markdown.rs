//! Markdown report generator.

use super::WindowStats;
use crate::result::AnalysisResult;

pub struct MarkdownReportGenerator;

impl MarkdownReportGenerator {
    pub fn generate(&self, result: &AnalysisResult) -> String {
        let config = &result.config;
        let mut report = format!(
            "# CryptoLab Run Report\n\n\
Run ID: `{}`\n\n\
## Summary\n\
- Dataset hash: `{}`\n\
- Exchanges: {}\n\
- Altcoins: {}\n\
- Dates: {} ({} to {})\n\
- Transform: {}\n\
- Duration: {:.2}s\n",
            result.run_id.short(),
            result.dataset_hash,
            config.index.symbols.join(", "),
            config.altcoins.symbols.join(", "),
            result.combined_usd.len(),
            result.combined_usd.dates().first().map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            result.combined_usd.dates().last().map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            config.analysis.transform,
            result.duration_secs,
        );

        if result.has_synthetic() {
            report.push_str(
                "\n> **SYNTHETIC DATA**: at least one series was generated, not fetched. \
Correlations below say nothing about real markets.\n",
            );
        }

        report.push_str("\n## Sources\n\n");
        report.push_str("| Label | Symbol | Provider | Source | Points |\n");
        report.push_str("|-------|--------|----------|--------|--------|\n");
        for s in &result.sources {
            report.push_str(&format!(
                "| {} | {} | {} | {:?} | {} |\n",
                s.label, s.symbol, s.provider, s.source, s.points
            ));
        }

        for window in &result.correlations {
            let stats = WindowStats::from_window(window);
            report.push_str(&format!("\n## Correlations {}\n\n", stats.label));
            report.push_str(&format!("- Rows: {}\n- Columns: {}\n", window.rows, stats.columns));
            if let Some(mean) = stats.mean_correlation {
                report.push_str(&format!("- Mean pairwise coefficient: {:+.3}\n", mean));
            }
            if let Some((a, b, r)) = &stats.strongest {
                report.push_str(&format!("- Strongest: {a} / {b} ({r:+.3})\n"));
            }
            if let Some((a, b, r)) = &stats.weakest {
                report.push_str(&format!("- Weakest: {a} / {b} ({r:+.3})\n"));
            }
            if !window.dropped.is_empty() {
                report.push_str(&format!(
                    "- Dropped (too few observations): {}\n",
                    window.dropped.join(", ")
                ));
            }

            let labels = window.matrix.labels();
            report.push_str(&format!("\n| | {} |\n", labels.join(" | ")));
            report.push_str(&format!("|---|{}\n", "---|".repeat(labels.len())));
            for (label, row) in labels.iter().zip(window.matrix.values()) {
                let cells: Vec<String> = row.iter().map(|r| format!("{r:+.2}")).collect();
                report.push_str(&format!("| {} | {} |\n", label, cells.join(" | ")));
            }
        }

        report.push_str(
            "\n## Notes\n\
- Coefficients are Pearson r over pairwise-complete observations.\n\
- Altcoin prices are converted from BTC with the cross-exchange BTC average.\n",
        );
        report
    }
}
