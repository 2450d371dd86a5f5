//! Chart rendering: Plotly figure descriptions written as HTML and JSON.

mod figure;
mod html;

use crate::result::AnalysisResult;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub use figure::{
    heatmap, line_chart, Axis, AxisScale, ColorBar, Figure, HeatmapTrace, Layout, Legend,
    LineChartOptions, ScatterTrace, Title, Trace, Visibility,
};
pub use html::{write_html, write_json};

/// Files written for one chart.
#[derive(Debug, Clone)]
pub struct ChartPaths {
    pub html: PathBuf,
    pub json: PathBuf,
}

/// Render the exchange chart, the combined USD chart and one heatmap per
/// correlation window into `dir`.
pub fn render_result_charts(result: &AnalysisResult, dir: &Path) -> Result<Vec<ChartPaths>> {
    let charts = &result.config.charts;
    let scale = if charts.log_scale {
        AxisScale::Log
    } else {
        AxisScale::Linear
    };

    let mut figures = vec![
        (
            "chart_btc_by_exchange".to_string(),
            line_chart(
                &result.btc_by_exchange,
                &LineChartOptions {
                    title: "Bitcoin Price (USD) By Exchange".into(),
                    y_axis_label: "Price (USD)".into(),
                    ..LineChartOptions::default()
                },
            ),
        ),
        (
            "chart_combined_usd".to_string(),
            line_chart(
                &result.combined_usd,
                &LineChartOptions {
                    title: "Cryptocurrency Prices (USD)".into(),
                    y_axis_label: "Coin Value (USD)".into(),
                    scale,
                    ..LineChartOptions::default()
                },
            ),
        ),
    ];
    for window in &result.correlations {
        figures.push((
            format!("heatmap_{}", window.label),
            heatmap(
                &window.matrix,
                &format!("Cryptocurrency Correlations in {}", window.label),
                true,
            ),
        ));
    }

    let mut written = Vec::with_capacity(figures.len());
    for (stem, figure) in figures {
        let paths = ChartPaths {
            html: dir.join(format!("{stem}.html")),
            json: dir.join(format!("{stem}.json")),
        };
        write_html(&figure, &paths.html, &charts.plotly_cdn)?;
        write_json(&figure, &paths.json)?;
        written.push(paths);
    }
    tracing::info!(charts = written.len(), dir = %dir.display(), "rendered charts");
    Ok(written)
}
