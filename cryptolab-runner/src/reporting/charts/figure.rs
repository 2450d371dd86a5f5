//! Serde model of the slice of the Plotly figure schema we emit, plus the
//! two chart builders.

use cryptolab_core::analysis::CorrelationMatrix;
use cryptolab_core::table::MergedTable;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Scatter(ScatterTrace),
    Heatmap(HeatmapTrace),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterTrace {
    pub name: String,
    pub mode: &'static str,
    pub x: Vec<String>,
    /// Missing values serialize as `null` and show up as gaps.
    pub y: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<String>,
    pub visible: Visibility,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapTrace {
    pub x: Vec<String>,
    pub y: Vec<String>,
    pub z: Vec<Vec<f64>>,
    pub colorbar: ColorBar,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zmin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zmax: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorBar {
    pub title: Title,
}

/// Plotly's `visible`: `true` or `"legendonly"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    LegendOnly,
}

impl Serialize for Visibility {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Visibility::Visible => s.serialize_bool(true),
            Visibility::LegendOnly => s.serialize_str("legendonly"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

impl Title {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisScale {
    #[default]
    Linear,
    Log,
    Date,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub scale: Option<AxisScale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlaying: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showticklabels: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub orientation: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: Title,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    /// `yaxis2`, `yaxis3`, ... for series drawn on their own axis.
    #[serde(flatten)]
    pub extra_axes: BTreeMap<String, Axis>,
}

impl Layout {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Title::new(title),
            legend: None,
            xaxis: None,
            yaxis: None,
            extra_axes: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LineChartOptions {
    pub title: String,
    pub y_axis_label: String,
    pub scale: AxisScale,
    /// Give every series after the first its own hidden y axis, so series
    /// of very different magnitude are all readable.
    pub separate_y_axis: bool,
    /// Start with every trace toggled off in the legend.
    pub initially_hidden: bool,
}

/// One line per table column, sharing the date axis.
pub fn line_chart(table: &MergedTable, opts: &LineChartOptions) -> Figure {
    let x: Vec<String> = table.dates().iter().map(|d| d.to_string()).collect();
    let visible = if opts.initially_hidden {
        Visibility::LegendOnly
    } else {
        Visibility::Visible
    };

    let mut layout = Layout::titled(&opts.title);
    layout.legend = Some(Legend { orientation: "h" });
    layout.xaxis = Some(Axis {
        scale: Some(AxisScale::Date),
        ..Axis::default()
    });
    layout.yaxis = Some(Axis {
        title: (!opts.y_axis_label.is_empty()).then(|| Title::new(&opts.y_axis_label)),
        scale: Some(opts.scale),
        showticklabels: Some(!opts.separate_y_axis),
        ..Axis::default()
    });

    let data = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let yaxis = (opts.separate_y_axis && i > 0).then(|| {
                let n = i + 1;
                layout.extra_axes.insert(
                    format!("yaxis{n}"),
                    Axis {
                        scale: Some(opts.scale),
                        overlaying: Some("y".to_string()),
                        showticklabels: Some(false),
                        ..Axis::default()
                    },
                );
                format!("y{n}")
            });
            Trace::Scatter(ScatterTrace {
                name: column.name.clone(),
                mode: "lines",
                x: x.clone(),
                y: column.values.clone(),
                yaxis,
                visible,
            })
        })
        .collect();

    Figure { data, layout }
}

/// Coefficient heatmap. With `absolute_bounds` the color scale spans the
/// full `[-1, 1]` range instead of the observed one.
pub fn heatmap(matrix: &CorrelationMatrix, title: &str, absolute_bounds: bool) -> Figure {
    let trace = HeatmapTrace {
        x: matrix.labels().to_vec(),
        y: matrix.labels().to_vec(),
        z: matrix.values().to_vec(),
        colorbar: ColorBar {
            title: Title::new("Pearson Coefficient"),
        },
        zmin: absolute_bounds.then_some(-1.0),
        zmax: absolute_bounds.then_some(1.0),
    };
    Figure {
        data: vec![Trace::Heatmap(trace)],
        layout: Layout::titled(title),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cryptolab_core::analysis::{correlation_matrix, Transform};
    use cryptolab_core::table::Column;
    use serde_json::{json, Value};

    fn table() -> MergedTable {
        let dates = (1..=4)
            .map(|d| NaiveDate::from_ymd_opt(2017, 1, d).unwrap())
            .collect();
        MergedTable::new(
            dates,
            vec![
                Column::new("BTC", vec![Some(1000.0), Some(1010.0), None, Some(990.0)]),
                Column::new("ETH", vec![Some(8.0), Some(8.5), Some(9.0), Some(8.8)]),
                Column::new("XRP", vec![Some(0.006), Some(0.0065), Some(0.0062), Some(0.007)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn line_chart_has_one_trace_per_column() {
        let opts = LineChartOptions {
            title: "Prices".into(),
            y_axis_label: "Coin Value (USD)".into(),
            scale: AxisScale::Log,
            ..LineChartOptions::default()
        };
        let fig = serde_json::to_value(line_chart(&table(), &opts)).unwrap();
        let data = fig["data"].as_array().unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data[0]["type"], "scatter");
        assert_eq!(data[0]["x"][0], "2017-01-01");
        assert_eq!(data[0]["y"][2], Value::Null);
        assert_eq!(data[0]["visible"], true);
        assert_eq!(fig["layout"]["yaxis"]["type"], "log");
        assert_eq!(fig["layout"]["yaxis"]["title"]["text"], "Coin Value (USD)");
        assert!(fig["layout"].get("yaxis2").is_none());
    }

    #[test]
    fn separate_axes_and_hidden_traces() {
        let opts = LineChartOptions {
            title: "Prices".into(),
            separate_y_axis: true,
            initially_hidden: true,
            ..LineChartOptions::default()
        };
        let fig = serde_json::to_value(line_chart(&table(), &opts)).unwrap();
        assert!(fig["data"][0].get("yaxis").is_none());
        assert_eq!(fig["data"][1]["yaxis"], "y2");
        assert_eq!(fig["data"][2]["yaxis"], "y3");
        assert_eq!(fig["data"][2]["visible"], "legendonly");
        assert_eq!(
            fig["layout"]["yaxis3"],
            json!({"type": "linear", "overlaying": "y", "showticklabels": false})
        );
        assert_eq!(fig["layout"]["yaxis"]["showticklabels"], false);
    }

    #[test]
    fn heatmap_bounds() {
        let m = correlation_matrix(&table(), Transform::Raw).unwrap();
        let bounded = serde_json::to_value(heatmap(&m, "2017", true)).unwrap();
        assert_eq!(bounded["data"][0]["type"], "heatmap");
        assert_eq!(bounded["data"][0]["zmin"], -1.0);
        assert_eq!(bounded["data"][0]["zmax"], 1.0);
        assert_eq!(bounded["data"][0]["z"][1][1], 1.0);
        assert_eq!(bounded["data"][0]["x"], json!(["BTC", "ETH", "XRP"]));

        let free = serde_json::to_value(heatmap(&m, "2017", false)).unwrap();
        assert!(free["data"][0].get("zmin").is_none());
    }
}
