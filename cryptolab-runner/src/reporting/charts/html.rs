//! Figure output: standalone HTML page or raw figure JSON.

use super::figure::Figure;
use anyhow::{Context, Result};
use std::path::Path;

/// Write a self-contained page that loads plotly.js from `plotly_cdn` and
/// renders `figure` into a full-width div.
pub fn write_html(figure: &Figure, path: &Path, plotly_cdn: &str) -> Result<()> {
    let json = serde_json::to_string(figure).context("Failed to serialize figure")?;
    let title = html_escape(&figure.layout.title.text);
    // `</` inside the inline script would end it early.
    let json = json.replace("</", "<\\/");

    let page = format!(
        "<!DOCTYPE html>\n\
<html>\n\
<head>\n\
<meta charset=\"utf-8\">\n\
<title>{title}</title>\n\
<script src=\"{plotly_cdn}\"></script>\n\
</head>\n\
<body>\n\
<div id=\"chart\" style=\"width:100%;height:90vh;\"></div>\n\
<script>\n\
var figure = {json};\n\
Plotly.newPlot('chart', figure.data, figure.layout, {{responsive: true}});\n\
</script>\n\
</body>\n\
</html>\n"
    );
    std::fs::write(path, page)
        .with_context(|| format!("Failed to write chart to {}", path.display()))?;
    Ok(())
}

pub fn write_json(figure: &Figure, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(figure).context("Failed to serialize figure")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write chart JSON to {}", path.display()))?;
    Ok(())
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::charts::figure::Layout;

    #[test]
    fn html_embeds_figure_and_cdn() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.html");
        let fig = Figure {
            data: vec![],
            layout: Layout::titled("BTC </script> & friends"),
        };
        write_html(&fig, &path, "https://cdn.example/plotly.min.js").unwrap();

        let page = std::fs::read_to_string(&path).unwrap();
        assert!(page.contains("<script src=\"https://cdn.example/plotly.min.js\"></script>"));
        assert!(page.contains("<title>BTC &lt;/script&gt; &amp; friends</title>"));
        assert!(page.contains("BTC <\\/script> & friends"));
        assert_eq!(page.matches("</script>").count(), 2);
    }

    #[test]
    fn json_roundtrips_through_serde_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.json");
        let fig = Figure {
            data: vec![],
            layout: Layout::titled("t"),
        };
        write_json(&fig, &path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["layout"]["title"]["text"], "t");
        assert_eq!(value["data"], serde_json::json!([]));
    }
}
