//! Summary statistics for reports.

use crate::result::WindowCorrelation;

#[derive(Debug, Clone)]
pub struct WindowStats {
    pub label: String,
    pub columns: usize,
    /// Mean of the off-diagonal coefficients; `None` for a 1x1 matrix.
    pub mean_correlation: Option<f64>,
    pub strongest: Option<(String, String, f64)>,
    pub weakest: Option<(String, String, f64)>,
}

impl WindowStats {
    pub fn from_window(window: &WindowCorrelation) -> Self {
        let ranked = window.matrix.ranked_pairs();
        let mean_correlation = (!ranked.is_empty())
            .then(|| ranked.iter().map(|p| p.2).sum::<f64>() / ranked.len() as f64);
        let owned = |p: &(&str, &str, f64)| (p.0.to_string(), p.1.to_string(), p.2);

        Self {
            label: window.label.clone(),
            columns: window.matrix.size(),
            mean_correlation,
            strongest: ranked.first().map(owned),
            weakest: ranked.last().map(owned),
        }
    }
}
