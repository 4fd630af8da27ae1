use crate::correlation::{CorrelationMatrix, rolling_correlation, round2};
use crate::data::{AssetSeries, HistoricalCorrelation, TrendPoint};
use crate::error::Result;
use serde::Serialize;

/// Net change (first to last point) below which a trend counts as stable.
pub const TREND_TOLERANCE: f64 = 0.02;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Strengthening,
    Weakening,
    Stable,
}

impl TrendDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strengthening => "strengthening",
            Self::Weakening => "weakening",
            Self::Stable => "stable",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendSummary {
    pub id: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub change: f64,
    pub direction: TrendDirection,
}

/// Summary statistics for a trend; `None` when it has no points.
pub fn summarize(trend: &HistoricalCorrelation) -> Option<TrendSummary> {
    let values = trend.values();
    let first = *values.first()?;
    let last = *values.last()?;

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let change = round2(last - first);

    let direction = if change > TREND_TOLERANCE {
        TrendDirection::Strengthening
    } else if change < -TREND_TOLERANCE {
        TrendDirection::Weakening
    } else {
        TrendDirection::Stable
    };

    Some(TrendSummary {
        id: trend.id.clone(),
        mean,
        min,
        max,
        change,
        direction,
    })
}

/// Builds trends from raw series for the `pairs` most correlated asset pairs,
/// using a rolling correlation of `window` samples.
///
/// `series` must be in matrix order.
pub fn derive_trends(
    series: &[AssetSeries],
    matrix: &CorrelationMatrix,
    window: usize,
    pairs: usize,
) -> Result<Vec<HistoricalCorrelation>> {
    let mut ranked: Vec<(usize, usize, f64)> = matrix.pairs().collect();
    ranked.sort_by(|a, b| b.2.total_cmp(&a.2));

    ranked
        .into_iter()
        .take(pairs)
        .map(|(i, j, _)| {
            let (a, b) = (&series[i], &series[j]);
            let rolled = rolling_correlation(&a.samples, &b.samples, window)?;
            Ok(HistoricalCorrelation {
                id: format!("{}-{}", a.symbol, b.symbol),
                name: format!("{}-{}", a.name, b.name),
                color: a.color.clone(),
                points: rolled
                    .into_iter()
                    .enumerate()
                    .map(|(k, correlation)| TrendPoint {
                        period: format!("Window {}", k + 1),
                        correlation,
                    })
                    .collect(),
                commentary: None,
            })
        })
        .collect()
}
