use crate::correlation::{CorrelationMatrix, round2};
use crate::data::AssetSeries;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

// ──────────────────────────────────────────────────────────────────────────────
// Configuration
// ──────────────────────────────────────────────────────────────────────────────

/// Largest value a single allocation can take, in percent.
pub const MAX_ALLOCATION: f64 = 100.0;

/// Risk score above which the most correlated pair is flagged.
pub const RECOMMENDATION_RISK_THRESHOLD: f64 = 0.6;

/// Allocation (percent) below which the best diversifier is flagged as underweight.
pub const MIN_DIVERSIFIER_ALLOCATION: f64 = 10.0;

// ──────────────────────────────────────────────────────────────────────────────
// Allocations
// ──────────────────────────────────────────────────────────────────────────────

/// Percentage weight per asset id. Missing ids read as zero; values are kept
/// within `[0, MAX_ALLOCATION]`. Weights need not sum to 100.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Allocations(BTreeMap<String, f64>);

impl Allocations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        let mut alloc = Self::new();
        for (id, value) in pairs {
            alloc.set(id, value);
        }
        alloc
    }

    pub fn get(&self, id: &str) -> f64 {
        self.0.get(id).copied().unwrap_or(0.0)
    }

    /// Sets a weight, clamped into `[0, MAX_ALLOCATION]`. Returns the stored value.
    pub fn set(&mut self, id: &str, value: f64) -> f64 {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, MAX_ALLOCATION) };
        self.0.insert(id.to_string(), value);
        value
    }

    /// Shifts a weight by `delta`, clamped. Returns the stored value.
    pub fn adjust(&mut self, id: &str, delta: f64) -> f64 {
        let current = self.get(id);
        self.set(id, current + delta)
    }

    /// Sum of weights over the given ids only.
    pub fn total_for<'a>(&self, ids: impl IntoIterator<Item = &'a String>) -> f64 {
        ids.into_iter().map(|id| self.get(id)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(id, v)| (id.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Risk Score
// ──────────────────────────────────────────────────────────────────────────────

/// How the weighted off-diagonal correlation sum is normalized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskNormalization {
    /// Divide by `(Σ a)²`. A fully correlated, equally weighted pair scores 0.5.
    #[default]
    TotalSquared,
    /// Divide by `(Σ a)² − Σ a²`, the total off-diagonal weight, giving a true
    /// weighted mean of off-diagonal correlations.
    OffDiagonalWeight,
}

/// Portfolio risk score using the matrix's own asset order and
/// [`RiskNormalization::TotalSquared`].
pub fn portfolio_risk(matrix: &CorrelationMatrix, allocations: &Allocations) -> Result<f64> {
    portfolio_risk_with(matrix, allocations, RiskNormalization::default())
}

pub fn portfolio_risk_with(
    matrix: &CorrelationMatrix,
    allocations: &Allocations,
    normalization: RiskNormalization,
) -> Result<f64> {
    weighted_risk(matrix, allocations, matrix.ids(), normalization)
}

/// Portfolio risk with an explicit asset order, which must equal the order
/// the matrix was built with, id for id.
pub fn portfolio_risk_for_order(
    matrix: &CorrelationMatrix,
    allocations: &Allocations,
    asset_order: &[String],
) -> Result<f64> {
    if asset_order.len() == matrix.len() {
        if let Some(position) = asset_order.iter().zip(matrix.ids()).position(|(a, b)| a != b) {
            return Err(EngineError::OrderMismatch {
                position,
                expected: matrix.ids()[position].clone(),
                found: asset_order[position].clone(),
            });
        }
    }
    weighted_risk(matrix, allocations, asset_order, RiskNormalization::default())
}

/// Allocation-weighted sum of off-diagonal correlations, normalized and
/// rounded to two decimals.
///
/// The allocation total is accumulated in the same pass as the weighted sum,
/// over exactly the ids in `order`.
fn weighted_risk(
    matrix: &CorrelationMatrix,
    allocations: &Allocations,
    order: &[String],
    normalization: RiskNormalization,
) -> Result<f64> {
    if order.len() != matrix.len() {
        return Err(EngineError::DimensionMismatch {
            matrix: matrix.len(),
            order: order.len(),
        });
    }

    let weights: Vec<f64> = order.iter().map(|id| allocations.get(id)).collect();
    let mut risk = 0.0;
    let mut total = 0.0;
    let mut sum_sq = 0.0;

    for (i, &a_i) in weights.iter().enumerate() {
        total += a_i;
        sum_sq += a_i * a_i;
        for (j, &a_j) in weights.iter().enumerate() {
            if i != j {
                risk += matrix.get(i, j) * a_i * a_j;
            }
        }
    }

    if total == 0.0 {
        return Err(EngineError::ZeroAllocation);
    }

    let normalizer = match normalization {
        RiskNormalization::TotalSquared => total * total,
        RiskNormalization::OffDiagonalWeight => total * total - sum_sq,
    };
    if normalizer <= 0.0 {
        // Everything sits in one asset: no diversification at all.
        return Ok(1.0);
    }

    let score = round2(risk / normalizer);
    debug!("Portfolio risk {:.2} (total allocation {:.1}, {:?})", score, total, normalization);
    Ok(score)
}

// ──────────────────────────────────────────────────────────────────────────────
// Allocation Bar
// ──────────────────────────────────────────────────────────────────────────────

/// One slice of the stacked allocation bar, in percent of the full width.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AllocationSegment {
    pub id: String,
    pub symbol: String,
    pub color: String,
    pub left: f64,
    pub width: f64,
}

pub fn allocation_segments(series: &[AssetSeries], allocations: &Allocations) -> Vec<AllocationSegment> {
    let mut left = 0.0;
    series
        .iter()
        .map(|asset| {
            let width = allocations.get(&asset.id);
            let segment = AllocationSegment {
                id: asset.id.clone(),
                symbol: asset.symbol.clone(),
                color: asset.color.clone(),
                left,
                width,
            };
            left += width;
            segment
        })
        .collect()
}

// ──────────────────────────────────────────────────────────────────────────────
// Recommendations
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Caution,
    Positive,
    Info,
}

impl Severity {
    pub fn marker(self) -> &'static str {
        match self {
            Self::Warning | Self::Caution => "!",
            Self::Positive => "✓",
            Self::Info => "i",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub severity: Severity,
    pub message: String,
}

impl Recommendation {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Diversification advice for the current allocation.
///
/// Always yields three items: a verdict on the score (naming the most
/// correlated held pair when it is high), a note on the asset with the lowest
/// average correlation, and a general note on stablecoins.
pub fn recommendations(
    series: &[AssetSeries],
    matrix: &CorrelationMatrix,
    allocations: &Allocations,
    score: f64,
) -> Vec<Recommendation> {
    let symbol_of = |i: usize| -> String {
        let id = &matrix.ids()[i];
        series
            .iter()
            .find(|s| &s.id == id)
            .map(|s| s.symbol.clone())
            .unwrap_or_else(|| id.clone())
    };
    let name_of = |i: usize| -> String {
        let id = &matrix.ids()[i];
        series
            .iter()
            .find(|s| &s.id == id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| id.clone())
    };

    let mut out = Vec::with_capacity(3);

    if score > RECOMMENDATION_RISK_THRESHOLD {
        let held = |i: usize| allocations.get(&matrix.ids()[i]) > 0.0;
        let hottest = matrix
            .pairs()
            .filter(|&(i, j, _)| held(i) && held(j))
            .fold(None, |best: Option<(usize, usize, f64)>, pair| match best {
                Some((_, _, v)) if v >= pair.2 => best,
                _ => Some(pair),
            });
        let message = match hottest {
            Some((i, j, _)) => format!(
                "Consider reducing your combined {}/{} allocation to improve diversification.",
                symbol_of(i),
                symbol_of(j)
            ),
            None => "Consider spreading your allocation across less correlated assets.".to_string(),
        };
        out.push(Recommendation::new(Severity::Warning, message));
    } else {
        out.push(Recommendation::new(
            Severity::Positive,
            "Your portfolio has good diversification across major assets.",
        ));
    }

    if let Some(i) = matrix.least_correlated_asset() {
        let weight = allocations.get(&matrix.ids()[i]);
        if weight < MIN_DIVERSIFIER_ALLOCATION {
            out.push(Recommendation::new(
                Severity::Caution,
                format!(
                    "Increasing your {} allocation could improve diversification as it has the lowest average correlation ({:.2}) with the rest.",
                    name_of(i),
                    matrix.mean_correlation_of(i)
                ),
            ));
        } else {
            out.push(Recommendation::new(
                Severity::Positive,
                format!("Your {} allocation helps balance portfolio correlation.", name_of(i)),
            ));
        }
    }

    out.push(Recommendation::new(
        Severity::Info,
        "Consider adding stablecoins (0% correlation) for additional diversification in volatile markets.",
    ));

    out
}

// ──────────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_allocations;
    use crate::correlation::build_correlation_matrix;
    use crate::data::MockDataProvider;

    fn matrix(values: Vec<Vec<f64>>) -> CorrelationMatrix {
        let ids = (0..values.len()).map(|i| ((b'a' + i as u8) as char).to_string()).collect();
        CorrelationMatrix::from_rows(ids, values).unwrap()
    }

    fn even() -> Allocations {
        Allocations::from_pairs([("a", 50.0), ("b", 50.0)])
    }

    #[test]
    fn test_uncorrelated_pair_has_zero_risk() {
        let m = matrix(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(portfolio_risk(&m, &even()).unwrap(), 0.0);
        assert_eq!(
            portfolio_risk_with(&m, &even(), RiskNormalization::OffDiagonalWeight).unwrap(),
            0.0
        );
    }

    #[test]
    fn test_fully_correlated_pair() {
        let m = matrix(vec![vec![1.0, 1.0], vec![1.0, 1.0]]);
        assert_eq!(portfolio_risk(&m, &even()).unwrap(), 0.5);
        assert_eq!(
            portfolio_risk_with(&m, &even(), RiskNormalization::OffDiagonalWeight).unwrap(),
            1.0
        );
    }

    #[test]
    fn test_zero_allocation_is_an_error() {
        let m = matrix(vec![vec![1.0, 0.5], vec![0.5, 1.0]]);
        let err = portfolio_risk(&m, &Allocations::new()).unwrap_err();
        assert_eq!(err, EngineError::ZeroAllocation);
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_single_holding_under_off_diagonal_weight() {
        let m = matrix(vec![vec![1.0, 0.2], vec![0.2, 1.0]]);
        let alloc = Allocations::from_pairs([("a", 100.0)]);
        assert_eq!(portfolio_risk(&m, &alloc).unwrap(), 0.0);
        assert_eq!(
            portfolio_risk_with(&m, &alloc, RiskNormalization::OffDiagonalWeight).unwrap(),
            1.0
        );
    }

    #[test]
    fn test_unknown_allocation_ids_are_ignored() {
        let m = matrix(vec![vec![1.0, 1.0], vec![1.0, 1.0]]);
        let mut alloc = even();
        alloc.set("zzz", 100.0);
        assert_eq!(portfolio_risk(&m, &alloc).unwrap(), 0.5);
    }

    #[test]
    fn test_explicit_order_must_match_matrix() {
        let m = matrix(vec![vec![1.0, 1.0], vec![1.0, 1.0]]);
        let order = vec!["a".to_string(), "b".to_string()];
        assert_eq!(portfolio_risk_for_order(&m, &even(), &order).unwrap(), 0.5);

        let err = portfolio_risk_for_order(&m, &even(), &order[..1]).unwrap_err();
        assert_eq!(err, EngineError::DimensionMismatch { matrix: 2, order: 1 });
    }

    #[test]
    fn test_permuted_order_is_rejected() {
        let m = matrix(vec![vec![1.0, 0.2, 0.9], vec![0.2, 1.0, 0.1], vec![0.9, 0.1, 1.0]]);
        let alloc = Allocations::from_pairs([("a", 60.0), ("b", 30.0), ("c", 10.0)]);
        let swapped = vec!["a".to_string(), "c".to_string(), "b".to_string()];

        let err = portfolio_risk_for_order(&m, &alloc, &swapped).unwrap_err();
        assert_eq!(
            err,
            EngineError::OrderMismatch {
                position: 1,
                expected: "b".to_string(),
                found: "c".to_string(),
            }
        );
        assert!(err.is_invalid_input());

        let ordered: Vec<String> = m.ids().to_vec();
        assert_eq!(
            portfolio_risk_for_order(&m, &alloc, &ordered).unwrap(),
            portfolio_risk(&m, &alloc).unwrap()
        );
    }

    #[test]
    fn test_mock_portfolio_score_is_moderate_or_higher() {
        let assets = MockDataProvider.assets();
        let m = build_correlation_matrix(&assets).unwrap();
        let score = portfolio_risk(&m, &default_allocations()).unwrap();
        assert!(score > 0.4 && score <= 1.0, "score = {}", score);

        let again = portfolio_risk(&m, &default_allocations()).unwrap();
        assert_eq!(score, again);
    }

    #[test]
    fn test_allocations_clamp_and_default_to_zero() {
        let mut alloc = Allocations::new();
        assert_eq!(alloc.get("bitcoin"), 0.0);
        assert_eq!(alloc.set("bitcoin", 140.0), 100.0);
        assert_eq!(alloc.adjust("bitcoin", -130.0), 0.0);
        assert_eq!(alloc.set("ethereum", f64::NAN), 0.0);
        assert_eq!(alloc.adjust("solana", 5.0), 5.0);

        let ids = vec!["bitcoin".to_string(), "solana".to_string()];
        assert_eq!(alloc.total_for(&ids), 5.0);
    }

    #[test]
    fn test_allocation_segments_are_cumulative() {
        let assets = MockDataProvider.assets();
        let segments = allocation_segments(&assets, &default_allocations());
        assert_eq!(segments.len(), 6);
        assert_eq!(segments[0].left, 0.0);
        assert_eq!(segments[0].width, 40.0);
        assert_eq!(segments[1].left, 40.0);
        assert_eq!(segments[2].left, 70.0);
        let last = segments.last().unwrap();
        assert_eq!(last.left + last.width, 100.0);
    }

    #[test]
    fn test_recommendations_flag_most_correlated_held_pair() {
        let assets = MockDataProvider.assets();
        let ids: Vec<String> = assets.iter().map(|a| a.id.clone()).collect();
        let mut rows = vec![vec![0.5; 6]; 6];
        for (i, row) in rows.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        // bitcoin/ethereum is the hottest pair; solana the best diversifier.
        rows[0][1] = 0.95;
        rows[1][0] = 0.95;
        for j in 0..6 {
            if j != 4 {
                rows[4][j] = 0.1;
                rows[j][4] = 0.1;
            }
        }
        let m = CorrelationMatrix::from_rows(ids, rows).unwrap();
        let alloc = default_allocations();

        let recs = recommendations(&assets, &m, &alloc, 0.65);
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].severity, Severity::Warning);
        assert!(recs[0].message.contains("BTC/ETH"));
        assert_eq!(recs[1].severity, Severity::Caution);
        assert!(recs[1].message.contains("Solana"));
        assert_eq!(recs[2].severity, Severity::Info);

        let mut alloc = alloc;
        alloc.set("solana", 25.0);
        let recs = recommendations(&assets, &m, &alloc, 0.3);
        assert_eq!(recs[0].severity, Severity::Positive);
        assert_eq!(recs[1].severity, Severity::Positive);
        assert_eq!(recs[0].severity.marker(), "✓");
    }
}
