use crate::data::AssetSeries;
use crate::error::{EngineError, Result};
use serde::Serialize;
use tracing::debug;

// ──────────────────────────────────────────────────────────────────────────────
// Pearson Correlation
// ──────────────────────────────────────────────────────────────────────────────

/// Minimum number of samples for a correlation to be defined.
pub const MIN_SAMPLES: usize = 2;

/// Pearson correlation coefficient of two equal-length series.
///
/// Uses the single-pass sum formulation
/// `r = (n·Σxy − Σx·Σy) / sqrt((n·Σx² − (Σx)²)·(n·Σy² − (Σy)²))`.
///
/// * A zero denominator (either series constant) yields `0.0`, except when
///   both inputs are identical, which is always `1.0`.
/// * The result is not clamped: rounding in the sums can push it a few ULP
///   past ±1.
/// * The result is not rounded; see [`round2`].
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(EngineError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    let n = x.len();
    if n < MIN_SAMPLES {
        return Err(EngineError::TooFewSamples { got: n, min: MIN_SAMPLES });
    }

    // Self-correlation of a constant series would otherwise hit 0/0.
    if x == y {
        return Ok(1.0);
    }

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;
    let mut sum_y2 = 0.0;
    for (&a, &b) in x.iter().zip(y.iter()) {
        sum_x += a;
        sum_y += b;
        sum_xy += a * b;
        sum_x2 += a * a;
        sum_y2 += b * b;
    }

    let n = n as f64;
    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y)).sqrt();

    if denominator == 0.0 {
        Ok(0.0)
    } else {
        Ok(numerator / denominator)
    }
}

/// Rounds to two decimal places, halves away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounded Pearson correlation over every contiguous window of `window`
/// samples. Returns an empty vector when the window is longer than the series.
pub fn rolling_correlation(x: &[f64], y: &[f64], window: usize) -> Result<Vec<f64>> {
    if x.len() != y.len() {
        return Err(EngineError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    if window < MIN_SAMPLES {
        return Err(EngineError::TooFewSamples {
            got: window,
            min: MIN_SAMPLES,
        });
    }

    x.windows(window)
        .zip(y.windows(window))
        .map(|(wx, wy)| pearson_correlation(wx, wy).map(round2))
        .collect()
}

// ──────────────────────────────────────────────────────────────────────────────
// Correlation Matrix
// ──────────────────────────────────────────────────────────────────────────────

/// Square, symmetric matrix of pairwise correlations, indexed by the asset
/// order it was built from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    ids: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Wraps precomputed values. Fails if `values` is not `ids.len()` square.
    pub fn from_rows(ids: Vec<String>, values: Vec<Vec<f64>>) -> Result<Self> {
        let n = ids.len();
        if values.len() != n {
            return Err(EngineError::DimensionMismatch {
                matrix: values.len(),
                order: n,
            });
        }
        if let Some(row) = values.iter().find(|row| row.len() != n) {
            return Err(EngineError::DimensionMismatch {
                matrix: row.len(),
                order: n,
            });
        }
        Ok(Self { ids, values })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Asset ids in matrix order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|candidate| candidate == id)
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Upper-triangle pairs `(i, j, value)` with `i < j`.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let n = self.len();
        (0..n).flat_map(move |i| ((i + 1)..n).map(move |j| (i, j, self.values[i][j])))
    }

    /// Mean of all off-diagonal entries; `0.0` below two assets.
    pub fn average_off_diagonal(&self) -> f64 {
        let (sum, count) = self
            .pairs()
            .fold((0.0, 0usize), |(sum, count), (_, _, v)| (sum + v, count + 1));
        if count == 0 { 0.0 } else { sum / count as f64 }
    }

    /// Mean correlation of asset `i` with every other asset.
    pub fn mean_correlation_of(&self, i: usize) -> f64 {
        let n = self.len();
        if n < 2 {
            return 0.0;
        }
        let sum: f64 = (0..n).filter(|&j| j != i).map(|j| self.values[i][j]).sum();
        sum / (n - 1) as f64
    }

    /// The pair with the highest correlation, first in matrix order on ties.
    pub fn most_correlated_pair(&self) -> Option<(usize, usize, f64)> {
        self.pairs().fold(None, |best, pair| match best {
            Some((_, _, v)) if v >= pair.2 => best,
            _ => Some(pair),
        })
    }

    /// The asset with the lowest mean correlation to the rest of the set.
    pub fn least_correlated_asset(&self) -> Option<usize> {
        if self.len() < 2 {
            return None;
        }
        (0..self.len()).fold(None, |best: Option<usize>, i| match best {
            Some(b) if self.mean_correlation_of(b) <= self.mean_correlation_of(i) => best,
            _ => Some(i),
        })
    }
}

/// Builds the full pairwise correlation matrix, rounded to two decimals.
///
/// The diagonal is set to `1.0` directly and the upper triangle is mirrored,
/// so the result is symmetric with a unit diagonal by construction.
pub fn build_correlation_matrix(series: &[AssetSeries]) -> Result<CorrelationMatrix> {
    let n = series.len();
    let mut values = vec![vec![0.0; n]; n];

    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = round2(pearson_correlation(&series[i].samples, &series[j].samples)?);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    debug!("Built {}x{} correlation matrix", n, n);

    Ok(CorrelationMatrix {
        ids: series.iter().map(|s| s.id.clone()).collect(),
        values,
    })
}

// ──────────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MockDataProvider;
    use rand::Rng;

    fn series(id: &str, samples: &[f64]) -> AssetSeries {
        AssetSeries {
            id: id.to_string(),
            name: id.to_uppercase(),
            symbol: id.to_uppercase(),
            samples: samples.to_vec(),
            color: "#ccc".to_string(),
        }
    }

    fn random_series(len: usize) -> Vec<f64> {
        let mut rng = rand::thread_rng();
        (0..len).map(|_| rng.gen_range(-100.0..100.0)).collect()
    }

    #[test]
    fn test_perfect_positive_correlation() {
        let r = pearson_correlation(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 6.0, 8.0, 10.0]).unwrap();
        assert_eq!(r, 1.0);
    }

    #[test]
    fn test_perfect_negative_correlation() {
        let r = pearson_correlation(&[1.0, 2.0, 3.0, 4.0, 5.0], &[5.0, 4.0, 3.0, 2.0, 1.0]).unwrap();
        assert_eq!(r, -1.0);
    }

    #[test]
    fn test_constant_series_yields_zero() {
        let r = pearson_correlation(&[1.0, 1.0, 1.0, 1.0], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(r, 0.0);
        let r = pearson_correlation(&[1.0, 2.0, 3.0, 4.0], &[7.0, 7.0, 7.0, 7.0]).unwrap();
        assert_eq!(r, 0.0);
    }

    #[test]
    fn test_self_correlation_is_one_even_for_constant_series() {
        let constant = [3.0, 3.0, 3.0];
        assert_eq!(pearson_correlation(&constant, &constant).unwrap(), 1.0);

        for _ in 0..50 {
            let x = random_series(8);
            assert_eq!(pearson_correlation(&x, &x).unwrap(), 1.0);
        }
    }

    #[test]
    fn test_symmetry_and_bounds() {
        for _ in 0..100 {
            let x = random_series(7);
            let y = random_series(7);
            let xy = pearson_correlation(&x, &y).unwrap();
            let yx = pearson_correlation(&y, &x).unwrap();
            assert_eq!(xy, yx, "Correlation should be symmetric");
            assert!(xy.abs() <= 1.0 + 1e-9, "Correlation out of range: {}", xy);
        }
    }

    #[test]
    fn test_invalid_input() {
        let err = pearson_correlation(&[1.0, 2.0, 3.0], &[1.0, 2.0]).unwrap_err();
        assert_eq!(err, EngineError::LengthMismatch { left: 3, right: 2 });
        assert!(err.is_invalid_input());

        let err = pearson_correlation(&[1.0], &[1.0]).unwrap_err();
        assert_eq!(err, EngineError::TooFewSamples { got: 1, min: 2 });
    }

    #[test]
    fn test_round2_rounds_half_away_from_zero() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round2(0.8449), 0.84);
        assert_eq!(round2(1.0), 1.0);
    }

    #[test]
    fn test_matrix_symmetric_with_unit_diagonal() {
        let assets = MockDataProvider::default().assets();
        let matrix = build_correlation_matrix(&assets).unwrap();

        assert_eq!(matrix.len(), assets.len());
        for i in 0..matrix.len() {
            assert_eq!(matrix.get(i, i), 1.0);
            for j in 0..matrix.len() {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
                assert!(matrix.get(i, j).abs() <= 1.0);
            }
        }
        assert_eq!(matrix.ids()[0], "bitcoin");
        assert_eq!(matrix.index_of("polkadot"), Some(5));
    }

    #[test]
    fn test_matrix_diagonal_for_constant_series() {
        let assets = vec![series("flat", &[5.0, 5.0, 5.0]), series("up", &[1.0, 2.0, 3.0])];
        let matrix = build_correlation_matrix(&assets).unwrap();
        assert_eq!(matrix.get(0, 0), 1.0);
        assert_eq!(matrix.get(1, 1), 1.0);
        assert_eq!(matrix.get(0, 1), 0.0);
    }

    #[test]
    fn test_matrix_entries_are_rounded() {
        let assets = vec![
            series("a", &[1.0, 2.0, 3.0, 4.0]),
            series("b", &[1.0, 3.0, 2.0, 5.0]),
        ];
        let matrix = build_correlation_matrix(&assets).unwrap();
        let raw = pearson_correlation(&assets[0].samples, &assets[1].samples).unwrap();
        assert_eq!(matrix.get(0, 1), round2(raw));
        assert_ne!(raw, round2(raw));
    }

    #[test]
    fn test_matrix_rejects_mismatched_series() {
        let assets = vec![series("a", &[1.0, 2.0, 3.0]), series("b", &[1.0, 2.0])];
        assert!(build_correlation_matrix(&assets).is_err());
    }

    #[test]
    fn test_empty_matrix() {
        let matrix = build_correlation_matrix(&[]).unwrap();
        assert!(matrix.is_empty());
        assert_eq!(matrix.average_off_diagonal(), 0.0);
        assert_eq!(matrix.most_correlated_pair(), None);
        assert_eq!(matrix.least_correlated_asset(), None);
    }

    #[test]
    fn test_from_rows_checks_shape() {
        let ids = vec!["a".to_string(), "b".to_string()];
        assert!(CorrelationMatrix::from_rows(ids.clone(), vec![vec![1.0, 0.5], vec![0.5, 1.0]]).is_ok());
        assert!(CorrelationMatrix::from_rows(ids.clone(), vec![vec![1.0, 0.5]]).is_err());
        assert!(CorrelationMatrix::from_rows(ids, vec![vec![1.0], vec![0.5, 1.0]]).is_err());
    }

    #[test]
    fn test_pair_helpers() {
        let ids = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let matrix = CorrelationMatrix::from_rows(
            ids,
            vec![
                vec![1.0, 0.9, 0.1],
                vec![0.9, 1.0, 0.3],
                vec![0.1, 0.3, 1.0],
            ],
        )
        .unwrap();

        assert_eq!(matrix.pairs().count(), 3);
        assert_eq!(matrix.most_correlated_pair(), Some((0, 1, 0.9)));
        assert_eq!(matrix.least_correlated_asset(), Some(2));
        assert!((matrix.average_off_diagonal() - (1.3 / 3.0)).abs() < 1e-12);
        assert!((matrix.mean_correlation_of(2) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_rolling_correlation() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 6.0, 5.0, 4.0];
        let rolled = rolling_correlation(&x, &y, 3).unwrap();
        assert_eq!(rolled.len(), 3);
        assert_eq!(rolled[0], 1.0);
        assert_eq!(rolled[2], -1.0);

        assert!(rolling_correlation(&x, &y, 6).unwrap().is_empty());
        assert!(rolling_correlation(&x, &y, 1).is_err());
        assert!(rolling_correlation(&x, &y[..4], 3).is_err());
    }
}
