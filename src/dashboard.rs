use crate::config::{DERIVED_TREND_PAIRS, ROLLING_WINDOW, default_allocations_for};
use crate::correlation::{CorrelationMatrix, build_correlation_matrix};
use crate::data::{AssetSeries, HistoricalCorrelation, MarketDataProvider, validate_series};
use crate::risk::Allocations;
use crate::trends::derive_trends;
use anyhow::{Context, Result};
use tracing::info;

/// Everything derived once at startup from a data provider.
#[derive(Clone, Debug)]
pub struct Dashboard {
    pub source: String,
    pub assets: Vec<AssetSeries>,
    pub matrix: CorrelationMatrix,
    pub trends: Vec<HistoricalCorrelation>,
}

impl Dashboard {
    /// Fetches series and trends, validates them and builds the matrix.
    /// Trends are derived from the series when the provider has none.
    pub async fn load<P: MarketDataProvider>(provider: &P) -> Result<Self> {
        let source = provider.name().to_string();
        info!("Loading market data from {}", source);

        let assets = provider
            .fetch_asset_series()
            .await
            .with_context(|| format!("Failed to fetch asset series from {}", source))?;
        Self::from_parts(source, assets, provider.fetch_correlation_history().await?)
    }

    pub fn from_parts(
        source: String,
        assets: Vec<AssetSeries>,
        trends: Vec<HistoricalCorrelation>,
    ) -> Result<Self> {
        validate_series(&assets)?;
        let matrix = build_correlation_matrix(&assets).context("Failed to build correlation matrix")?;

        let trends = if trends.is_empty() {
            // Validation guarantees at least two samples per series.
            let samples = assets.first().map_or(ROLLING_WINDOW, |a| a.samples.len());
            let window = ROLLING_WINDOW.min(samples);
            let derived = derive_trends(&assets, &matrix, window, DERIVED_TREND_PAIRS)
                .context("Failed to derive correlation trends")?;
            info!("Derived {} correlation trends from price series (window {})", derived.len(), window);
            derived
        } else {
            trends
        };

        info!(
            "Dashboard ready: {} assets, {} trends, mean pairwise correlation {:.2}",
            assets.len(),
            trends.len(),
            matrix.average_off_diagonal()
        );

        Ok(Self {
            source,
            assets,
            matrix,
            trends,
        })
    }

    pub fn asset_ids(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.id.clone()).collect()
    }

    /// Starting allocations for the loaded assets, used when none are given.
    pub fn default_allocations(&self) -> Allocations {
        default_allocations_for(&self.asset_ids())
    }
}
