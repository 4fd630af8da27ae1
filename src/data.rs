use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Price history and display metadata for a single asset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetSeries {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(rename = "data")]
    pub samples: Vec<f64>,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "#cccccc".to_string()
}

/// One observation of a pairwise correlation at a labelled period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period: String,
    pub correlation: f64,
}

/// A pairwise correlation tracked over time, e.g. `BTC-ETH`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalCorrelation {
    pub id: String,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    pub points: Vec<TrendPoint>,
    #[serde(default)]
    pub commentary: Option<String>,
}

impl HistoricalCorrelation {
    pub fn from_values(id: &str, name: &str, color: &str, periods: &[&str], values: &[f64]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
            points: periods
                .iter()
                .zip(values.iter())
                .map(|(period, &correlation)| TrendPoint {
                    period: period.to_string(),
                    correlation,
                })
                .collect(),
            commentary: None,
        }
    }

    pub fn with_commentary(mut self, text: &str) -> Self {
        self.commentary = Some(text.to_string());
        self
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.correlation).collect()
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Provider Abstraction
// ──────────────────────────────────────────────────────────────────────────────

/// Source of asset price series. The engine only depends on the
/// [`AssetSeries`] shape, never on a concrete provider.
pub trait MarketDataProvider {
    /// Human-readable name for logs and the header.
    fn name(&self) -> &str;

    fn fetch_asset_series(&self) -> impl Future<Output = Result<Vec<AssetSeries>>> + Send;

    /// Historical pairwise correlations, if the source has any.
    fn fetch_correlation_history(&self) -> impl Future<Output = Result<Vec<HistoricalCorrelation>>> + Send {
        async { Ok(Vec::new()) }
    }
}

/// Checks the invariants the engine relies on: unique ids, at least two
/// samples, one shared sample count, finite values.
pub fn validate_series(series: &[AssetSeries]) -> Result<()> {
    let mut seen = HashSet::new();
    let expected_len = series.first().map(|s| s.samples.len());

    for asset in series {
        if !seen.insert(asset.id.as_str()) {
            bail!("Duplicate asset id: {}", asset.id);
        }
        if asset.samples.len() < 2 {
            bail!("Asset {} has {} samples, need at least 2", asset.id, asset.samples.len());
        }
        if Some(asset.samples.len()) != expected_len {
            bail!(
                "Asset {} has {} samples, expected {}",
                asset.id,
                asset.samples.len(),
                expected_len.unwrap_or_default()
            );
        }
        if let Some(bad) = asset.samples.iter().find(|v| !v.is_finite()) {
            bail!("Asset {} contains a non-finite sample ({})", asset.id, bad);
        }
    }
    Ok(())
}

// ──────────────────────────────────────────────────────────────────────────────
// Mock Provider
// ──────────────────────────────────────────────────────────────────────────────

/// Weekly labels used by the built-in correlation trends.
pub const TREND_PERIODS: &[&str] = &[
    "Week 1", "Week 2", "Week 3", "Week 4", "Week 5", "Week 6", "Week 7", "Week 8",
];

/// Fixed sample data: six large-cap assets, seven daily closes each.
#[derive(Clone, Debug, Default)]
pub struct MockDataProvider;

impl MockDataProvider {
    pub fn assets(&self) -> Vec<AssetSeries> {
        let asset = |id: &str, name: &str, symbol: &str, data: &[f64], color: &str| AssetSeries {
            id: id.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            samples: data.to_vec(),
            color: color.to_string(),
        };

        vec![
            asset("bitcoin", "Bitcoin", "BTC", &[45000.0, 46000.0, 44000.0, 47000.0, 48000.0, 46500.0, 47200.0], "#F7931A"),
            asset("ethereum", "Ethereum", "ETH", &[3200.0, 3300.0, 3100.0, 3400.0, 3500.0, 3450.0, 3480.0], "#627EEA"),
            asset("ripple", "Ripple", "XRP", &[0.75, 0.78, 0.72, 0.8, 0.82, 0.79, 0.81], "#23292F"),
            asset("cardano", "Cardano", "ADA", &[1.2, 1.25, 1.18, 1.3, 1.35, 1.28, 1.32], "#3CC8C8"),
            asset("solana", "Solana", "SOL", &[150.0, 155.0, 145.0, 160.0, 165.0, 158.0, 162.0], "#00FFA3"),
            asset("polkadot", "Polkadot", "DOT", &[22.0, 23.0, 21.0, 24.0, 25.0, 23.5, 24.2], "#E6007A"),
        ]
    }

    pub fn history(&self) -> Vec<HistoricalCorrelation> {
        vec![
            HistoricalCorrelation::from_values(
                "BTC-ETH",
                "Bitcoin-Ethereum",
                "#F7931A",
                TREND_PERIODS,
                &[0.82, 0.79, 0.85, 0.87, 0.83, 0.76, 0.81, 0.84],
            )
            .with_commentary(
                "Bitcoin and Ethereum show consistently high correlation, suggesting similar market drivers affect both.",
            ),
            HistoricalCorrelation::from_values(
                "BTC-XRP",
                "Bitcoin-Ripple",
                "#627EEA",
                TREND_PERIODS,
                &[0.65, 0.58, 0.62, 0.71, 0.67, 0.58, 0.63, 0.67],
            )
            .with_commentary(
                "Bitcoin and Ripple exhibit moderate correlation, fluctuating more than BTC-ETH, so XRP sometimes moves independently.",
            ),
            HistoricalCorrelation::from_values(
                "ETH-ADA",
                "Ethereum-Cardano",
                "#3CC8C8",
                TREND_PERIODS,
                &[0.78, 0.75, 0.81, 0.83, 0.79, 0.72, 0.76, 0.8],
            )
            .with_commentary(
                "Ethereum and Cardano correlation has strengthened over time, suggesting growing integration between the platforms.",
            ),
        ]
    }
}

impl MarketDataProvider for MockDataProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch_asset_series(&self) -> impl Future<Output = Result<Vec<AssetSeries>>> + Send {
        let assets = self.assets();
        async move { Ok(assets) }
    }

    fn fetch_correlation_history(&self) -> impl Future<Output = Result<Vec<HistoricalCorrelation>>> + Send {
        let history = self.history();
        async move { Ok(history) }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// JSON File Provider
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Deserialize, Serialize, Debug)]
struct MarketFile {
    assets: Vec<AssetSeries>,
    #[serde(default)]
    trends: Vec<HistoricalCorrelation>,
}

/// Loads assets (and optional trends) from a JSON file of the form
/// `{ "assets": [...], "trends": [...] }`. The file is read once and cached.
#[derive(Clone, Debug)]
pub struct JsonFileProvider {
    path: PathBuf,
    label: String,
    file: OnceCell<MarketFile>,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = format!("file:{}", path.display());
        Self {
            path,
            label,
            file: OnceCell::new(),
        }
    }

    async fn load(&self) -> Result<&MarketFile> {
        self.file
            .get_or_try_init(|| async {
                let raw = tokio::fs::read_to_string(&self.path)
                    .await
                    .with_context(|| format!("Failed to read market data file {}", self.path.display()))?;
                let file: MarketFile = serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse market data file {}", self.path.display()))?;
                Ok::<_, anyhow::Error>(file)
            })
            .await
    }
}

impl MarketDataProvider for JsonFileProvider {
    fn name(&self) -> &str {
        &self.label
    }

    fn fetch_asset_series(&self) -> impl Future<Output = Result<Vec<AssetSeries>>> + Send {
        async move {
            let file = self.load().await?;
            validate_series(&file.assets)
                .with_context(|| format!("Invalid market data in {}", self.path.display()))?;
            info!("Loaded {} assets from {}", file.assets.len(), self.path.display());
            Ok(file.assets.clone())
        }
    }

    fn fetch_correlation_history(&self) -> impl Future<Output = Result<Vec<HistoricalCorrelation>>> + Send {
        async move {
            let file = self.load().await?;
            if file.trends.is_empty() {
                debug!("{} has no correlation trends", self.path.display());
            }
            Ok(file.trends.clone())
        }
    }
}

/// Either of the built-in providers, chosen at startup.
#[derive(Clone, Debug)]
pub enum DataSource {
    Mock(MockDataProvider),
    File(JsonFileProvider),
}

impl MarketDataProvider for DataSource {
    fn name(&self) -> &str {
        match self {
            Self::Mock(p) => p.name(),
            Self::File(p) => p.name(),
        }
    }

    fn fetch_asset_series(&self) -> impl Future<Output = Result<Vec<AssetSeries>>> + Send {
        async move {
            match self {
                Self::Mock(p) => p.fetch_asset_series().await,
                Self::File(p) => p.fetch_asset_series().await,
            }
        }
    }

    fn fetch_correlation_history(&self) -> impl Future<Output = Result<Vec<HistoricalCorrelation>>> + Send {
        async move {
            match self {
                Self::Mock(p) => p.fetch_correlation_history().await,
                Self::File(p) => p.fetch_correlation_history().await,
            }
        }
    }
}
