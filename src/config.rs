use crate::risk::Allocations;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Environment variable naming a JSON market data file to load instead of
/// the built-in sample data.
pub const DATA_FILE_ENV: &str = "CRYPTOCORR_DATA_FILE";

/// Environment variable selecting the initial theme (`light` | `dark`).
pub const THEME_ENV: &str = "CRYPTOCORR_THEME";

/// Default `tracing` directive when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "cryptocorr=info";

/// Starting allocations, in percent, for the sample assets.
pub const DEFAULT_ALLOCATIONS: &[(&str, f64)] = &[
    ("bitcoin", 40.0),
    ("ethereum", 30.0),
    ("ripple", 10.0),
    ("cardano", 10.0),
    ("solana", 5.0),
    ("polkadot", 5.0),
];

/// Window (in samples) for trends derived from raw price series.
pub const ROLLING_WINDOW: usize = 4;

/// Number of pairs to derive trends for when the provider supplies none.
pub const DERIVED_TREND_PAIRS: usize = 3;

/// Allocation step for a single arrow key press.
pub const SLIDER_STEP: f64 = 1.0;

/// Allocation step for PageUp / PageDown.
pub const SLIDER_PAGE_STEP: f64 = 10.0;

pub fn default_allocations() -> Allocations {
    Allocations::from_pairs(DEFAULT_ALLOCATIONS.iter().copied())
}

/// Starting allocations for a loaded asset set. Keeps the preset weights of
/// any sample asset that is present; otherwise splits 100% evenly.
pub fn default_allocations_for(ids: &[String]) -> Allocations {
    let preset: Vec<(&str, f64)> = DEFAULT_ALLOCATIONS
        .iter()
        .copied()
        .filter(|(id, _)| ids.iter().any(|known| known == id))
        .collect();
    if !preset.is_empty() {
        return Allocations::from_pairs(preset);
    }
    if ids.is_empty() {
        return Allocations::new();
    }

    let even = 100.0 / ids.len() as f64;
    info!("No preset allocation matches the loaded assets; using {:.2}% each", even);
    Allocations::from_pairs(ids.iter().map(|id| (id.as_str(), even)))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

/// Settings resolved from CLI flags, then environment, then defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub data_file: Option<PathBuf>,
    pub theme: Theme,
}

impl Settings {
    /// Loads `.env` (if present) and resolves settings. Explicit arguments
    /// win over the environment.
    pub fn resolve(data_file: Option<PathBuf>, theme: Option<Theme>) -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from {}", path.display());
        }
        Self::resolve_with(data_file, theme, |key| std::env::var(key).ok())
    }

    pub fn resolve_with(
        data_file: Option<PathBuf>,
        theme: Option<Theme>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let data_file = data_file.or_else(|| {
            env(DATA_FILE_ENV)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        });

        let theme = theme.unwrap_or_else(|| match env(THEME_ENV) {
            Some(raw) => Theme::parse(&raw).unwrap_or_else(|| {
                warn!("Unknown {}={} ; defaulting to light. Allowed values: light | dark", THEME_ENV, raw);
                Theme::Light
            }),
            None => Theme::Light,
        });

        Self { data_file, theme }
    }
}

/// Parses `id=pct,id=pct` into allocations. Ids not in `known_ids` are
/// skipped with a warning.
pub fn parse_allocations(raw: &str, known_ids: &[String]) -> anyhow::Result<Allocations> {
    let mut alloc = Allocations::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (id, value) = part
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Expected id=percent, got '{}'", part))?;
        let id = id.trim().to_ascii_lowercase();
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid allocation for {}: {}", id, e))?;
        if !known_ids.iter().any(|k| k == &id) {
            warn!("Ignoring allocation for unknown asset '{}'", id);
            continue;
        }
        alloc.set(&id, value);
    }
    Ok(alloc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_allocations() {
        let alloc = default_allocations();
        assert_eq!(alloc.get("bitcoin"), 40.0);
        assert_eq!(alloc.get("polkadot"), 5.0);
        assert_eq!(alloc.iter().map(|(_, v)| v).sum::<f64>(), 100.0);
    }

    #[test]
    fn test_default_allocations_follow_loaded_assets() {
        let ids: Vec<String> = ["bitcoin", "tether", "dogecoin"].iter().map(|s| s.to_string()).collect();
        let alloc = default_allocations_for(&ids);
        assert_eq!(alloc.get("bitcoin"), 40.0);
        assert_eq!(alloc.get("tether"), 0.0);
        assert_eq!(alloc.get("ethereum"), 0.0);

        let ids: Vec<String> = ["aave", "link"].iter().map(|s| s.to_string()).collect();
        let alloc = default_allocations_for(&ids);
        assert_eq!(alloc.get("aave"), 50.0);
        assert_eq!(alloc.get("link"), 50.0);

        assert!(default_allocations_for(&[]).is_empty());
    }

    #[test]
    fn test_settings_precedence() {
        let env = env_from(&[(DATA_FILE_ENV, "/tmp/market.json"), (THEME_ENV, "Dark")]);
        let settings = Settings::resolve_with(None, None, &env);
        assert_eq!(settings.data_file, Some(PathBuf::from("/tmp/market.json")));
        assert_eq!(settings.theme, Theme::Dark);

        let settings = Settings::resolve_with(Some(PathBuf::from("cli.json")), Some(Theme::Light), &env);
        assert_eq!(settings.data_file, Some(PathBuf::from("cli.json")));
        assert_eq!(settings.theme, Theme::Light);
    }

    #[test]
    fn test_settings_fallbacks() {
        let env = env_from(&[(DATA_FILE_ENV, "  "), (THEME_ENV, "neon")]);
        let settings = Settings::resolve_with(None, None, env);
        assert_eq!(settings.data_file, None);
        assert_eq!(settings.theme, Theme::Light);
    }

    #[test]
    fn test_theme_toggle() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled().toggled(), Theme::Dark);
        assert_eq!(Theme::parse(" LIGHT "), Some(Theme::Light));
    }

    #[test]
    fn test_parse_allocations() {
        let known: Vec<String> = ["bitcoin", "ethereum"].iter().map(|s| s.to_string()).collect();
        let alloc = parse_allocations("bitcoin=60, ETHEREUM=25,doge=15", &known).unwrap();
        assert_eq!(alloc.get("bitcoin"), 60.0);
        assert_eq!(alloc.get("ethereum"), 25.0);
        assert_eq!(alloc.get("doge"), 0.0);

        assert!(parse_allocations("bitcoin", &known).is_err());
        assert!(parse_allocations("bitcoin=lots", &known).is_err());
    }
}
