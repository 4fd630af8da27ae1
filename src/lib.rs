//! Correlation matrix, correlation trends and portfolio risk scoring for a
//! small set of crypto assets, with a terminal dashboard on top.
//!
//! The numerical core ([`correlation`], [`risk`], [`classify`]) is pure and
//! synchronous; data arrives through a [`data::MarketDataProvider`].

pub mod app;
pub mod classify;
pub mod config;
pub mod correlation;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod logging;
pub mod report;
pub mod risk;
pub mod trends;
pub mod tui;
pub mod ui;

pub use classify::{CorrelationBucket, RiskLevel, classify_correlation, classify_risk};
pub use correlation::{CorrelationMatrix, build_correlation_matrix, pearson_correlation, round2};
pub use data::AssetSeries;
pub use error::EngineError;
pub use risk::{Allocations, RiskNormalization, portfolio_risk, portfolio_risk_for_order, portfolio_risk_with};
