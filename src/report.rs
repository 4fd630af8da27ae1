use crate::classify::{RiskLevel, classify_risk};
use crate::correlation::CorrelationMatrix;
use crate::dashboard::Dashboard;
use crate::risk::{Allocations, Recommendation, RiskNormalization, portfolio_risk_with, recommendations};
use crate::trends::{TrendSummary, summarize};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Point-in-time snapshot of matrix, risk and advice, for plain-text or JSON output.
#[derive(Clone, Debug, Serialize)]
pub struct PortfolioReport {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub symbols: Vec<String>,
    pub matrix: CorrelationMatrix,
    pub allocations: Allocations,
    pub normalization: RiskNormalization,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<Recommendation>,
    pub trends: Vec<TrendSummary>,
}

impl PortfolioReport {
    pub fn build(
        dashboard: &Dashboard,
        allocations: &Allocations,
        normalization: RiskNormalization,
    ) -> Result<Self> {
        let risk_score = portfolio_risk_with(&dashboard.matrix, allocations, normalization)?;
        Ok(Self {
            generated_at: Utc::now(),
            source: dashboard.source.clone(),
            symbols: dashboard.assets.iter().map(|a| a.symbol.clone()).collect(),
            matrix: dashboard.matrix.clone(),
            allocations: allocations.clone(),
            normalization,
            risk_score,
            risk_level: classify_risk(risk_score),
            recommendations: recommendations(&dashboard.assets, &dashboard.matrix, allocations, risk_score),
            trends: dashboard.trends.iter().filter_map(summarize).collect(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Renders the report as a fixed-width text block.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let width = 8;

        out.push_str(&format!(
            "Crypto Correlation Report ({})  source: {}\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M UTC"),
            self.source
        ));

        out.push_str(&format!("{:<width$}", "", width = width));
        for symbol in &self.symbols {
            out.push_str(&format!("{:>width$}", symbol, width = width));
        }
        out.push('\n');
        for (symbol, row) in self.symbols.iter().zip(self.matrix.rows()) {
            out.push_str(&format!("{:<width$}", symbol, width = width));
            for value in row {
                out.push_str(&format!("{:>width$.2}", value, width = width));
            }
            out.push('\n');
        }

        out.push_str("\nAllocation:\n");
        for (id, symbol) in self.matrix.ids().iter().zip(&self.symbols) {
            out.push_str(&format!("  {:<6} {:>6.1}%\n", symbol, self.allocations.get(id)));
        }

        out.push_str(&format!(
            "\nPortfolio Risk Score: {:.2} ({} Risk)\n",
            self.risk_score, self.risk_level
        ));

        out.push_str("\nRecommendations:\n");
        for rec in &self.recommendations {
            out.push_str(&format!("  [{}] {}\n", rec.severity.marker(), rec.message));
        }

        if !self.trends.is_empty() {
            out.push_str("\nCorrelation Trends:\n");
            for trend in &self.trends {
                out.push_str(&format!(
                    "  {:<10} mean {:.2}  range {:.2}..{:.2}  {:+.2} ({})\n",
                    trend.id,
                    trend.mean,
                    trend.min,
                    trend.max,
                    trend.change,
                    trend.direction.as_str()
                ));
            }
        }

        out
    }
}
