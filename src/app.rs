use crate::classify::{RiskLevel, classify_risk};
use crate::config::{SLIDER_PAGE_STEP, SLIDER_STEP, Theme};
use crate::dashboard::Dashboard;
use crate::error::EngineError;
use crate::risk::{Allocations, Recommendation, RiskNormalization, portfolio_risk_with, recommendations};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::io;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tab {
    Home,
    Trends,
    Portfolio,
    Settings,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Home, Tab::Trends, Tab::Portfolio, Tab::Settings];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Home => "Home",
            Tab::Trends => "Trends",
            Tab::Portfolio => "Portfolio",
            Tab::Settings => "Settings",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Preferred market data vendor. Display-only; nothing is fetched from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataSourceChoice {
    CoinGecko,
    CoinMarketCap,
    Binance,
}

impl DataSourceChoice {
    pub fn label(self) -> &'static str {
        match self {
            Self::CoinGecko => "CoinGecko API",
            Self::CoinMarketCap => "CoinMarketCap API",
            Self::Binance => "Binance API",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::CoinGecko => Self::CoinMarketCap,
            Self::CoinMarketCap => Self::Binance,
            Self::Binance => Self::CoinGecko,
        }
    }
}

/// Preferred look-back period. Display-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimePeriod {
    Days7,
    Days30,
    Days90,
    Year1,
}

impl TimePeriod {
    pub fn label(self) -> &'static str {
        match self {
            Self::Days7 => "7 Days",
            Self::Days30 => "30 Days",
            Self::Days90 => "90 Days",
            Self::Year1 => "1 Year",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Days7 => Self::Days30,
            Self::Days30 => Self::Days90,
            Self::Days90 => Self::Year1,
            Self::Year1 => Self::Days7,
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub tab: Tab,
    pub theme: Theme,
    pub dashboard: Dashboard,
    pub allocations: Allocations,
    pub normalization: RiskNormalization,
    /// Asset row highlighted in the Portfolio tab.
    pub selected: usize,
    pub data_source: DataSourceChoice,
    pub time_period: TimePeriod,
}

impl App {
    pub fn new(dashboard: Dashboard, allocations: Allocations, theme: Theme, normalization: RiskNormalization) -> Self {
        Self {
            should_quit: false,
            tab: Tab::Home,
            theme,
            dashboard,
            allocations,
            normalization,
            selected: 0,
            data_source: DataSourceChoice::CoinGecko,
            time_period: TimePeriod::Days7,
        }
    }

    /// Current risk score, recomputed from the live allocations.
    pub fn risk_score(&self) -> Result<f64, EngineError> {
        portfolio_risk_with(&self.dashboard.matrix, &self.allocations, self.normalization)
    }

    pub fn risk_level(&self) -> Option<RiskLevel> {
        self.risk_score().ok().map(classify_risk)
    }

    pub fn recommendations(&self) -> Vec<Recommendation> {
        match self.risk_score() {
            Ok(score) => recommendations(&self.dashboard.assets, &self.dashboard.matrix, &self.allocations, score),
            Err(_) => Vec::new(),
        }
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.dashboard.assets.get(self.selected).map(|a| a.id.as_str())
    }

    fn adjust_selected(&mut self, delta: f64) {
        if let Some(id) = self.selected_id().map(str::to_string) {
            let value = self.allocations.adjust(&id, delta);
            debug!("Allocation {} -> {:.0}% (risk {:?})", id, value, self.risk_score());
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::BackTab => self.tab = self.tab.previous(),
            KeyCode::Char(c @ '1'..='4') => {
                self.tab = Tab::ALL[(c as u8 - b'1') as usize];
            }
            KeyCode::Char('t') => self.theme = self.theme.toggled(),
            _ => match self.tab {
                Tab::Portfolio => self.handle_portfolio_key(code),
                Tab::Settings => self.handle_settings_key(code),
                Tab::Home | Tab::Trends => {}
            },
        }
    }

    fn handle_portfolio_key(&mut self, code: KeyCode) {
        let count = self.dashboard.assets.len();
        if count == 0 {
            return;
        }
        match code {
            KeyCode::Up => self.selected = (self.selected + count - 1) % count,
            KeyCode::Down => self.selected = (self.selected + 1) % count,
            KeyCode::Left => self.adjust_selected(-SLIDER_STEP),
            KeyCode::Right => self.adjust_selected(SLIDER_STEP),
            KeyCode::PageDown => self.adjust_selected(-SLIDER_PAGE_STEP),
            KeyCode::PageUp => self.adjust_selected(SLIDER_PAGE_STEP),
            _ => {}
        }
    }

    fn handle_settings_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('d') => self.data_source = self.data_source.next(),
            KeyCode::Char('p') => self.time_period = self.time_period.next(),
            _ => {}
        }
    }

    pub async fn run(&mut self, terminal: &mut crate::tui::Tui) -> io::Result<()> {
        while !self.should_quit {
            terminal.draw(|f| crate::ui::render(f, self))?;

            if event::poll(std::time::Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_allocations;
    use crate::data::MockDataProvider;

    fn app() -> App {
        let provider = MockDataProvider;
        let dashboard = Dashboard::from_parts("mock".to_string(), provider.assets(), provider.history()).unwrap();
        App::new(dashboard, default_allocations(), Theme::Light, RiskNormalization::TotalSquared)
    }

    #[test]
    fn test_tab_navigation() {
        let mut app = app();
        assert_eq!(app.tab, Tab::Home);
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.tab, Tab::Trends);
        app.handle_key(KeyCode::BackTab);
        app.handle_key(KeyCode::BackTab);
        assert_eq!(app.tab, Tab::Settings);
        app.handle_key(KeyCode::Char('3'));
        assert_eq!(app.tab, Tab::Portfolio);
    }

    #[test]
    fn test_theme_toggle_and_quit() {
        let mut app = app();
        app.handle_key(KeyCode::Char('t'));
        assert_eq!(app.theme, Theme::Dark);
        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_slider_edits_recompute_risk() {
        let mut app = app();
        let before = app.risk_score().unwrap();

        // Slider keys are ignored outside the Portfolio tab.
        app.handle_key(KeyCode::Right);
        assert_eq!(app.allocations.get("bitcoin"), 40.0);

        app.handle_key(KeyCode::Char('3'));
        app.handle_key(KeyCode::Down);
        assert_eq!(app.selected_id(), Some("ethereum"));
        app.handle_key(KeyCode::PageUp);
        assert_eq!(app.allocations.get("ethereum"), 40.0);
        app.handle_key(KeyCode::Left);
        assert_eq!(app.allocations.get("ethereum"), 39.0);
        assert_ne!(app.risk_score().unwrap(), before);

        app.handle_key(KeyCode::Up);
        app.handle_key(KeyCode::Up);
        assert_eq!(app.selected_id(), Some("polkadot"));
        for _ in 0..5 {
            app.handle_key(KeyCode::PageDown);
        }
        assert_eq!(app.allocations.get("polkadot"), 0.0);
    }

    #[test]
    fn test_zero_portfolio_has_no_risk_level() {
        let mut app = app();
        app.allocations = Allocations::new();
        assert!(app.risk_score().is_err());
        assert_eq!(app.risk_level(), None);
        assert!(app.recommendations().is_empty());
    }

    #[test]
    fn test_settings_cycle() {
        let mut app = app();
        app.handle_key(KeyCode::Char('4'));
        app.handle_key(KeyCode::Char('d'));
        app.handle_key(KeyCode::Char('p'));
        assert_eq!(app.data_source, DataSourceChoice::CoinMarketCap);
        assert_eq!(app.time_period, TimePeriod::Days30);
        assert_eq!(app.data_source.label(), "CoinMarketCap API");
    }
}
