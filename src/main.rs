use clap::{Parser, ValueEnum};
use cryptocorr::app::App;
use cryptocorr::config::{self, Settings, Theme};
use cryptocorr::dashboard::Dashboard;
use cryptocorr::data::{DataSource, JsonFileProvider, MockDataProvider};
use cryptocorr::report::PortfolioReport;
use cryptocorr::risk::RiskNormalization;
use cryptocorr::{logging, tui};
use std::io;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ThemeChoice {
    Light,
    Dark,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NormalizationChoice {
    TotalSquared,
    OffDiagonal,
}

impl From<NormalizationChoice> for RiskNormalization {
    fn from(value: NormalizationChoice) -> Self {
        match value {
            NormalizationChoice::TotalSquared => RiskNormalization::TotalSquared,
            NormalizationChoice::OffDiagonal => RiskNormalization::OffDiagonalWeight,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "CryptoCorrelate: crypto price correlation matrix, trends and portfolio risk",
    after_help = "EXAMPLES:
    # Interactive dashboard on the built-in sample data
    cargo run --release

    # Print a report for a custom allocation
    cargo run --release -- --report --allocation bitcoin=50,ethereum=50

    # JSON report from a market data file
    cargo run --release -- --json --data market.json"
)]
struct Args {
    /// JSON market data file ({ \"assets\": [...], \"trends\": [...] }). Overrides CRYPTOCORR_DATA_FILE.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Initial colour theme. Overrides CRYPTOCORR_THEME.
    #[arg(long, value_enum)]
    theme: Option<ThemeChoice>,

    /// Comma-separated allocations in percent, e.g. bitcoin=40,ethereum=30
    #[arg(long)]
    allocation: Option<String>,

    /// How the weighted correlation sum is normalized
    #[arg(long, value_enum, default_value_t = NormalizationChoice::TotalSquared)]
    normalization: NormalizationChoice,

    /// Print a text report and exit
    #[arg(long)]
    report: bool,

    /// Print a JSON report and exit
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    // The dashboard owns the terminal, so its logs wait until it is restored.
    let log_buffer = logging::init(!(args.report || args.json));

    let res = run(args).await;
    if let Some(buffer) = log_buffer {
        buffer.drain_into(&mut io::stderr())?;
    }
    res
}

async fn run(args: Args) -> io::Result<()> {
    let theme = args.theme.map(|t| match t {
        ThemeChoice::Light => Theme::Light,
        ThemeChoice::Dark => Theme::Dark,
    });
    let settings = Settings::resolve(args.data.clone(), theme);

    let source = match &settings.data_file {
        Some(path) => DataSource::File(JsonFileProvider::new(path)),
        None => DataSource::Mock(MockDataProvider),
    };

    let dashboard = match Dashboard::load(&source).await {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to load market data: {:#}", e);
            return Ok(());
        }
    };

    let allocations = match &args.allocation {
        Some(raw) => match config::parse_allocations(raw, &dashboard.asset_ids()) {
            Ok(a) => a,
            Err(e) => {
                error!("Invalid --allocation: {:#}", e);
                return Ok(());
            }
        },
        None => dashboard.default_allocations(),
    };
    let normalization = RiskNormalization::from(args.normalization);

    if args.report || args.json {
        match PortfolioReport::build(&dashboard, &allocations, normalization) {
            Ok(report) if args.json => match report.to_json() {
                Ok(json) => println!("{}", json),
                Err(e) => error!("Failed to serialize report: {}", e),
            },
            Ok(report) => {
                print!("{}", report.render_text());
                println!();
                println!("⚠  Educational use only. Not financial advice.");
            }
            Err(e) => error!("Failed to build report: {:#}", e),
        }
        return Ok(());
    }

    info!("Launching dashboard with theme {}", settings.theme.as_str());
    let mut terminal = tui::init()?;
    let mut app = App::new(dashboard, allocations, settings.theme, normalization);
    let res = app.run(&mut terminal).await;

    tui::restore()?;

    if let Err(e) = res {
        error!("Error: {:?}", e);
    }

    Ok(())
}
