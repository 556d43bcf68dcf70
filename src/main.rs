mod analysis;
mod chart;
mod config;
mod error;
mod frame;
mod indicator;
mod model;
mod provider;
mod report;

use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Parser;
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use analysis::{ANALYSIS_SESSIONS, AnalysisWindow};
use config::AppConfig;
use error::FetchError;
use model::{FetchWindow, QuoteSeries};
use provider::yahoo::YahooFinance;
use provider::{LOOKBACK_DAYS, MarketDataProvider, PAIR_LABEL, SYMBOL};
use report::Reporter;
use report::terminal::TerminalReporter;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("market data error")]
    Fetch,
    #[display("analysis error")]
    Analysis,
    #[display("chart error")]
    Chart,
}

#[derive(Parser)]
#[command(
    name = "eurusd-derivative",
    about = "Plot the EUR/USD closing price and its smoothed derivative"
)]
struct Cli {
    /// Path to a TOML configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = config::resolve(cli.config.as_deref()).change_context(AppError::Config)?;

    init_tracing(&config);

    let mut reporter = TerminalReporter::stdout();
    reporter.run_started(PAIR_LABEL);

    // ── Fetch ─────────────────────────────────────────────────────────────────
    let provider = YahooFinance::new(&config.provider.base_url, &config.provider.user_agent)
        .change_context(AppError::Fetch)?;
    let window = FetchWindow::trailing(Utc::now(), LOOKBACK_DAYS);

    let series = match fetch_series(&provider, window, &mut reporter).await {
        Ok(series) => series,
        Err(report) => {
            reporter.fetch_failed(report.current_context());
            return Err(report.change_context(AppError::Fetch));
        }
    };

    // ── Analyze ───────────────────────────────────────────────────────────────
    let analysis = AnalysisWindow::latest(&series, ANALYSIS_SESSIONS)
        .change_context(AppError::Analysis)?;

    if analysis.is_empty() {
        warn!(symbol = SYMBOL, "no closing prices left after cleaning");
        reporter.no_data_to_plot();
        return Ok(());
    }

    info!(
        sessions = analysis.series.len(),
        latest_derivative = ?analysis.analysis.latest(),
        "derivative computed"
    );

    // ── Present ───────────────────────────────────────────────────────────────
    reporter.summary(&analysis);

    let output = Path::new(&config.chart.output);
    chart::render(&analysis, output, (config.chart.width, config.chart.height))
        .change_context(AppError::Chart)
        .attach_with(|| format!("output: {}", output.display()))?;
    info!(path = %output.display(), "chart written");
    reporter.chart_written(output);

    reporter.analysis(&analysis);
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

/// Fetch the daily frame for [`SYMBOL`] and extract its closing prices.
async fn fetch_series(
    provider: &dyn MarketDataProvider,
    window: FetchWindow,
    reporter: &mut dyn Reporter,
) -> Result<QuoteSeries, Report<FetchError>> {
    info!(provider = provider.name(), symbol = SYMBOL, %window, "fetching daily quotes");
    reporter.fetch_started(SYMBOL, &window);

    let frame = provider.fetch_daily(SYMBOL, window).await?;

    // Zero rows means the provider had nothing for the window
    if frame.is_empty() {
        return Err(Report::new(FetchError::NoDataAvailable {
            symbol: SYMBOL.into(),
        }));
    }

    let close = frame
        .locate_close()
        .change_context(FetchError::FetchFailure {
            provider: provider.name().into(),
        })?;
    reporter.frame_received(&frame, &close);

    if frame.is_hierarchical() {
        debug!(columns = ?frame.labels(), "flattened two-level column labels");
    }
    let missing = close.missing();
    if missing > 0 {
        debug!(missing, column = %close.label(), "skipping rows without a closing price");
    }

    Ok(close.quote_series())
}
