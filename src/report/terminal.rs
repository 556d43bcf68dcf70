use std::fmt::Write as _;
use std::io::{self, Stdout, Write};
use std::path::Path;

use crate::analysis::{AnalysisWindow, RECENT_SESSIONS};
use crate::error::FetchError;
use crate::frame::{CloseColumn, PriceFrame};
use crate::model::FetchWindow;
use crate::provider::PAIR_LABEL;
use crate::report::{Reporter, TROUBLESHOOTING};

const BANNER_WIDTH: usize = 50;
const REPORT_WIDTH: usize = 60;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Plain-text reporter for a terminal (or any writer, in tests).
pub struct TerminalReporter<W: Write = Stdout> {
    out: W,
}

impl TerminalReporter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "failed to write report");
        }
    }
}

fn banner(title: &str, width: usize) -> String {
    let rule = "=".repeat(width);
    format!("\n{rule}\n{title}\n{rule}\n")
}

fn format_summary(window: &AnalysisWindow) -> String {
    let mut text = banner("DATA OBTAINED", BANNER_WIDTH);

    if let Some((first, last)) = window.date_range() {
        let _ = writeln!(
            text,
            "Period analyzed: {} to {}",
            first.format(DATE_FORMAT),
            last.format(DATE_FORMAT)
        );
    }
    let _ = writeln!(text, "Sessions: {}", window.series.len());
    if let Some(price) = window.latest_price() {
        let _ = writeln!(text, "Latest {PAIR_LABEL} price: {price:.5}");
    }
    if let Some((min, max)) = window.price_range() {
        let _ = writeln!(text, "Price range: {min:.5} - {max:.5}");
    }
    match (window.trend(), window.analysis.latest()) {
        (Some(trend), Some(derivative)) => {
            let _ = writeln!(text, "Current trend: {trend}");
            let _ = writeln!(text, "Current derivative: {derivative:.6}");
        }
        _ => {
            let _ = writeln!(text, "Current trend: undefined (fewer than 2 sessions)");
        }
    }

    let recent = window.recent(RECENT_SESSIONS);
    if !recent.is_empty() {
        text.push_str(&banner(
            &format!("LAST {} SESSIONS", recent.len()),
            BANNER_WIDTH,
        ));
        for session in recent {
            let _ = writeln!(
                text,
                "{}: {:.5} (change: {:+.6})",
                session.date.format(DATE_FORMAT),
                session.price,
                session.change
            );
        }
    }
    text
}

fn format_analysis(window: &AnalysisWindow) -> String {
    let rule = "=".repeat(REPORT_WIDTH);
    let mut text = format!("\n{rule}\n{PAIR_LABEL} ANALYSIS\n{rule}\n");

    if let Some((first, last)) = window.date_range() {
        let _ = writeln!(
            text,
            "Period analyzed: {} to {}",
            first.format(DATE_FORMAT),
            last.format(DATE_FORMAT)
        );
    }
    if let Some(price) = window.latest_price() {
        let _ = writeln!(text, "Latest price: {price:.5}");
    }
    if let (Some(derivative), Some(trend)) = (window.analysis.latest(), window.trend()) {
        let _ = writeln!(text, "Latest derivative: {derivative:.6}");
        let _ = writeln!(text, "Current trend: {trend}");
    }
    if let Some(stats) = window.stats() {
        let _ = writeln!(
            text,
            "Derivative mean: {:.6}  std dev: {:.6}  max: {:.6}  min: {:.6}",
            stats.mean, stats.std_dev, stats.max, stats.min
        );
    }
    text.push_str(&rule);
    text.push('\n');
    text
}

fn format_failure(error: &FetchError) -> String {
    let mut text = match error {
        FetchError::NoDataAvailable { symbol } => {
            format!("\nNo data found for {symbol}\n")
        }
        FetchError::FetchFailure { .. } => {
            format!("\nCOULD NOT OBTAIN THE DATA: {error}\n")
        }
    };
    text.push_str("Possible solutions:\n");
    for (i, step) in TROUBLESHOOTING.iter().enumerate() {
        let _ = writeln!(text, "{}. {step}", i + 1);
    }
    text
}

impl<W: Write> Reporter for TerminalReporter<W> {
    fn run_started(&mut self, pair: &str) {
        let rule = "=".repeat(BANNER_WIDTH);
        self.emit(&format!("STARTING {pair} ANALYSIS\n{rule}\n"));
    }

    fn fetch_started(&mut self, symbol: &str, window: &FetchWindow) {
        self.emit(&format!(
            "Fetching data from {window}\nTicker: {symbol}\n"
        ));
    }

    fn frame_received(&mut self, frame: &PriceFrame, close: &CloseColumn<'_>) {
        let (rows, columns) = frame.shape();
        let mut text = format!("Data downloaded: {rows} rows x {columns} columns\n");
        let labels = frame.labels().join(", ");
        if frame.is_hierarchical() {
            let _ = writeln!(text, "Two-level column labels flattened: [{labels}]");
        } else {
            let _ = writeln!(text, "Available columns: [{labels}]");
        }
        let _ = writeln!(text, "Close column identified: {}", close.label());
        if let Some(first) = close.first() {
            let _ = writeln!(text, "First price: {first:.5}");
        }
        if let Some(last) = close.last() {
            let _ = writeln!(text, "Last price: {last:.5}");
        }
        self.emit(&text);
    }

    fn fetch_failed(&mut self, error: &FetchError) {
        self.emit(&format_failure(error));
    }

    fn summary(&mut self, window: &AnalysisWindow) {
        self.emit(&format_summary(window));
    }

    fn no_data_to_plot(&mut self) {
        self.emit("no data to plot\n");
    }

    fn chart_written(&mut self, path: &Path) {
        self.emit(&format!("\nChart written to {}\n", path.display()));
    }

    fn analysis(&mut self, window: &AnalysisWindow) {
        self.emit(&format_analysis(window));
    }
}
