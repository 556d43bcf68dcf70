pub mod terminal;

use std::path::Path;

use crate::analysis::AnalysisWindow;
use crate::error::FetchError;
use crate::frame::{CloseColumn, PriceFrame};
use crate::model::FetchWindow;

/// Generic steps printed after a failed fetch.
pub const TROUBLESHOOTING: &[&str] = &[
    "Check your internet connection",
    "Check that the market-data provider is reachable from this machine",
    "Run the program again",
    "If the problem persists the service may be temporarily unavailable",
];

/// Sink for everything the run tells the user.
///
/// Pipeline stages stay pure; the entry routine forwards their results here.
pub trait Reporter {
    fn run_started(&mut self, pair: &str);

    fn fetch_started(&mut self, symbol: &str, window: &FetchWindow);

    /// Layout of the provider response and the closing-price column found in it.
    fn frame_received(&mut self, frame: &PriceFrame, close: &CloseColumn<'_>);

    fn fetch_failed(&mut self, error: &FetchError);

    /// Headline numbers and the recent-sessions breakdown.
    fn summary(&mut self, window: &AnalysisWindow);

    fn no_data_to_plot(&mut self);

    fn chart_written(&mut self, path: &Path);

    /// Closing report printed once the chart has been produced.
    fn analysis(&mut self, window: &AnalysisWindow);
}
