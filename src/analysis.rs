use chrono::NaiveDate;
use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::DerivativeAnalysis;
use crate::model::{QuoteSeries, Trend};

/// Number of most recent sessions shown in the chart and report.
pub const ANALYSIS_SESSIONS: usize = 30;
/// Number of sessions listed in the per-day breakdown.
pub const RECENT_SESSIONS: usize = 5;

/// Descriptive statistics of the derivative shown in the chart.
///
/// `std_dev` is the population standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivativeStats {
    pub mean: f64,
    pub std_dev: f64,
    pub max: f64,
    pub min: f64,
}

impl DerivativeStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        Some(Self {
            mean,
            std_dev: variance.sqrt(),
            max,
            min,
        })
    }
}

/// One row of the recent-sessions breakdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionChange {
    pub date: NaiveDate,
    pub price: f64,
    pub change: f64,
}

/// The most recent sessions together with their derivative analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisWindow {
    pub series: QuoteSeries,
    pub analysis: DerivativeAnalysis,
}

impl AnalysisWindow {
    /// Keep the last `sessions` quotes and differentiate that slice.
    pub fn latest(series: &QuoteSeries, sessions: usize) -> Result<Self, Report<IndicatorError>> {
        let series = series.tail(sessions);
        let analysis = DerivativeAnalysis::compute(&series.close_prices())?;
        Ok(Self { series, analysis })
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.series.first()?.date, self.series.last()?.date))
    }

    pub fn latest_price(&self) -> Option<f64> {
        self.series.last().map(|q| q.close)
    }

    /// (min, max) closing price within the window.
    pub fn price_range(&self) -> Option<(f64, f64)> {
        let prices = self.series.close_prices();
        if prices.is_empty() {
            return None;
        }
        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }

    pub fn trend(&self) -> Option<Trend> {
        self.analysis.latest().map(Trend::from_derivative)
    }

    pub fn stats(&self) -> Option<DerivativeStats> {
        DerivativeStats::from_values(&self.analysis.derivative)
    }

    /// Up to `count` sessions, newest first, with the derivative as change.
    pub fn recent(&self, count: usize) -> Vec<SessionChange> {
        self.series
            .quotes()
            .iter()
            .zip(&self.analysis.derivative)
            .rev()
            .take(count)
            .map(|(quote, &change)| SessionChange {
                date: quote.date,
                price: quote.close,
                change,
            })
            .collect()
    }
}
