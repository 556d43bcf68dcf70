use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Closing price for one trading session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub date: NaiveDate,
    pub close: f64,
}

/// Quotes ordered by strictly increasing date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteSeries {
    quotes: Vec<Quote>,
}

impl QuoteSeries {
    /// Build a series from quotes in any order.
    ///
    /// Quotes are sorted by date; when two share a date the later one in the
    /// input wins, since providers append the in-progress session last.
    pub fn new(mut quotes: Vec<Quote>) -> Self {
        quotes.reverse();
        // stable sort keeps the (reversed) input order within equal dates
        quotes.sort_by_key(|q| q.date);
        quotes.dedup_by_key(|q| q.date);
        Self { quotes }
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn first(&self) -> Option<&Quote> {
        self.quotes.first()
    }

    pub fn last(&self) -> Option<&Quote> {
        self.quotes.last()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.quotes.iter().map(|q| q.date).collect()
    }

    pub fn close_prices(&self) -> Vec<f64> {
        self.quotes.iter().map(|q| q.close).collect()
    }

    /// The most recent `count` quotes (or all of them if fewer exist).
    pub fn tail(&self, count: usize) -> QuoteSeries {
        let start = self.quotes.len().saturating_sub(count);
        Self {
            quotes: self.quotes[start..].to_vec(),
        }
    }
}

/// Closed date range requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FetchWindow {
    /// Window of `days` calendar days ending at `end`.
    pub fn trailing(end: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: end - Duration::days(days),
            end,
        }
    }
}

impl fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.date_naive(),
            self.end.date_naive()
        )
    }
}

/// Direction of the latest price derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Rising,
    Falling,
}

impl Trend {
    /// A flat (zero) derivative counts as falling.
    pub fn from_derivative(value: f64) -> Self {
        if value > 0.0 {
            Self::Rising
        } else {
            Self::Falling
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rising => write!(f, "rising"),
            Self::Falling => write!(f, "falling"),
        }
    }
}
