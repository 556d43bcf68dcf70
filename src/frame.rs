use std::fmt;

use chrono::NaiveDate;
use error_stack::{Report, bail};

use crate::error::FrameError;
use crate::model::{Quote, QuoteSeries};

const CLOSE_NEEDLE: &str = "close";

/// Label of a provider column.
///
/// Providers return either a flat namespace (`Close`) or a two-level one
/// keyed by field and instrument (`Close` / `EURUSD=X`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnLabel {
    Flat(String),
    Nested { field: String, symbol: String },
}

impl ColumnLabel {
    pub fn flat(field: impl Into<String>) -> Self {
        Self::Flat(field.into())
    }

    pub fn nested(field: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::Nested {
            field: field.into(),
            symbol: symbol.into(),
        }
    }

    /// Single-level form; two-level labels are joined with `_`.
    pub fn flattened(&self) -> String {
        match self {
            Self::Flat(field) => field.trim().to_owned(),
            Self::Nested { field, symbol } => format!("{field}_{symbol}").trim().to_owned(),
        }
    }
}

impl fmt::Display for ColumnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.flattened())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub label: ColumnLabel,
    pub values: Vec<Option<f64>>,
}

impl Column {
    pub fn new(label: ColumnLabel, values: Vec<Option<f64>>) -> Self {
        Self { label, values }
    }
}

/// Provider response normalized into a date index plus labelled columns.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceFrame {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl PriceFrame {
    /// Every column must hold exactly one value per date.
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<Column>) -> Result<Self, Report<FrameError>> {
        for column in &columns {
            if column.values.len() != dates.len() {
                bail!(FrameError::LengthMismatch {
                    column: column.label.flattened(),
                    expected: dates.len(),
                    found: column.values.len(),
                });
            }
        }
        Ok(Self { dates, columns })
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.dates.len(), self.columns.len())
    }

    pub fn is_hierarchical(&self) -> bool {
        self.columns
            .iter()
            .any(|c| matches!(c.label, ColumnLabel::Nested { .. }))
    }

    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.label.flattened()).collect()
    }

    /// Find the closing-price column regardless of namespace shape.
    ///
    /// The first column whose flattened label contains `close`
    /// (case-insensitive) wins, so `Close` is preferred over `Adj Close`
    /// when providers list it first.
    pub fn locate_close(&self) -> Result<CloseColumn<'_>, Report<FrameError>> {
        self.columns
            .iter()
            .position(|c| c.label.flattened().to_lowercase().contains(CLOSE_NEEDLE))
            .map(|index| CloseColumn { frame: self, index })
            .ok_or_else(|| {
                Report::new(FrameError::MissingClose {
                    columns: self.labels().join(", "),
                })
            })
    }
}

/// Accessor for the closing-price column of a [`PriceFrame`].
#[derive(Debug, Clone, Copy)]
pub struct CloseColumn<'a> {
    frame: &'a PriceFrame,
    index: usize,
}

impl CloseColumn<'_> {
    pub fn label(&self) -> String {
        self.column().label.flattened()
    }

    pub fn get(&self, row: usize) -> Option<f64> {
        self.column().values.get(row).copied().flatten()
    }

    pub fn first(&self) -> Option<f64> {
        self.column().values.iter().find_map(|v| *v)
    }

    pub fn last(&self) -> Option<f64> {
        self.column().values.iter().rev().find_map(|v| *v)
    }

    /// Number of rows the provider left without a closing price.
    pub fn missing(&self) -> usize {
        self.column().values.iter().filter(|v| v.is_none()).count()
    }

    /// Closing prices paired with their dates; rows without a close are skipped.
    pub fn quote_series(&self) -> QuoteSeries {
        let quotes = self
            .frame
            .dates
            .iter()
            .enumerate()
            .filter_map(|(row, &date)| self.get(row).map(|close| Quote { date, close }))
            .collect();
        QuoteSeries::new(quotes)
    }

    fn column(&self) -> &Column {
        &self.frame.columns[self.index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(n: u32) -> Vec<NaiveDate> {
        (1..=n)
            .map(|d| NaiveDate::from_ymd_opt(2024, 5, d).unwrap())
            .collect()
    }

    fn ohlc_columns(label: impl Fn(&str) -> ColumnLabel, closes: Vec<Option<f64>>) -> Vec<Column> {
        let n = closes.len();
        vec![
            Column::new(label("Open"), vec![Some(1.0); n]),
            Column::new(label("High"), vec![Some(2.0); n]),
            Column::new(label("Low"), vec![Some(0.5); n]),
            Column::new(label("Close"), closes),
            Column::new(label("Volume"), vec![Some(0.0); n]),
        ]
    }

    #[test]
    fn nested_label_flattens_with_underscore() {
        let label = ColumnLabel::nested("Close", "EURUSD=X");
        assert_eq!(label.flattened(), "Close_EURUSD=X");
        assert_eq!(ColumnLabel::flat("Close").to_string(), "Close");
    }

    #[test]
    fn locates_close_in_flat_frame() {
        let frame = PriceFrame::new(
            dates(3),
            ohlc_columns(|f| ColumnLabel::flat(f), vec![Some(1.1), Some(1.2), Some(1.3)]),
        )
        .unwrap();
        assert!(!frame.is_hierarchical());
        let close = frame.locate_close().unwrap();
        assert_eq!(close.label(), "Close");
        assert_eq!(close.quote_series().close_prices(), vec![1.1, 1.2, 1.3]);
    }

    #[test]
    fn locates_close_in_two_level_frame() {
        let frame = PriceFrame::new(
            dates(2),
            ohlc_columns(|f| ColumnLabel::nested(f, "EURUSD=X"), vec![Some(1.08), Some(1.09)]),
        )
        .unwrap();
        assert!(frame.is_hierarchical());
        let close = frame.locate_close().unwrap();
        assert_eq!(close.label(), "Close_EURUSD=X");
        assert_eq!(close.first(), Some(1.08));
        assert_eq!(close.last(), Some(1.09));
    }

    #[test]
    fn close_match_is_case_insensitive() {
        let frame = PriceFrame::new(
            dates(1),
            vec![
                Column::new(ColumnLabel::flat("open"), vec![Some(1.0)]),
                Column::new(ColumnLabel::flat("adjclose"), vec![Some(1.05)]),
            ],
        )
        .unwrap();
        assert_eq!(frame.locate_close().unwrap().label(), "adjclose");
    }

    #[test]
    fn missing_close_column_is_an_error() {
        let frame = PriceFrame::new(
            dates(1),
            vec![Column::new(ColumnLabel::flat("Open"), vec![Some(1.0)])],
        )
        .unwrap();
        let err = frame.locate_close().unwrap_err();
        assert!(matches!(err.current_context(), FrameError::MissingClose { .. }));
    }

    #[test]
    fn mismatched_column_length_rejected() {
        let result = PriceFrame::new(
            dates(3),
            vec![Column::new(ColumnLabel::flat("Close"), vec![Some(1.0)])],
        );
        assert!(result.is_err());
    }

    #[test]
    fn null_closes_are_skipped() {
        let frame = PriceFrame::new(
            dates(4),
            ohlc_columns(|f| ColumnLabel::flat(f), vec![Some(1.1), None, Some(1.3), None]),
        )
        .unwrap();
        let close = frame.locate_close().unwrap();
        assert_eq!(close.missing(), 2);
        assert_eq!(close.get(1), None);
        assert_eq!(close.last(), Some(1.3));
        let series = close.quote_series();
        assert_eq!(series.len(), 2);
        assert_eq!(series.close_prices(), vec![1.1, 1.3]);
    }

    #[test]
    fn empty_frame_reports_shape() {
        let frame = PriceFrame::new(Vec::new(), ohlc_columns(|f| ColumnLabel::flat(f), Vec::new())).unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.shape(), (0, 5));
    }
}
