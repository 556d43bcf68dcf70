use std::fmt;

use chrono::{DateTime, NaiveDate};
use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::FetchError;
use crate::frame::{Column, ColumnLabel, PriceFrame};
use crate::model::FetchWindow;
use crate::provider::MarketDataProvider;

const PROVIDER: &str = "yahoo-finance";
const DAILY_INTERVAL: &str = "1d";

fn failure() -> FetchError {
    FetchError::FetchFailure {
        provider: PROVIDER.into(),
    }
}

/// Yahoo Finance v8 chart endpoint.
pub struct YahooFinance {
    client: reqwest::Client,
    base_url: String,
}

impl YahooFinance {
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, Report<FetchError>> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .change_context(failure())
            .attach("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }
}

impl MarketDataProvider for YahooFinance {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn fetch_daily(
        &self,
        symbol: &str,
        window: FetchWindow,
    ) -> BoxFuture<'_, Result<PriceFrame, Report<FetchError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
            let period1 = window.start.timestamp().to_string();
            let period2 = window.end.timestamp().to_string();
            let params = [
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", DAILY_INTERVAL),
                ("includeAdjustedClose", "true"),
            ];

            debug!(url = %url, %window, "requesting daily chart");

            let response = self
                .client
                .get(&url)
                .query(&params)
                .send()
                .await
                .change_context(failure())
                .attach_with(|| format!("url: {url}"))?;

            let status = response.status();
            let body = response.text().await.change_context(failure())?;

            if !status.is_success() {
                let mut report = Report::new(failure()).attach(format!("HTTP status: {status}"));
                if let Some(err) = serde_json::from_str::<ChartEnvelope>(&body)
                    .ok()
                    .and_then(|env| env.chart.error)
                {
                    report = report.attach(err.to_string());
                }
                return Err(report);
            }

            let envelope: ChartEnvelope = serde_json::from_str(&body)
                .change_context(failure())
                .attach("response is not a chart document")?;
            let frame = envelope.into_frame(&symbol)?;

            let (rows, columns) = frame.shape();
            info!(symbol = %symbol, rows, columns, "yahoo chart fetch complete");

            Ok(frame)
        })
    }
}

// ── Response types ────────────────────────────────────────────────────────────

/// `{ "chart": { "result": [...], "error": null } }`
#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartApiError {
    code: String,
    description: String,
}

impl fmt::Display for ChartApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider error {}: {}", self.code, self.description)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    /// Session open times (unix seconds); absent when the range is empty
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    symbol: Option<String>,
    /// Exchange offset from UTC in seconds
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
    #[serde(default)]
    adjclose: Vec<AdjCloseBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseBlock {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

impl ChartEnvelope {
    fn into_frame(self, requested: &str) -> Result<PriceFrame, Report<FetchError>> {
        if let Some(err) = self.chart.error {
            return Err(Report::new(failure()).attach(err.to_string()));
        }

        let no_data = || FetchError::NoDataAvailable {
            symbol: requested.to_owned(),
        };

        let result = self
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| Report::new(no_data()))?;

        if result.timestamp.is_empty() {
            return Err(Report::new(no_data()));
        }

        let offset = result.meta.gmtoffset;
        let dates = result
            .timestamp
            .iter()
            .map(|&ts| session_date(ts, offset))
            .collect::<Result<Vec<_>, _>>()?;

        // Responses that name the instrument get a two-level namespace
        let label = |field: &str| match &result.meta.symbol {
            Some(symbol) => ColumnLabel::nested(field, symbol.as_str()),
            None => ColumnLabel::flat(field),
        };

        let Indicators { quote, adjclose } = result.indicators;
        let quote = quote
            .into_iter()
            .next()
            .ok_or_else(|| Report::new(failure()).attach("response has no quote block"))?;
        let adjclose = adjclose
            .into_iter()
            .next()
            .map(|block| block.adjclose)
            .unwrap_or_default();

        let columns = [
            ("Open", quote.open),
            ("High", quote.high),
            ("Low", quote.low),
            ("Close", quote.close),
            ("Adj Close", adjclose),
            ("Volume", quote.volume),
        ]
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(field, values)| Column::new(label(field), values))
        .collect();

        PriceFrame::new(dates, columns).change_context(failure())
    }
}

/// Calendar date of a session in the exchange's local time.
fn session_date(timestamp: i64, gmtoffset: i64) -> Result<NaiveDate, Report<FetchError>> {
    DateTime::from_timestamp(timestamp + gmtoffset, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| Report::new(failure()).attach(format!("invalid timestamp: {timestamp}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{LOOKBACK_DAYS, SYMBOL};
    use chrono::Utc;

    const CHART_JSON: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "currency": "USD", "symbol": "EURUSD=X", "gmtoffset": 3600 },
                "timestamp": [1714518000, 1714604400, 1714690800, 1715036400],
                "indicators": {
                    "quote": [{
                        "open":   [1.0665, 1.0713, 1.0727, 1.0763],
                        "high":   [1.0712, 1.0720, 1.0759, 1.0790],
                        "low":    [1.0650, 1.0681, 1.0707, 1.0750],
                        "close":  [1.0665, 1.0713, null,   1.0763],
                        "volume": [0, 0, 0, 0]
                    }],
                    "adjclose": [{ "adjclose": [1.0665, 1.0713, null, 1.0763] }]
                }
            }],
            "error": null
        }
    }"#;

    fn parse(json: &str) -> Result<PriceFrame, Report<FetchError>> {
        let envelope: ChartEnvelope = serde_json::from_str(json).unwrap();
        envelope.into_frame(SYMBOL)
    }

    #[test]
    fn chart_parses_into_two_level_frame() {
        let frame = parse(CHART_JSON).unwrap();
        assert_eq!(frame.shape(), (4, 6));
        assert!(frame.is_hierarchical());
        assert_eq!(frame.labels()[0], "Open_EURUSD=X");

        let close = frame.locate_close().unwrap();
        assert_eq!(close.label(), "Close_EURUSD=X");
        assert_eq!(close.missing(), 1);

        let series = close.quote_series();
        assert_eq!(series.close_prices(), vec![1.0665, 1.0713, 1.0763]);
        assert_eq!(
            series.first().unwrap().date,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
        assert_eq!(
            series.last().unwrap().date,
            NaiveDate::from_ymd_opt(2024, 5, 7).unwrap()
        );
    }

    #[test]
    fn chart_without_symbol_is_flat() {
        let json = r#"{"chart":{"result":[{
            "meta": {},
            "timestamp": [1714604400],
            "indicators": { "quote": [{ "close": [1.07] }] }
        }],"error":null}}"#;
        let frame = parse(json).unwrap();
        assert!(!frame.is_hierarchical());
        assert_eq!(frame.labels(), vec!["Close".to_owned()]);
        assert_eq!(
            frame.locate_close().unwrap().quote_series().dates(),
            vec![NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()]
        );
    }

    #[test]
    fn empty_range_is_no_data() {
        let json = r#"{"chart":{"result":[{
            "meta": { "symbol": "EURUSD=X" },
            "indicators": { "quote": [{}] }
        }],"error":null}}"#;
        let err = parse(json).unwrap_err();
        assert!(matches!(
            err.current_context(),
            FetchError::NoDataAvailable { symbol } if symbol == SYMBOL
        ));
    }

    #[test]
    fn null_result_is_no_data() {
        let err = parse(r#"{"chart":{"result":null,"error":null}}"#).unwrap_err();
        assert!(matches!(err.current_context(), FetchError::NoDataAvailable { .. }));
    }

    #[test]
    fn error_payload_is_fetch_failure() {
        let json = r#"{"chart":{"result":null,"error":{
            "code": "Not Found",
            "description": "No data found, symbol may be delisted"
        }}}"#;
        let err = parse(json).unwrap_err();
        assert!(matches!(err.current_context(), FetchError::FetchFailure { .. }));
    }

    #[test]
    fn ragged_columns_are_fetch_failure() {
        let json = r#"{"chart":{"result":[{
            "meta": {},
            "timestamp": [1714604400, 1714690800],
            "indicators": { "quote": [{ "close": [1.07] }] }
        }],"error":null}}"#;
        let err = parse(json).unwrap_err();
        assert!(matches!(err.current_context(), FetchError::FetchFailure { .. }));
    }

    #[test]
    fn missing_quote_block_is_fetch_failure() {
        let json = r#"{"chart":{"result":[{
            "meta": {},
            "timestamp": [1714604400],
            "indicators": {}
        }],"error":null}}"#;
        let err = parse(json).unwrap_err();
        assert!(matches!(err.current_context(), FetchError::FetchFailure { .. }));
    }

    #[test]
    fn session_date_applies_offset() {
        assert_eq!(
            session_date(1714604400, 0).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
        assert_eq!(
            session_date(1714604400, 3600).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
        );
    }

    /// Integration test: requires network access. Run with `cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn integration_fetch_daily() {
        let provider =
            YahooFinance::new("https://query1.finance.yahoo.com", "Mozilla/5.0").unwrap();
        let window = FetchWindow::trailing(Utc::now(), LOOKBACK_DAYS);
        let frame = provider.fetch_daily(SYMBOL, window).await.unwrap();
        assert!(!frame.is_empty());
        assert!(frame.locate_close().is_ok());
    }
}
