use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

#[derive(Debug, Display, Error)]
pub enum FetchError {
    #[display("no data available for {symbol}")]
    NoDataAvailable { symbol: String },
    #[display("failed to fetch quotes from {provider}")]
    FetchFailure { provider: String },
}

#[derive(Debug, Display, Error)]
pub enum FrameError {
    #[display("column {column} has {found} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
    #[display("no closing-price column among [{columns}]")]
    MissingClose { columns: String },
}

#[derive(Debug, Display, Error)]
pub enum IndicatorError {
    #[display("invalid parameter: {name}")]
    InvalidParameter { name: String },
}

#[derive(Debug, Display, Error)]
pub enum ChartError {
    #[display("failed to render chart: {stage}")]
    Render { stage: String },
}
