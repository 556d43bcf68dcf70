pub mod yahoo;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::FetchError;
use crate::frame::PriceFrame;
use crate::model::FetchWindow;

/// Instrument analyzed by the program.
pub const SYMBOL: &str = "EURUSD=X";
/// Human-readable name of [`SYMBOL`].
pub const PAIR_LABEL: &str = "EUR/USD";
/// Calendar days requested from the provider.
pub const LOOKBACK_DAYS: i64 = 40;

/// Source of daily price bars.
///
/// Uses `BoxFuture` instead of `async fn` in trait to stay object-safe.
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch one row per trading day within `window`.
    ///
    /// An empty response is reported as [`FetchError::NoDataAvailable`];
    /// every other fault as [`FetchError::FetchFailure`].
    fn fetch_daily(
        &self,
        symbol: &str,
        window: FetchWindow,
    ) -> BoxFuture<'_, Result<PriceFrame, Report<FetchError>>>;
}
