pub mod derivative;
pub mod ma;

use error_stack::Report;

use crate::error::IndicatorError;
use derivative::gradient;
use ma::Sma;

/// Trailing window used to smooth the derivative.
pub const SMOOTHING_PERIOD: usize = 5;

/// Derivative of a price sequence plus its rolling mean.
///
/// Both series are index-aligned with the input prices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivativeAnalysis {
    pub derivative: Vec<f64>,
    pub smoothed: Vec<Option<f64>>,
}

impl DerivativeAnalysis {
    pub fn compute(prices: &[f64]) -> Result<Self, Report<IndicatorError>> {
        let derivative = gradient(prices);
        let smoothed = Sma::new(SMOOTHING_PERIOD)?.rolling(&derivative);
        Ok(Self {
            derivative,
            smoothed,
        })
    }

    pub fn latest(&self) -> Option<f64> {
        self.derivative.last().copied()
    }
}
