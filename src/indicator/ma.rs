use error_stack::{Report, bail};

use crate::error::IndicatorError;

/// Trailing simple moving average.
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        Ok(Self { period })
    }

    /// Mean of the trailing `period` values at every index.
    ///
    /// The output is aligned with `values`: the first `period - 1` entries
    /// are `None` because their window is incomplete.
    pub fn rolling(&self, values: &[f64]) -> Vec<Option<f64>> {
        let warmup = (self.period - 1).min(values.len());
        let mut out = vec![None; warmup];
        out.extend(
            values
                .windows(self.period)
                .map(|w| Some(w.iter().sum::<f64>() / self.period as f64)),
        );
        out
    }
}
