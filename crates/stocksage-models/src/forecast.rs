use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of model output: fitted or projected value with its uncertainty band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    /// De-seasonalized level estimate.
    pub trend: f64,
    /// Point estimate (trend + seasonal components).
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// Forecast for a symbol covering the historical fit followed by the future horizon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Forecast {
    pub symbol: String,
    pub points: Vec<ForecastPoint>,
    /// Number of leading points that correspond to observed dates.
    pub history_len: usize,
    pub horizon_days: u32,
}

impl Forecast {
    pub fn history(&self) -> &[ForecastPoint] {
        &self.points[..self.history_len.min(self.points.len())]
    }

    pub fn future(&self) -> &[ForecastPoint] {
        &self.points[self.history_len.min(self.points.len())..]
    }

    /// Projected change in percent from the last fitted value to the end of the horizon.
    pub fn projected_change_pct(&self) -> Option<f64> {
        let last_fit = self.history().last()?;
        let end = self.future().last()?;
        if last_fit.yhat == 0.0 {
            return None;
        }
        Some((end.yhat - last_fit.yhat) / last_fit.yhat * 100.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

/// A forecast row annotated with its trade signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalRow {
    pub date: NaiveDate,
    pub trend: f64,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub signal: Signal,
}

/// Error metrics comparing predictions against actual prices.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    pub mse: f64,
    pub rmse: f64,
    /// Mean absolute percentage error, in percent.
    pub mape: f64,
}
