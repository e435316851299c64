use chrono::{Days, NaiveDate};
use nalgebra::{DMatrix, DVector};
use stocksage_models::{Forecast, ForecastConfig, ForecastPoint, PriceSeries};
use tracing::debug;

use crate::error::ForecastError;
use crate::features::{FeatureLayout, Seasonality};
use crate::quantile::interval_multiplier;

/// Floor for the noise variance estimate, in scaled units.
const MIN_NOISE_VARIANCE: f64 = 1e-12;
/// Added to every diagonal entry of the normal equations.
const JITTER: f64 = 1e-10;

/// Additive trend + seasonality regression on closing prices.
///
/// `y(t) = trend(t) + Σ seasonal(t)` where the trend is piecewise linear with
/// hinges at fixed changepoints and each seasonality is a Fourier series.
/// Coefficients are estimated by ridge-regularized least squares: changepoint
/// rate changes and Fourier coefficients are shrunk according to their prior
/// scales, intercept and base slope are not.
#[derive(Debug, Clone)]
pub struct ForecastModel {
    config: ForecastConfig,
}

impl ForecastModel {
    pub fn new(config: ForecastConfig) -> Result<Self, ForecastError> {
        if !(config.interval_width > 0.0 && config.interval_width < 1.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "interval_width must be in (0, 1), got {}",
                config.interval_width
            )));
        }
        if !(config.changepoint_range > 0.0 && config.changepoint_range <= 1.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "changepoint_range must be in (0, 1], got {}",
                config.changepoint_range
            )));
        }
        if config.changepoint_prior_scale <= 0.0 || config.seasonality_prior_scale <= 0.0 {
            return Err(ForecastError::InvalidConfig(
                "prior scales must be positive".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    fn seasonalities(&self) -> Vec<Seasonality> {
        let mut out = Vec::new();
        if self.config.yearly_seasonality {
            out.push(Seasonality::YEARLY);
        }
        if self.config.weekly_seasonality {
            out.push(Seasonality::WEEKLY);
        }
        if self.config.daily_seasonality {
            out.push(Seasonality::DAILY);
        }
        out
    }

    /// Fit the model to the closing prices of `series`.
    pub fn fit(&self, series: &PriceSeries) -> Result<FittedModel, ForecastError> {
        let symbol = series.symbol().to_string();
        let n = series.len();
        if n < 2 {
            return Err(ForecastError::InsufficientData {
                symbol,
                required: 2,
                actual: n,
                unit: "observations",
            });
        }

        let dates = series.dates();
        let origin = dates[0];
        let t_days: Vec<f64> = dates
            .iter()
            .map(|d| (*d - origin).num_days() as f64)
            .collect();
        let span = (dates[n - 1] - origin).num_days().max(0) as usize;

        let seasonalities = self.seasonalities();
        if let Some(longest) = seasonalities
            .iter()
            .map(|s| s.period_days.ceil() as usize)
            .max()
        {
            if span < longest {
                return Err(ForecastError::InsufficientData {
                    symbol,
                    required: longest,
                    actual: span,
                    unit: "days of history",
                });
            }
        }

        let closes = series.closes();
        let y_scale = closes
            .iter()
            .fold(0.0_f64, |acc, y| acc.max(y.abs()))
            .max(f64::MIN_POSITIVE);
        let y: DVector<f64> = DVector::from_iterator(n, closes.iter().map(|v| v / y_scale));

        let layout = FeatureLayout::new(
            &t_days,
            self.config.n_changepoints,
            self.config.changepoint_range,
            &seasonalities,
        );
        let p = layout.width();
        let mut x = DMatrix::<f64>::zeros(n, p);
        let mut row = vec![0.0; p];
        for (i, &t) in t_days.iter().enumerate() {
            layout.fill_row(t, &mut row);
            for (j, v) in row.iter().enumerate() {
                x[(i, j)] = *v;
            }
        }

        let noise = noise_variance(y.as_slice());
        let cp_penalty = noise / self.config.changepoint_prior_scale.powi(2);
        let seasonal_penalty = noise / self.config.seasonality_prior_scale.powi(2);

        let xt = x.transpose();
        let mut xtx = &xt * &x;
        for j in 0..p {
            let penalty = if j < 2 {
                0.0
            } else if j < layout.trend_width() {
                cp_penalty
            } else {
                seasonal_penalty
            };
            xtx[(j, j)] += penalty + JITTER;
        }
        let xty = &xt * &y;

        let beta = match xtx.clone().cholesky() {
            Some(chol) => chol.solve(&xty),
            None => {
                let inverse = xtx
                    .try_inverse()
                    .ok_or_else(|| ForecastError::Singular(symbol.clone()))?;
                inverse * xty
            }
        };

        let fitted = &x * &beta;
        let sse: f64 = (&y - &fitted).iter().map(|r| r * r).sum();
        let sigma = (sse / n as f64).sqrt() * y_scale;

        debug!(
            symbol = %symbol,
            observations = n,
            changepoints = layout.changepoint_count(),
            seasonal_terms = layout.seasonal_terms(),
            sigma,
            "Fitted forecast model"
        );

        Ok(FittedModel {
            symbol,
            origin,
            history_dates: dates,
            layout,
            beta,
            y_scale,
            sigma,
            z: interval_multiplier(self.config.interval_width),
        })
    }
}

/// Half the variance of first differences: a noise estimate that ignores
/// slowly varying trend.
fn noise_variance(y: &[f64]) -> f64 {
    if y.len() < 3 {
        return MIN_NOISE_VARIANCE;
    }
    let diffs: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();
    let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    let var = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (diffs.len() - 1) as f64;
    (var / 2.0).max(MIN_NOISE_VARIANCE)
}

/// A fitted model, ready to produce forecasts.
#[derive(Debug, Clone)]
pub struct FittedModel {
    symbol: String,
    origin: NaiveDate,
    history_dates: Vec<NaiveDate>,
    layout: FeatureLayout,
    beta: DVector<f64>,
    y_scale: f64,
    sigma: f64,
    z: f64,
}

impl FittedModel {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn last_date(&self) -> NaiveDate {
        self.history_dates
            .last()
            .copied()
            .unwrap_or(self.origin)
    }

    /// Root mean squared in-sample residual, in price units.
    pub fn residual_sigma(&self) -> f64 {
        self.sigma
    }

    /// Fitted values for every observed date followed by `horizon_days`
    /// consecutive calendar days after the last observation.
    pub fn forecast(&self, horizon_days: u32) -> Forecast {
        let history_len = self.history_dates.len();
        let last = self.last_date();
        let future = (1..=u64::from(horizon_days)).filter_map(|h| last.checked_add_days(Days::new(h)));

        let mut points = Vec::with_capacity(history_len + horizon_days as usize);
        for date in self.history_dates.iter().copied() {
            points.push(self.point(date, 0.0));
        }
        for date in future {
            let h = (date - last).num_days() as f64;
            points.push(self.point(date, h));
        }

        Forecast {
            symbol: self.symbol.clone(),
            points,
            history_len,
            horizon_days,
        }
    }

    fn point(&self, date: NaiveDate, days_ahead: f64) -> ForecastPoint {
        let t = (date - self.origin).num_days() as f64;
        let mut row = vec![0.0; self.layout.width()];
        self.layout.fill_row(t, &mut row);

        let trend_width = self.layout.trend_width();
        let mut trend = 0.0;
        let mut seasonal = 0.0;
        for (j, (x, b)) in row.iter().zip(self.beta.iter()).enumerate() {
            if j < trend_width {
                trend += x * b;
            } else {
                seasonal += x * b;
            }
        }
        let trend = trend * self.y_scale;
        let yhat = trend + seasonal * self.y_scale;

        let n = self.history_dates.len() as f64;
        let half_width = self.z * self.sigma * (1.0 + days_ahead / n).sqrt();

        ForecastPoint {
            date,
            trend,
            yhat,
            yhat_lower: yhat - half_width,
            yhat_upper: yhat + half_width,
        }
    }
}
