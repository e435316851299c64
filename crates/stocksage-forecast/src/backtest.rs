use std::collections::HashMap;

use stocksage_models::{PerformanceMetrics, PriceSeries};
use tracing::info;

use crate::error::ForecastError;
use crate::metrics::performance_metrics;
use crate::model::ForecastModel;

/// Score the model on the last `holdout` observations of `series`.
///
/// The model is fitted on the preceding observations, forecast forward to
/// the final held-out date, and compared with the actual closes on the
/// held-out dates.
pub fn backtest(
    model: &ForecastModel,
    series: &PriceSeries,
    holdout: usize,
) -> Result<PerformanceMetrics, ForecastError> {
    if holdout == 0 {
        return Err(ForecastError::EmptyInput);
    }
    if holdout >= series.len() {
        return Err(ForecastError::InsufficientData {
            symbol: series.symbol().to_string(),
            required: holdout + 2,
            actual: series.len(),
            unit: "observations",
        });
    }

    let train_len = series.len() - holdout;
    let train = series.truncated(train_len);
    let fitted = model.fit(&train)?;

    let held_out = &series.candles()[train_len..];
    let horizon = held_out
        .last()
        .map(|c| (c.date() - fitted.last_date()).num_days())
        .unwrap_or(0)
        .max(0) as u32;
    let forecast = fitted.forecast(horizon);

    let by_date: HashMap<_, _> = forecast
        .future()
        .iter()
        .map(|p| (p.date, p.yhat))
        .collect();

    let mut actual = Vec::with_capacity(held_out.len());
    let mut predicted = Vec::with_capacity(held_out.len());
    for candle in held_out {
        if let Some(yhat) = by_date.get(&candle.date()) {
            actual.push(candle.close);
            predicted.push(*yhat);
        }
    }

    let metrics = performance_metrics(&actual, &predicted)?;
    info!(
        symbol = series.symbol(),
        holdout,
        rmse = metrics.rmse,
        mape = metrics.mape,
        "Backtest complete"
    );
    Ok(metrics)
}
