use stocksage_models::{ForecastPoint, Signal, SignalRow};

/// Minimum margin of the point estimate over the lower band for a BUY.
pub const BUY_MARGIN: f64 = 1.02;
/// Maximum ratio of the point estimate to the upper band for a SELL.
pub const SELL_MARGIN: f64 = 0.98;

/// Direction of the trend at each row: `+1` when it rose from the previous
/// row, `-1` otherwise (a flat step counts as falling).
///
/// The first row has no predecessor. It takes the direction of the step
/// that follows it, or `+1` when it is the only row.
pub fn trend_directions(points: &[ForecastPoint]) -> Vec<i8> {
    let mut directions: Vec<i8> = Vec::with_capacity(points.len());
    if points.is_empty() {
        return directions;
    }
    directions.push(1);
    for pair in points.windows(2) {
        directions.push(if pair[1].trend > pair[0].trend { 1 } else { -1 });
    }
    if directions.len() > 1 {
        directions[0] = directions[1];
    }
    directions
}

fn classify(direction: i8, point: &ForecastPoint) -> Signal {
    if direction == 1 && point.yhat > point.yhat_lower * BUY_MARGIN {
        Signal::Buy
    } else if direction == -1 && point.yhat < point.yhat_upper * SELL_MARGIN {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

/// Annotate each forecast row with a BUY/SELL/HOLD signal.
pub fn derive_signals(points: &[ForecastPoint]) -> Vec<SignalRow> {
    trend_directions(points)
        .into_iter()
        .zip(points)
        .map(|(direction, point)| SignalRow {
            date: point.date,
            trend: point.trend,
            yhat: point.yhat,
            yhat_lower: point.yhat_lower,
            yhat_upper: point.yhat_upper,
            signal: classify(direction, point),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point(day: u32, trend: f64, yhat: f64, lower: f64, upper: f64) -> ForecastPoint {
        ForecastPoint {
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            trend,
            yhat,
            yhat_lower: lower,
            yhat_upper: upper,
        }
    }

    #[test]
    fn rising_trend_with_margin_is_buy() {
        let rows = derive_signals(&[
            point(1, 100.0, 100.0, 90.0, 110.0),
            point(2, 101.0, 101.0, 91.0, 111.0),
        ]);
        assert!(rows.iter().all(|r| r.signal == Signal::Buy));
    }

    #[test]
    fn falling_trend_with_margin_is_sell() {
        let rows = derive_signals(&[
            point(1, 100.0, 100.0, 90.0, 110.0),
            point(2, 99.0, 99.0, 89.0, 109.0),
            point(3, 98.0, 98.0, 88.0, 108.0),
        ]);
        assert!(rows.iter().all(|r| r.signal == Signal::Sell));
    }

    #[test]
    fn flat_step_counts_as_falling() {
        assert_eq!(
            trend_directions(&[
                point(1, 100.0, 100.0, 90.0, 110.0),
                point(2, 101.0, 100.0, 90.0, 110.0),
                point(3, 101.0, 100.0, 90.0, 110.0),
            ]),
            vec![1, 1, -1]
        );
    }

    #[test]
    fn narrow_band_is_hold() {
        // Rising, but yhat is within 2% of the lower bound.
        let rows = derive_signals(&[
            point(1, 100.0, 100.0, 99.0, 101.0),
            point(2, 101.0, 101.0, 100.0, 102.0),
        ]);
        assert!(rows.iter().all(|r| r.signal == Signal::Hold));
    }

    #[test]
    fn single_row_is_treated_as_rising() {
        let rows = derive_signals(&[point(1, 100.0, 100.0, 90.0, 110.0)]);
        assert_eq!(rows[0].signal, Signal::Buy);
        assert_eq!(trend_directions(&[]), Vec::<i8>::new());
    }
}
