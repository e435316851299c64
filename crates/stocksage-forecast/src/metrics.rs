use stocksage_models::PerformanceMetrics;

use crate::error::ForecastError;

/// Mean squared error, its root, and mean absolute percentage error of
/// `predicted` against `actual`.
///
/// MAPE divides by each actual value, so a zero anywhere in `actual` is an
/// error rather than an infinite or NaN result.
pub fn performance_metrics(
    actual: &[f64],
    predicted: &[f64],
) -> Result<PerformanceMetrics, ForecastError> {
    if actual.len() != predicted.len() {
        return Err(ForecastError::LengthMismatch {
            actual: actual.len(),
            predicted: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Err(ForecastError::EmptyInput);
    }
    if let Some(index) = actual.iter().position(|a| *a == 0.0) {
        return Err(ForecastError::DivisionByZero { index });
    }

    let n = actual.len() as f64;
    let mut squared = 0.0;
    let mut pct = 0.0;
    for (a, p) in actual.iter().zip(predicted) {
        let err = a - p;
        squared += err * err;
        pct += (err / a).abs();
    }
    let mse = squared / n;

    Ok(PerformanceMetrics {
        mse,
        rmse: mse.sqrt(),
        mape: pct / n * 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sequences_score_zero() {
        let values = [101.5, 99.0, 120.25];
        let m = performance_metrics(&values, &values).unwrap();
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mape, 0.0);
    }

    #[test]
    fn known_values() {
        let m = performance_metrics(&[100.0, 200.0], &[110.0, 190.0]).unwrap();
        assert!((m.mse - 100.0).abs() < 1e-12);
        assert!((m.rmse - 10.0).abs() < 1e-12);
        assert!((m.mape - 7.5).abs() < 1e-12);
    }

    #[test]
    fn zero_actual_is_rejected() {
        assert_eq!(
            performance_metrics(&[1.0, 0.0], &[1.0, 1.0]),
            Err(ForecastError::DivisionByZero { index: 1 })
        );
    }

    #[test]
    fn mismatched_and_empty_inputs() {
        assert_eq!(
            performance_metrics(&[1.0], &[1.0, 2.0]),
            Err(ForecastError::LengthMismatch {
                actual: 1,
                predicted: 2
            })
        );
        assert_eq!(performance_metrics(&[], &[]), Err(ForecastError::EmptyInput));
    }
}
