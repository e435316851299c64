use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SeriesError;

/// One daily OHLCV bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Candle {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    fn is_finite(&self) -> bool {
        self.open.is_finite() && self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }
}

/// Daily price history for a single symbol.
///
/// Candles are ordered by timestamp with at most one candle per calendar date.
/// The series cannot be modified after construction.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    candles: Vec<Candle>,
}

impl PriceSeries {
    /// Build a series from raw provider rows.
    ///
    /// Rows are sorted by timestamp; when two rows fall on the same date the
    /// later one wins. Rows with non-finite prices are rejected.
    pub fn new(symbol: impl Into<String>, mut candles: Vec<Candle>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        if let Some(bad) = candles.iter().find(|c| !c.is_finite()) {
            return Err(SeriesError::NonFinite {
                symbol,
                timestamp: bad.timestamp,
            });
        }

        candles.sort_by_key(|c| c.timestamp);

        let mut normalized: Vec<Candle> = Vec::with_capacity(candles.len());
        for candle in candles {
            match normalized.last_mut() {
                Some(last) if last.date() == candle.date() => *last = candle,
                _ => normalized.push(candle),
            }
        }

        Ok(Self {
            symbol,
            candles: normalized,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.candles.iter().map(Candle::date).collect()
    }

    /// A copy of the first `len` candles. Used to carve out training windows.
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            symbol: self.symbol.clone(),
            candles: self.candles[..len.min(self.candles.len())].to_vec(),
        }
    }

    /// Compact numeric digest used when describing the series to a model.
    pub fn summary(&self) -> Option<PriceSummary> {
        let first = self.first()?;
        let last = self.last()?;
        let high = self
            .candles
            .iter()
            .map(|c| c.high)
            .fold(f64::NEG_INFINITY, f64::max);
        let low = self
            .candles
            .iter()
            .map(|c| c.low)
            .fold(f64::INFINITY, f64::min);
        let avg_volume =
            self.candles.iter().map(|c| c.volume as f64).sum::<f64>() / self.candles.len() as f64;
        let change_pct = if first.close != 0.0 {
            (last.close - first.close) / first.close * 100.0
        } else {
            0.0
        };

        Some(PriceSummary {
            symbol: self.symbol.clone(),
            from: first.date(),
            to: last.date(),
            sessions: self.candles.len(),
            first_close: first.close,
            last_close: last.close,
            change_pct,
            period_high: high,
            period_low: low,
            avg_volume,
        })
    }
}

/// Aggregate view of a [`PriceSeries`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceSummary {
    pub symbol: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub sessions: usize,
    pub first_close: f64,
    pub last_close: f64,
    pub change_pct: f64,
    pub period_high: f64,
    pub period_low: f64,
    pub avg_volume: f64,
}
