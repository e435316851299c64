use std::f64::consts::PI;

/// A periodic component expressed as a truncated Fourier series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seasonality {
    pub name: &'static str,
    pub period_days: f64,
    pub order: usize,
}

impl Seasonality {
    pub const YEARLY: Seasonality = Seasonality {
        name: "yearly",
        period_days: 365.25,
        order: 10,
    };
    pub const WEEKLY: Seasonality = Seasonality {
        name: "weekly",
        period_days: 7.0,
        order: 3,
    };
    pub const DAILY: Seasonality = Seasonality {
        name: "daily",
        period_days: 1.0,
        order: 4,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FourierTerm {
    period_days: f64,
    harmonic: usize,
    sine: bool,
}

impl FourierTerm {
    fn eval(&self, t_days: f64) -> f64 {
        let x = 2.0 * PI * self.harmonic as f64 * t_days / self.period_days;
        if self.sine {
            x.sin()
        } else {
            x.cos()
        }
    }
}

/// Column layout of the regression: intercept, slope, one hinge per
/// changepoint, then the Fourier terms.
///
/// Time enters as days since the first observation. The trend columns use
/// time scaled to `[0, 1]` over the history; Fourier terms use raw days.
#[derive(Debug, Clone)]
pub struct FeatureLayout {
    t_scale: f64,
    changepoints: Vec<f64>,
    terms: Vec<FourierTerm>,
}

impl FeatureLayout {
    /// Build the layout for observations at `t_days` (ascending, first is 0).
    ///
    /// Changepoints sit at evenly spaced observations within the first
    /// `changepoint_range` of the history. Fourier terms that are constant
    /// over the observed times carry no information beyond the intercept and
    /// are left out.
    pub fn new(
        t_days: &[f64],
        n_changepoints: usize,
        changepoint_range: f64,
        seasonalities: &[Seasonality],
    ) -> Self {
        let n = t_days.len();
        let t_scale = t_days.last().copied().unwrap_or(1.0).max(1.0);

        let hist_size = ((n as f64) * changepoint_range).floor() as usize;
        let n_cp = n_changepoints.min(hist_size.saturating_sub(1));
        let changepoints = if n_cp == 0 {
            Vec::new()
        } else {
            let last_index = (hist_size - 1) as f64;
            (1..=n_cp)
                .map(|j| {
                    let index = (last_index * j as f64 / n_cp as f64).round() as usize;
                    t_days[index] / t_scale
                })
                .collect()
        };

        let mut terms = Vec::new();
        for s in seasonalities {
            for harmonic in 1..=s.order {
                for sine in [true, false] {
                    let term = FourierTerm {
                        period_days: s.period_days,
                        harmonic,
                        sine,
                    };
                    if varies(t_days.iter().map(|&t| term.eval(t))) {
                        terms.push(term);
                    }
                }
            }
        }

        Self {
            t_scale,
            changepoints,
            terms,
        }
    }

    pub fn width(&self) -> usize {
        self.trend_width() + self.terms.len()
    }

    pub fn trend_width(&self) -> usize {
        2 + self.changepoints.len()
    }

    pub fn changepoint_count(&self) -> usize {
        self.changepoints.len()
    }

    pub fn seasonal_terms(&self) -> usize {
        self.terms.len()
    }

    /// Write the regression row for `t_days` into `row`.
    pub fn fill_row(&self, t_days: f64, row: &mut [f64]) {
        let ts = t_days / self.t_scale;
        row[0] = 1.0;
        row[1] = ts;
        for (j, &c) in self.changepoints.iter().enumerate() {
            row[2 + j] = (ts - c).max(0.0);
        }
        let offset = self.trend_width();
        for (j, term) in self.terms.iter().enumerate() {
            row[offset + j] = term.eval(t_days);
        }
    }
}

fn varies(values: impl Iterator<Item = f64>) -> bool {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    max - min > 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn changepoints_stay_in_range() {
        let t = days(100);
        let layout = FeatureLayout::new(&t, 25, 0.8, &[]);
        assert_eq!(layout.changepoint_count(), 25);
        assert!(layout.changepoints.iter().all(|&c| c > 0.0 && c <= 0.8));
        assert!(layout.changepoints.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn short_history_limits_changepoints() {
        let layout = FeatureLayout::new(&days(5), 25, 0.8, &[]);
        assert_eq!(layout.changepoint_count(), 3);
        let layout = FeatureLayout::new(&days(2), 25, 0.8, &[]);
        assert_eq!(layout.changepoint_count(), 0);
    }

    #[test]
    fn daily_terms_vanish_on_whole_days() {
        let layout = FeatureLayout::new(&days(30), 0, 0.8, &[Seasonality::DAILY]);
        assert_eq!(layout.seasonal_terms(), 0);

        let layout = FeatureLayout::new(&days(30), 0, 0.8, &[Seasonality::WEEKLY]);
        assert_eq!(layout.seasonal_terms(), 6);
    }

    #[test]
    fn row_layout() {
        let layout = FeatureLayout::new(&days(11), 1, 0.5, &[Seasonality::WEEKLY]);
        let mut row = vec![0.0; layout.width()];
        layout.fill_row(10.0, &mut row);
        assert_eq!(row[0], 1.0);
        assert_eq!(row[1], 1.0);
        assert!(row[2] > 0.0);
        assert_eq!(layout.width(), 3 + 6);
    }
}
