//! Minimum and maximum tracking with the positive-only minimum
//! policy: values `<= 0` never become the minimum (the measured
//! quantities are latencies and packet counts, where 0 or less means
//! "no measurement").

/// Reported as `Stats::min` when no sample was positive.
pub const MIN_SENTINEL: f64 = f64::MAX;
/// Reported as `Stats::max` when there were no samples.
pub const MAX_SENTINEL: f64 = f64::MIN;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Extremes {
    min: Option<f64>,
    max: Option<f64>,
}

impl Extremes {
    pub fn add(&mut self, v: f64) {
        if v > self.max_or_sentinel() {
            self.max = Some(v);
        }
        if v > 0. && v < self.min_or_sentinel() {
            self.min = Some(v);
        }
    }

    pub fn min_or_sentinel(&self) -> f64 {
        self.min.unwrap_or(MIN_SENTINEL)
    }

    pub fn max_or_sentinel(&self) -> f64 {
        self.max.unwrap_or(MAX_SENTINEL)
    }
}

#[test]
fn t_extremes() {
    let mut e = Extremes::default();
    assert_eq!(e.min_or_sentinel(), f64::MAX);
    assert_eq!(e.max_or_sentinel(), f64::MIN);
    for v in [-3., -1., 0., 2., 4.] {
        e.add(v);
    }
    assert_eq!(e.min_or_sentinel(), 2.);
    assert_eq!(e.max_or_sentinel(), 4.);

    let mut e = Extremes::default();
    for v in [-3., 0.] {
        e.add(v);
    }
    assert_eq!(e.min_or_sentinel(), MIN_SENTINEL);
    assert_eq!(e.max_or_sentinel(), 0.);
}
