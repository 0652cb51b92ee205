//! Descriptive statistics (count, total, average, median, standard
//! deviation, positive-only minimum, maximum) plus a fixed-resolution
//! histogram over a set of `f64` samples.
//!
//! Two passes over a private sorted copy of the samples: the first
//! one accumulates the total, the extremes and the histogram, the
//! second one the squared deviations from the average.

pub mod bucket_count;
pub mod extremes;

use std::{fmt::Display, str::FromStr, time::SystemTime};

use anyhow::bail;
use itertools::Itertools;
use serde::Serialize;

use crate::serde::date_and_time::system_time_to_rfc3339;
use crate::stats::{
    bucket_count::BucketCount,
    extremes::{Extremes, MAX_SENTINEL, MIN_SENTINEL},
};

/// Selects a scalar field of `Stats`.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum StatsField {
    N,
    Total,
    Average,
    Median,
    SD,
    Min,
    Max,
    Loss,
}

impl FromStr for StatsField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use StatsField::*;
        match s {
            "n" | "N" | "count" => Ok(N),
            "sum" | "Sum" | "total" | "Total" => Ok(Total),
            "average" | "Average" | "avg" | "mean" => Ok(Average),
            "median" | "Median" | "med" => Ok(Median),
            "sd" | "SD" | "stdev" | "stddev" => Ok(SD),
            "min" | "Min" => Ok(Min),
            "max" | "Max" => Ok(Max),
            "loss" | "plp" => Ok(Loss),
            _ => bail!(
                "expecting one of n|total|average|median|sd|min|max|loss, got: {s:?}"
            ),
        }
    }
}

/// The result of one statistics computation. Not modified after
/// `compute` returned, except for the caller annotations
/// (`loss_percentage`, `timestamp`) which `compute` never touches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    /// The element at index `count / 2` of the sorted samples; for
    /// even counts the two middle elements are *not* averaged.
    pub median: f64,
    /// Population standard deviation (divided by `count`, not
    /// `count - 1`).
    pub std_dev: f64,
    /// Smallest sample `> 0`, `f64::MAX` if there is none.
    pub min: f64,
    /// Largest sample, `f64::MIN` if there are no samples.
    pub max: f64,
    pub average: f64,
    pub total: f64,
    pub count: usize,
    pub bucket_count: BucketCount,
    /// `bucket_count` equal-width buckets from the smallest to the
    /// largest sample; values on the top edge land in the last bucket.
    pub histogram: Vec<u64>,
    /// Packet loss percentage, set by the caller.
    pub loss_percentage: f64,
    /// When the samples were taken, set by the caller.
    pub timestamp: Option<SystemTime>,
}

impl Stats {
    /// The result for no samples: sentinels for min and max, zero
    /// otherwise, with a zero-filled histogram of the requested size.
    pub fn empty(bucket_count: impl Into<BucketCount>) -> Self {
        let bucket_count = bucket_count.into();
        Stats {
            median: 0.,
            std_dev: 0.,
            min: MIN_SENTINEL,
            max: MAX_SENTINEL,
            average: 0.,
            total: 0.,
            count: 0,
            bucket_count,
            histogram: vec![0; bucket_count.get()],
            loss_percentage: 0.,
            timestamp: None,
        }
    }

    /// Never fails; `bucket_count` is clamped (see `BucketCount`),
    /// `samples` is not modified.
    pub fn compute(samples: &[f64], bucket_count: impl Into<BucketCount>) -> Self {
        let bucket_count = bucket_count.into();
        if samples.is_empty() {
            return Self::empty(bucket_count);
        }
        let count = samples.len();

        let mut sorted = samples.to_vec();
        // A short copy would silently produce wrong stats
        assert_eq!(sorted.len(), count, "copying the samples");
        sorted.sort_by(f64::total_cmp);

        let median = sorted[count / 2];

        let lowest = sorted[0];
        let highest = sorted[count - 1];
        let num_buckets = bucket_count.get();
        let increment = (highest - lowest) / num_buckets as f64;

        let mut histogram = vec![0; num_buckets];
        let mut extremes = Extremes::default();
        let mut total = 0.;
        for &v in &sorted {
            total += v;
            extremes.add(v);
            histogram[bucket_index(v, lowest, increment, num_buckets)] += 1;
        }

        let n = count as f64;
        let average = total / n;
        let sum_squared_error: f64 = sorted.iter().map(|v| (v - average) * (v - average)).sum();
        let std_dev = (sum_squared_error / n).sqrt();

        Stats {
            median,
            std_dev,
            min: extremes.min_or_sentinel(),
            max: extremes.max_or_sentinel(),
            average,
            total,
            count,
            bucket_count,
            histogram,
            loss_percentage: 0.,
            timestamp: None,
        }
    }

    pub fn with_loss_percentage(self, loss_percentage: f64) -> Self {
        Self {
            loss_percentage,
            ..self
        }
    }

    pub fn with_timestamp(self, timestamp: SystemTime) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..self
        }
    }

    pub fn get(&self, field: StatsField) -> f64 {
        match field {
            StatsField::N => self.count as f64,
            StatsField::Total => self.total,
            StatsField::Average => self.average,
            StatsField::Median => self.median,
            StatsField::SD => self.std_dev,
            StatsField::Min => self.min,
            StatsField::Max => self.max,
            StatsField::Loss => self.loss_percentage,
        }
    }
}

/// All values fall into bucket 0 if the range is zero; otherwise the
/// index is clamped to `0..num_buckets`.
fn bucket_index(v: f64, lowest: f64, increment: f64, num_buckets: usize) -> usize {
    if increment == 0. {
        return 0;
    }
    let i = ((v - lowest) / increment).floor();
    if i >= num_buckets as f64 {
        num_buckets - 1
    } else if i < 0. {
        0
    } else {
        // NaN casts to 0
        i as usize
    }
}

/// Debugging representation, no compatibility guarantees.
impl Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            median,
            std_dev,
            min,
            max,
            average,
            total,
            count,
            bucket_count: _,
            histogram,
            loss_percentage,
            timestamp,
        } = self;
        let timestamp = match timestamp {
            Some(t) => system_time_to_rfc3339(*t),
            None => "-".into(),
        };
        write!(
            f,
            "stats{{Med:{median:.2}, Sdv:{std_dev:.2}, Min:{min:.2}, Max:{max:.2}, \
             Avg:{average:.2}, Tot:{total:.2}, Nel:{:.2}, Plp:{loss_percentage:.2}, \
             Tim:{timestamp}, Dec:[{}]{{{}}}}}",
            *count as f64,
            histogram.len(),
            histogram.iter().join(", ")
        )
    }
}
