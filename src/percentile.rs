//! Percentile rank against population benchmarks
//!
//! Piecewise-linear interpolation over the p25/p50/p75 anchors of the
//! matching benchmark cell:
//!
//! | HRV range        | Percentile                     |
//! |------------------|--------------------------------|
//! | `<= p25`         | `25 * hrv / p25`, at least 1   |
//! | `(p25, p50]`     | `25 + 25 * (hrv-p25)/(p50-p25)`|
//! | `(p50, p75]`     | `50 + 25 * (hrv-p50)/(p75-p50)`|
//! | `> p75`          | `75 + 25 * (hrv-p75)/p75`, at most 99 |

use serde::{Deserialize, Serialize};

use crate::benchmarks::{benchmark_for_age, AgeBracket, Benchmark};
use crate::models::{Comparison, Gender};
use crate::statistics::round_half_up;

pub const MIN_PERCENTILE: f64 = 1.0;
pub const MAX_PERCENTILE: f64 = 99.0;

/// Percentile rank of one HRV value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileResult {
    /// Rank between 1 and 99
    pub percentile: u8,
    pub bracket: AgeBracket,
    pub benchmark_p50: f64,
    pub comparison: Comparison,
}

/// Unrounded percentile for `hrv` within `benchmark`.
///
/// NaN ranks at the floor; infinities land on the clamps.
pub(crate) fn interpolate_percentile(hrv: f64, benchmark: &Benchmark) -> f64 {
    let Benchmark { p25, p50, p75 } = *benchmark;

    if hrv.is_nan() {
        return MIN_PERCENTILE;
    }

    let raw = if hrv <= p25 {
        if p25 <= 0.0 {
            MIN_PERCENTILE
        } else {
            25.0 * (hrv / p25)
        }
    } else if hrv <= p50 {
        25.0 + 25.0 * (hrv - p25) / (p50 - p25)
    } else if hrv <= p75 {
        50.0 + 25.0 * (hrv - p50) / (p75 - p50)
    } else {
        75.0 + 25.0 * (hrv - p75) / p75
    };

    raw.clamp(MIN_PERCENTILE, MAX_PERCENTILE)
}

/// Inverse of [`interpolate_percentile`] within the same anchors
pub(crate) fn interpolate_hrv(percentile: f64, benchmark: &Benchmark) -> f64 {
    let Benchmark { p25, p50, p75 } = *benchmark;
    let percentile = percentile.clamp(MIN_PERCENTILE, MAX_PERCENTILE);

    if percentile <= 25.0 {
        p25 * percentile / 25.0
    } else if percentile <= 50.0 {
        p25 + (percentile - 25.0) / 25.0 * (p50 - p25)
    } else if percentile <= 75.0 {
        p50 + (percentile - 50.0) / 25.0 * (p75 - p50)
    } else {
        p75 + (percentile - 75.0) / 25.0 * p75
    }
}

/// Percentile calculator against population benchmarks
pub struct PercentileEngine;

impl PercentileEngine {
    /// Rank `hrv` for a person of `age` and `gender`
    pub fn get_percentile(hrv: f64, age: u32, gender: Gender) -> PercentileResult {
        let (bracket, benchmark) = benchmark_for_age(age, gender);

        let percentile = round_half_up(interpolate_percentile(hrv, &benchmark)) as u8;

        let comparison = if hrv > benchmark.p50 {
            Comparison::Above
        } else if hrv == benchmark.p50 {
            Comparison::At
        } else {
            Comparison::Below
        };

        PercentileResult {
            percentile,
            bracket,
            benchmark_p50: benchmark.p50,
            comparison,
        }
    }

    /// HRV (whole milliseconds) that corresponds to `percentile`.
    ///
    /// Percentiles outside 1-99 are clamped first.
    pub fn percentile_to_target_hrv(percentile: f64, age: u32, gender: Gender) -> f64 {
        let (_, benchmark) = benchmark_for_age(age, gender);
        round_half_up(interpolate_hrv(percentile, &benchmark))
    }
}
