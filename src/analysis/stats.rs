/// Per-period statistics over an `IntervalGrid`.
///
/// Each lane (a row, or a column) yields one mean, standard deviation,
/// "max", "min" and max/min ratio:
///
/// - mean and std-dev (population) skip missing cells
/// - "max" and "min" are the 95th and 5th percentiles, so a single noisy
///   sample can't set a day's peak or base load
/// - before ranking, missing cells are filled with the lane's own mean
/// - the ratio is `max / min`, and is `None` where `min <= 0`
///
/// A lane with no values at all reports NaN for every number.

use serde::Serialize;

use crate::analysis::intervals::IntervalGrid;

pub const UPPER_PERCENTILE: f64 = 95.0;
pub const LOWER_PERCENTILE: f64 = 5.0;

/// Which lanes to summarize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// One value per row: per day, or per week.
    Rows,
    /// One value per column: per time of day, or time of week.
    Columns,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodStats {
    pub mean: Vec<f64>,
    pub std_dev: Vec<f64>,
    /// 95th percentile.
    pub max: Vec<f64>,
    /// 5th percentile.
    pub min: Vec<f64>,
    pub max_min_ratio: Vec<Option<f64>>,
}

impl PeriodStats {
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

/// Computes `PeriodStats` for every lane of `grid` along `axis`.
pub fn grid_stats(grid: &IntervalGrid, axis: Axis) -> PeriodStats {
    let lanes: Vec<Vec<Option<f64>>> = match axis {
        Axis::Rows => (0..grid.rows())
            .map(|r| (0..grid.cols()).map(|c| grid.value(r, c)).collect())
            .collect(),
        Axis::Columns => (0..grid.cols())
            .map(|c| (0..grid.rows()).map(|r| grid.value(r, c)).collect())
            .collect(),
    };

    let mut stats = PeriodStats {
        mean: Vec::with_capacity(lanes.len()),
        std_dev: Vec::with_capacity(lanes.len()),
        max: Vec::with_capacity(lanes.len()),
        min: Vec::with_capacity(lanes.len()),
        max_min_ratio: Vec::with_capacity(lanes.len()),
    };

    for lane in &lanes {
        let present: Vec<f64> = lane.iter().flatten().copied().collect();
        let mean = mean(&present);
        let std_dev = population_std_dev(&present, mean);

        let mut filled: Vec<f64> = lane.iter().map(|v| v.unwrap_or(mean)).collect();
        filled.sort_by(f64::total_cmp);
        let max = percentile(&filled, UPPER_PERCENTILE);
        let min = percentile(&filled, LOWER_PERCENTILE);
        let ratio = if min > 0.0 { Some(max / min) } else { None };

        stats.mean.push(mean);
        stats.std_dev.push(std_dev);
        stats.max.push(max);
        stats.min.push(min);
        stats.max_min_ratio.push(ratio);
    }
    stats
}

/// Linear-interpolated percentile of ascending `sorted` values, `p` in 0..=100.
/// NaN when `sorted` is empty.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        len => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let fraction = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        }
    }
}

/// Arithmetic mean, NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
