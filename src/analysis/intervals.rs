/// Reshapes a flat reading series into day- and week-aligned grids.
///
/// Meter data arrives as one long sequence. For load-shape analysis we want
/// it folded so each row is one calendar day (or week) and each column one
/// time of day (or week):
///
///   1. Break indices mark the last sample of each period: positions where
///      the day of month changes (days) or the weekday wraps back toward
///      Monday (weeks). The final index is always appended.
///   2. The cadence is the most common day length between day breaks.
///   3. Row `i` holds the samples after break `i` up to and including break
///      `i + 1`, truncated to the cadence. Short rows are padded with missing
///      cells at the tail. Samples before the first break (a leading partial
///      period) are dropped.
///
/// Everything here assumes the cadence doesn't change within the series.

use chrono::{Datelike, NaiveDateTime};
use std::collections::BTreeMap;

use crate::analysis::stats::{Axis, PeriodStats, grid_stats};
use crate::model::{Sample, SeriesError};

pub const DAYS_PER_WEEK: usize = 7;

// ---------------------------------------------------------------------------
// Break indices
// ---------------------------------------------------------------------------

/// Indices `i` where sample `i + 1` falls on a different day of the month,
/// followed by the last index.
pub fn day_breaks(samples: &[Sample]) -> Vec<usize> {
    breaks_where(samples, |a, b| a.timestamp.day() != b.timestamp.day())
}

/// Indices `i` where the weekday of sample `i + 1` is earlier in the week
/// (Monday first) than sample `i`'s, followed by the last index.
pub fn week_breaks(samples: &[Sample]) -> Vec<usize> {
    breaks_where(samples, |a, b| {
        b.timestamp.weekday().num_days_from_monday() < a.timestamp.weekday().num_days_from_monday()
    })
}

fn breaks_where(samples: &[Sample], is_break: impl Fn(&Sample, &Sample) -> bool) -> Vec<usize> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mut breaks: Vec<usize> = samples
        .windows(2)
        .enumerate()
        .filter(|(_, w)| is_break(&w[0], &w[1]))
        .map(|(i, _)| i)
        .collect();
    breaks.push(samples.len() - 1);
    breaks
}

/// The most common distance between consecutive breaks. Ties go to the
/// smallest length. `None` with fewer than two breaks.
pub fn modal_run_length(breaks: &[usize]) -> Option<usize> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for w in breaks.windows(2) {
        *counts.entry(w[1] - w[0]).or_default() += 1;
    }
    // Ascending keys: strict `>` keeps the first (smallest) on a tie.
    let mut best: Option<(usize, usize)> = None;
    for (length, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((length, count));
        }
    }
    best.map(|(length, _)| length)
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// Row-major 2-D arrangement of samples; `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Option<Sample>>,
}

impl IntervalGrid {
    /// Folds `samples` into `breaks.len() - 1` rows of `cols` cells.
    pub fn break_at(samples: &[Sample], breaks: &[usize], cols: usize) -> Self {
        let rows = breaks.len().saturating_sub(1);
        let mut cells = vec![None; rows * cols];

        for (row, w) in breaks.windows(2).enumerate() {
            let begin = w[0] + 1;
            let end = (begin + cols).min(w[1] + 1).min(samples.len());
            if begin >= end {
                continue;
            }
            for (offset, sample) in samples[begin..end].iter().enumerate() {
                cells[row * cols + offset] = Some(*sample);
            }
        }

        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Sample> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells[row * self.cols + col].as_ref()
    }

    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.cell(row, col).map(|s| s.value as f64)
    }

    pub fn timestamp(&self, row: usize, col: usize) -> Option<NaiveDateTime> {
        self.cell(row, col).map(|s| s.timestamp)
    }

    pub fn row(&self, row: usize) -> &[Option<Sample>] {
        if row >= self.rows {
            return &[];
        }
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    /// Number of present cells in `row`.
    pub fn row_len(&self, row: usize) -> usize {
        self.row(row).iter().filter(|c| c.is_some()).count()
    }
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// A reading series with its break indices, cadence, period grids and
/// per-axis statistics, all derived once at construction.
#[derive(Debug, Clone)]
pub struct IntervalSeries {
    samples: Vec<Sample>,
    day_breaks: Vec<usize>,
    week_breaks: Vec<usize>,
    observations_per_day: usize,
    daily: IntervalGrid,
    weekly: IntervalGrid,
    daily_stats: PeriodStats,
    time_of_day_stats: PeriodStats,
    weekly_stats: PeriodStats,
    time_of_week_stats: PeriodStats,
}

impl IntervalSeries {
    /// # Errors
    /// `InsufficientData` unless the series crosses at least one day boundary.
    pub fn build(samples: Vec<Sample>) -> Result<Self, SeriesError> {
        let day_breaks = day_breaks(&samples);
        let observations_per_day = modal_run_length(&day_breaks).ok_or_else(|| {
            SeriesError::InsufficientData(format!(
                "{} readings never cross a day boundary",
                samples.len()
            ))
        })?;
        let week_breaks = week_breaks(&samples);

        let daily = IntervalGrid::break_at(&samples, &day_breaks, observations_per_day);
        let weekly =
            IntervalGrid::break_at(&samples, &week_breaks, observations_per_day * DAYS_PER_WEEK);

        Ok(Self {
            daily_stats: grid_stats(&daily, Axis::Rows),
            time_of_day_stats: grid_stats(&daily, Axis::Columns),
            weekly_stats: grid_stats(&weekly, Axis::Rows),
            time_of_week_stats: grid_stats(&weekly, Axis::Columns),
            samples,
            day_breaks,
            week_breaks,
            observations_per_day,
            daily,
            weekly,
        })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn day_breaks(&self) -> &[usize] {
        &self.day_breaks
    }

    pub fn week_breaks(&self) -> &[usize] {
        &self.week_breaks
    }

    pub fn observations_per_day(&self) -> usize {
        self.observations_per_day
    }

    pub fn observations_per_week(&self) -> usize {
        self.observations_per_day * DAYS_PER_WEEK
    }

    pub fn daily_grid(&self) -> &IntervalGrid {
        &self.daily
    }

    pub fn weekly_grid(&self) -> &IntervalGrid {
        &self.weekly
    }

    /// One entry per day.
    pub fn daily_stats(&self) -> &PeriodStats {
        &self.daily_stats
    }

    /// One entry per time of day.
    pub fn time_of_day_stats(&self) -> &PeriodStats {
        &self.time_of_day_stats
    }

    /// One entry per week.
    pub fn weekly_stats(&self) -> &PeriodStats {
        &self.weekly_stats
    }

    /// One entry per time of week.
    pub fn time_of_week_stats(&self) -> &PeriodStats {
        &self.time_of_week_stats
    }
}
