/// A building's interval data plus the summaries reported for it.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::analysis::alignment::{TemperatureSeries, match_weather};
use crate::analysis::intervals::IntervalSeries;
use crate::analysis::stats::mean;
use crate::model::{Sample, SeriesError, WeatherError};
use crate::stations::WeatherStationIndex;

/// Whole-series usage figures, in watts, averaged over days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSummary {
    /// Mean of daily means.
    pub mean: f64,
    /// Mean of daily 95th percentiles.
    pub max: f64,
    /// Mean of daily 5th percentiles.
    pub min: f64,
    /// Mean of the valid daily max/min ratios.
    pub max_min_ratio: Option<f64>,
    /// Mean daily (max - min).
    pub range: f64,
}

#[derive(Debug, Clone)]
pub struct Building {
    zip5: Option<String>,
    series: IntervalSeries,
    days: Vec<NaiveDate>,
    summary: UsageSummary,
    temperatures: Option<TemperatureSeries>,
}

impl Building {
    pub fn new(samples: Vec<Sample>, zip5: Option<String>) -> Result<Self, SeriesError> {
        let series = IntervalSeries::build(samples)?;

        let daily = series.daily_grid();
        let days = (0..daily.rows())
            .filter_map(|r| daily.timestamp(r, 0))
            .map(|ts| ts.date())
            .collect();

        let stats = series.daily_stats();
        let ratios: Vec<f64> = stats.max_min_ratio.iter().flatten().copied().collect();
        let ranges: Vec<f64> = stats.max.iter().zip(&stats.min).map(|(mx, mn)| mx - mn).collect();
        let summary = UsageSummary {
            mean: mean(&stats.mean),
            max: mean(&stats.max),
            min: mean(&stats.min),
            max_min_ratio: if ratios.is_empty() { None } else { Some(mean(&ratios)) },
            range: mean(&ranges),
        };

        Ok(Self {
            zip5,
            series,
            days,
            summary,
            temperatures: None,
        })
    }

    pub fn zip5(&self) -> Option<&str> {
        self.zip5.as_deref()
    }

    pub fn series(&self) -> &IntervalSeries {
        &self.series
    }

    /// Calendar date of each row of the daily grid.
    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn summary(&self) -> &UsageSummary {
        &self.summary
    }

    /// Energy per day in kWh: mean demand × 24 h, independent of cadence.
    pub fn daily_kwh(&self) -> Vec<f64> {
        self.series
            .daily_stats()
            .mean
            .iter()
            .map(|w| w * 24.0 / 1000.0)
            .collect()
    }

    /// `true` for Saturdays and Sundays, one per day.
    pub fn weekend_flags(&self) -> Vec<bool> {
        self.days
            .iter()
            .map(|d| d.weekday().number_from_monday() > 5)
            .collect()
    }

    pub fn with_temperatures(mut self, temperatures: TemperatureSeries) -> Self {
        self.temperatures = Some(temperatures);
        self
    }

    /// Looks up and attaches outdoor temperatures for the building's days.
    /// A building without a zip code is returned unchanged.
    pub fn with_weather(self, index: &WeatherStationIndex) -> Result<Self, WeatherError> {
        let Some(zip5) = self.zip5.clone() else {
            return Ok(self);
        };
        let temperatures = match_weather(index, &zip5, &self.days)?;
        Ok(self.with_temperatures(temperatures))
    }

    pub fn temperatures(&self) -> Option<&TemperatureSeries> {
        self.temperatures.as_ref()
    }

    /// Pearson correlation between daily kWh and mean outdoor temperature
    /// over days that have both. `None` without temperatures, with fewer
    /// than two matched days, or when either side is constant.
    pub fn temperature_correlation(&self) -> Option<f64> {
        let temperatures = self.temperatures.as_ref()?;
        let (xs, ys): (Vec<f64>, Vec<f64>) = temperatures
            .temperatures
            .iter()
            .zip(self.daily_kwh())
            .filter_map(|(t, kwh)| t.map(|t| (t, kwh)))
            .filter(|(t, kwh)| t.is_finite() && kwh.is_finite())
            .unzip();
        pearson(&xs, &ys)
    }
}

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() < 2 || xs.len() != ys.len() {
        return None;
    }
    let mx = mean(xs);
    let my = mean(ys);
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}
