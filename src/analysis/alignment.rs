/// Joins independently sampled daily sequences on their dates.
///
/// Both inputs must be ascending with no duplicates. `align_dates` is a
/// single forward merge: a date present in only one sequence produces no
/// pair and is not an error.

use chrono::NaiveDate;
use serde::Serialize;

use crate::ingest::qclcd::DailyObservation;
use crate::model::WeatherError;
use crate::stations::WeatherStationIndex;

/// Index pairs `(i, j)` with `a[i] == b[j]`, in ascending order.
pub fn align_dates<T: Ord>(a: &[T], b: &[T]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    let mut j = 0;
    for (i, item) in a.iter().enumerate() {
        while j < b.len() && b[j] < *item {
            j += 1;
        }
        if j == b.len() {
            break;
        }
        if b[j] == *item {
            pairs.push((i, j));
        }
    }
    pairs
}

/// Spreads `values` (indexed like `b`) onto a sequence of length `len_a`
/// using `align_dates` pairs. Unmatched positions are `None`.
pub fn project<T: Copy>(pairs: &[(usize, usize)], len_a: usize, values: &[T]) -> Vec<Option<T>> {
    let mut out = vec![None; len_a];
    for &(i, j) in pairs {
        if let (Some(slot), Some(value)) = (out.get_mut(i), values.get(j)) {
            *slot = Some(*value);
        }
    }
    out
}

/// Mean daily outdoor temperature (°F) for each building date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureSeries {
    pub dates: Vec<NaiveDate>,
    /// `None` where the station has no observation for that date.
    pub temperatures: Vec<Option<f64>>,
}

impl TemperatureSeries {
    pub fn matched_count(&self) -> usize {
        self.temperatures.iter().filter(|t| t.is_some()).count()
    }
}

/// Looks up weather for `dates` (ascending, unique) near `zip5` and aligns
/// each date with that day's average temperature.
pub fn match_weather(
    index: &WeatherStationIndex,
    zip5: &str,
    dates: &[NaiveDate],
) -> Result<TemperatureSeries, WeatherError> {
    let (Some(&start), Some(&end)) = (dates.first(), dates.last()) else {
        return Ok(TemperatureSeries {
            dates: Vec::new(),
            temperatures: Vec::new(),
        });
    };

    let observations = index.observations_for_range(zip5, start, end)?;
    Ok(align_observations(dates, observations))
}

/// Aligns observations to `dates`. Observations are sorted by date and
/// duplicate dates dropped (first kept) before the merge.
pub fn align_observations(dates: &[NaiveDate], mut observations: Vec<DailyObservation>) -> TemperatureSeries {
    observations.sort_by_key(|o| o.date);
    observations.dedup_by_key(|o| o.date);

    let weather_dates: Vec<NaiveDate> = observations.iter().map(|o| o.date).collect();
    let averages: Vec<Option<f64>> = observations.iter().map(|o| o.t_avg).collect();

    let pairs = align_dates(dates, &weather_dates);
    let temperatures = project(&pairs, dates.len(), &averages)
        .into_iter()
        .map(Option::flatten)
        .collect();

    TemperatureSeries {
        dates: dates.to_vec(),
        temperatures,
    }
}
