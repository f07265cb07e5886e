use chrono::prelude::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::iter::FromIterator;
use std::str::FromStr;
pub mod alias;
pub mod align;
pub mod chart;
pub mod config;
pub mod error;
pub mod fetch;
pub mod jhu;
pub mod owid;
pub mod plot;
pub mod smooth;
pub mod source;

pub use error::{CovidError, Result};

pub const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

/// date format of the direct-delta (ourworldindata) csv
pub const OWID_DATE_FORMAT: &str = "%Y-%m-%d";
/// date format of the column headers in the cumulative (johns hopkins) csv
pub const JHU_DATE_FORMAT: &str = "%m/%d/%y";
/// prefix added to cached and output files when tagging with the run date
pub const TAG_FORMAT: &str = "%Y%m%d_";

/// The seven quantities tracked per country and date.
/// The discriminant is the stable metric index (0-6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    NewCases = 0,
    NewDeaths = 1,
    NewRecoveries = 2,
    TotalCases = 3,
    TotalDeaths = 4,
    TotalRecoveries = 5,
    TotalActiveCases = 6,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::NewCases,
        Metric::NewDeaths,
        Metric::NewRecoveries,
        Metric::TotalCases,
        Metric::TotalDeaths,
        Metric::TotalRecoveries,
        Metric::TotalActiveCases,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Metric> {
        Metric::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::NewCases => "new_cases",
            Metric::NewDeaths => "new_deaths",
            Metric::NewRecoveries => "new_recoveries",
            Metric::TotalCases => "total_cases",
            Metric::TotalDeaths => "total_deaths",
            Metric::TotalRecoveries => "total_recoveries",
            Metric::TotalActiveCases => "total_active_cases",
        }
    }

    /// axis description
    pub fn label(self) -> &'static str {
        match self {
            Metric::NewCases => "new cases",
            Metric::NewDeaths => "new deaths",
            Metric::NewRecoveries => "new recoveries",
            Metric::TotalCases => "cases",
            Metric::TotalDeaths => "deaths",
            Metric::TotalRecoveries => "recoveries",
            Metric::TotalActiveCases => "active cases",
        }
    }
}

/// Accepts either the metric index ("3") or its name ("total_cases").
impl FromStr for Metric {
    type Err = CovidError;

    fn from_str(s: &str) -> Result<Metric> {
        let s = s.trim();
        if let Ok(i) = s.parse::<usize>() {
            return Metric::from_index(i).ok_or_else(|| CovidError::UnknownMetric(s.to_string()));
        }
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| CovidError::UnknownMetric(s.to_string()))
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Counts for one country on one date.
/// None means the source does not report the quantity, which is not the same as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyRecord {
    pub new_cases: Option<i64>,
    pub new_deaths: Option<i64>,
    pub new_recoveries: Option<i64>,
    pub total_cases: Option<i64>,
    pub total_deaths: Option<i64>,
    pub total_recoveries: Option<i64>,
    pub total_active_cases: Option<i64>,
}

impl DailyRecord {
    pub fn get(&self, metric: Metric) -> Option<i64> {
        match metric {
            Metric::NewCases => self.new_cases,
            Metric::NewDeaths => self.new_deaths,
            Metric::NewRecoveries => self.new_recoveries,
            Metric::TotalCases => self.total_cases,
            Metric::TotalDeaths => self.total_deaths,
            Metric::TotalRecoveries => self.total_recoveries,
            Metric::TotalActiveCases => self.total_active_cases,
        }
    }

    fn slot(&mut self, metric: Metric) -> &mut Option<i64> {
        match metric {
            Metric::NewCases => &mut self.new_cases,
            Metric::NewDeaths => &mut self.new_deaths,
            Metric::NewRecoveries => &mut self.new_recoveries,
            Metric::TotalCases => &mut self.total_cases,
            Metric::TotalDeaths => &mut self.total_deaths,
            Metric::TotalRecoveries => &mut self.total_recoveries,
            Metric::TotalActiveCases => &mut self.total_active_cases,
        }
    }

    /// field-wise sum, a field stays unknown only if unknown on both sides.
    /// Err holds the first field whose sum overflows.
    pub fn merge(&self, other: &DailyRecord) -> std::result::Result<DailyRecord, Metric> {
        let mut merged = DailyRecord::default();
        for &metric in Metric::ALL.iter() {
            *merged.slot(metric) = match (self.get(metric), other.get(metric)) {
                (Some(a), Some(b)) => Some(a.checked_add(b).ok_or(metric)?),
                (a, None) => a,
                (None, b) => b,
            };
        }
        Ok(merged)
    }
}

/// The records of one country, always iterated in chronological order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    records: BTreeMap<NaiveDate, DailyRecord>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, date: &NaiveDate) -> Option<&DailyRecord> {
        self.records.get(date)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &DailyRecord)> {
        self.records.iter()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.keys().next_back().copied()
    }

    /// value of the metric at the most recent date where it is known
    pub fn latest(&self, metric: Metric) -> Option<i64> {
        self.records.values().rev().find_map(|r| r.get(metric))
    }

    /// Known values of the metric as (days since origin, value) samples.
    /// The origin is the first date with a known value; unknown values are skipped.
    pub fn day_samples(&self, metric: Metric) -> Option<(NaiveDate, Vec<(f64, f64)>)> {
        let mut known = self
            .records
            .iter()
            .filter_map(|(d, r)| r.get(metric).map(|v| (*d, v)))
            .peekable();
        let origin = known.peek()?.0;
        let samples = known
            .map(|(d, v)| ((d - origin).num_days() as f64, v as f64))
            .collect();
        Some((origin, samples))
    }
}

impl FromIterator<(NaiveDate, DailyRecord)> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, DailyRecord)>>(iter: I) -> Self {
        TimeSeries {
            records: iter.into_iter().collect(),
        }
    }
}

/// All countries of one source, iterated in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    countries: BTreeMap<String, TimeSeries>,
}

impl RecordStore {
    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn get(&self, country: &str) -> Option<&TimeSeries> {
        self.countries.get(country)
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.countries.keys().map(|c| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TimeSeries)> {
        self.countries.iter().map(|(c, ts)| (c.as_str(), ts))
    }
}

impl FromIterator<(String, TimeSeries)> for RecordStore {
    fn from_iter<I: IntoIterator<Item = (String, TimeSeries)>>(iter: I) -> Self {
        RecordStore {
            countries: iter.into_iter().collect(),
        }
    }
}

/// one line per country: span of dates and latest totals
impl std::fmt::Display for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "country,first_date,last_date,days,total_cases,total_deaths\n")?;
        let fmt_opt = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_default();
        for (c, ts) in self.iter() {
            let first = ts.first_date().map(|d| d.to_string()).unwrap_or_default();
            let last = ts.last_date().map(|d| d.to_string()).unwrap_or_default();
            write!(
                f,
                "{},{},{},{},{},{}\n",
                c,
                first,
                last,
                ts.len(),
                fmt_opt(ts.latest(Metric::TotalCases)),
                fmt_opt(ts.latest(Metric::TotalDeaths)),
            )?
        }
        Ok(())
    }
}

/// None for an empty slice
pub fn min_and_max<T: std::cmp::PartialOrd + Copy>(s: &[T]) -> Option<(T, T)> {
    let mut self_iter = s.iter();
    let (mut min, mut max) = match self_iter.next() {
        Some(v) => (*v, *v),
        None => return None,
    };
    for es in self_iter {
        if *es > max {
            max = *es
        }
        if *es < min {
            min = *es
        }
    }
    Some((min, max))
}

/// Parses a count cell; empty cells are 0.
/// Whole floats ("12.0") are accepted since some exports write counts that way.
pub(crate) fn parse_count(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Some(0);
    }
    match cell.parse::<i64>() {
        Ok(v) => Some(v),
        Err(_) => match cell.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0. => Some(f as i64),
            _ => None,
        },
    }
}
