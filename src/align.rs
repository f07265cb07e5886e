use crate::smooth::Smoother;
use crate::{min_and_max, Metric, RecordStore};
use chrono::{Duration, NaiveDate};
use log::{debug, info};
use std::cmp::Ordering;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// aggregate rows of the sources, not peers of the countries
pub const DEFAULT_IGNORE: [&str; 6] = [
    "Worldwide",
    "International conveyance (Diamond Princess)",
    "International",
    "Others",
    "World",
    "Cruise Ship",
];

/// the origin of the outbreak, whose early numbers would flatten everyone else
pub const DEFAULT_AXIS_EXCLUDE: [&str; 1] = ["China"];

#[derive(Debug, Clone, PartialEq)]
pub struct AlignParams {
    pub metric: Metric,
    /// minimum day over day increase that marks day 0
    pub threshold: f64,
    /// only the first day_limit relative days count for the axis range
    pub day_limit: Option<usize>,
    /// restricts the countries when not empty
    pub interested: Vec<String>,
    pub ignore: Vec<String>,
    /// plotted, but left out of the axis range
    pub axis_exclude: Vec<String>,
}

impl Default for AlignParams {
    fn default() -> AlignParams {
        AlignParams {
            metric: Metric::TotalCases,
            threshold: 200.,
            day_limit: None,
            interested: Vec::new(),
            ignore: DEFAULT_IGNORE.iter().map(|c| c.to_string()).collect(),
            axis_exclude: DEFAULT_AXIS_EXCLUDE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativePoint {
    /// running count of samples since day 0
    pub day: usize,
    /// calendar date the sample was reported on
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelativeSeries {
    pub country: String,
    /// calendar date of day 0
    pub anchor: NaiveDate,
    pub points: Vec<RelativePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBounds {
    pub min_value: f64,
    pub max_value: f64,
    pub max_day: usize,
}

/// The aligned series of one metric, most affected country first.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub metric: Metric,
    pub series: Vec<RelativeSeries>,
    pub bounds: AxisBounds,
}

/// Scans the samples for the first position whose next value is more than
/// threshold above it, and returns that position and the following ones,
/// numbered from 0. Sample x is a day offset from origin.
/// The index into samples of day 0 is returned too.
pub fn relative_points(
    origin: NaiveDate,
    samples: &[(f64, f64)],
    threshold: f64,
) -> (Option<usize>, Vec<RelativePoint>) {
    let mut passed = false;
    let mut start = None;
    let mut points = Vec::new();
    for (i, &(x, y)) in samples.iter().enumerate() {
        if let Some(&(_, next)) = samples.get(i + 1) {
            if next - y > threshold {
                passed = true;
            }
        }
        if passed {
            start.get_or_insert(i);
            points.push(RelativePoint {
                day: points.len(),
                date: origin + Duration::days(x.round() as i64),
                value: y,
            });
        }
    }
    (start, points)
}

/// Ranks the countries, aligns each of them and computes the shared axis range.
/// The store is only read; calling this twice gives the same alignment.
pub fn align(store: &RecordStore, params: &AlignParams, smoother: &dyn Smoother) -> Alignment {
    let mut candidates: Vec<(&str, Option<i64>)> = store
        .iter()
        .filter(|(c, _)| !params.ignore.iter().any(|i| i == c))
        .filter(|(c, _)| params.interested.is_empty() || params.interested.iter().any(|i| i == c))
        .map(|(c, ts)| (c, ts.latest(params.metric)))
        .collect();
    // descending, unknown last, stable for ties
    candidates.sort_by(|a, b| match (a.1, b.1) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let mut series: Vec<RelativeSeries> = Vec::new();
    for (country, _) in candidates {
        let (origin, samples) = match store.get(country).and_then(|ts| ts.day_samples(params.metric)) {
            Some(s) => s,
            None => {
                debug!("{}: no {} reported", country, params.metric);
                continue;
            }
        };
        let smoothed = smoother.smooth(&samples);
        let (_, points) = relative_points(origin, &smoothed, params.threshold);
        let anchor = match points.first() {
            Some(p) => p.date,
            None => {
                debug!("{}: never increased by more than {}", country, params.threshold);
                continue;
            }
        };
        debug!("{}: day 0 on {}, {} days", country, anchor, points.len());
        series.push(RelativeSeries {
            country: country.to_string(),
            anchor,
            points,
        });
    }

    let contributing: Vec<&RelativeSeries> = series
        .iter()
        .filter(|s| !params.axis_exclude.iter().any(|c| *c == s.country))
        .collect();
    let bounds = axis_bounds(contributing.iter().copied(), params.day_limit)
        .or_else(|| axis_bounds(series.iter(), params.day_limit))
        .unwrap_or(AxisBounds {
            min_value: 0.,
            max_value: 0.,
            max_day: 0,
        });
    info!(
        "{}: {} countries passed the threshold {}",
        params.metric,
        series.len(),
        params.threshold
    );
    Alignment {
        metric: params.metric,
        series,
        bounds,
    }
}

/// Range of the points within the day limit, widened from a zero baseline.
/// None when no point is within the limit.
fn axis_bounds<'a, I>(series: I, day_limit: Option<usize>) -> Option<AxisBounds>
where
    I: Iterator<Item = &'a RelativeSeries>,
{
    let mut bounds = AxisBounds {
        min_value: 0.,
        max_value: 0.,
        max_day: 0,
    };
    let mut any = false;
    for s in series {
        let n = match day_limit {
            Some(limit) => s.points.len().min(limit),
            None => s.points.len(),
        };
        let values: Vec<f64> = s.points[..n].iter().map(|p| p.value).collect();
        if let Some((min, max)) = min_and_max(&values[..]) {
            bounds.min_value = bounds.min_value.min(min);
            bounds.max_value = bounds.max_value.max(max);
            bounds.max_day = bounds.max_day.max(n - 1);
            any = true;
        }
    }
    if any {
        Some(bounds)
    } else {
        None
    }
}

impl Alignment {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn get(&self, country: &str) -> Option<&RelativeSeries> {
        self.series.iter().find(|s| s.country == country)
    }

    /// writes one row per aligned point: country, relative day, calendar date, value
    pub fn to_csv<P: AsRef<Path>>(&self, fout: P) -> crate::Result<()> {
        let file = File::create(fout.as_ref())?;
        let mut wtr = csv::Writer::from_writer(BufWriter::new(file));
        wtr.write_record(&["country", "day", "date", self.metric.name()])?;
        for s in self.series.iter() {
            for p in s.points.iter() {
                wtr.write_record(&[
                    s.country.clone(),
                    p.day.to_string(),
                    p.date.to_string(),
                    p.value.to_string(),
                ])?;
            }
        }
        wtr.flush()?;
        info!("wrote aligned {} to {}", self.metric, fout.as_ref().display());
        Ok(())
    }
}

impl std::fmt::Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "country,day,date,{}\n", self.metric.name())?;
        for s in self.series.iter() {
            for p in s.points.iter() {
                write!(f, "{},{},{},{}\n", s.country, p.day, p.date, p.value)?
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smooth::Identity;
    use crate::{DailyRecord, TimeSeries};

    fn series(values: &[i64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                (
                    start + Duration::days(i as i64),
                    DailyRecord {
                        total_cases: Some(v),
                        ..DailyRecord::default()
                    },
                )
            })
            .collect()
    }

    fn d0() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
    }

    fn samples(values: &[f64]) -> Vec<(f64, f64)> {
        values.iter().enumerate().map(|(i, &v)| (i as f64, v)).collect()
    }

    #[test]
    fn detection_includes_the_point_before_the_jump() {
        let (start, points) = relative_points(d0(), &samples(&[10., 20., 250., 260.]), 150.);
        assert_eq!(start, Some(1));
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![20., 250., 260.]);
        let days: Vec<usize> = points.iter().map(|p| p.day).collect();
        assert_eq!(days, vec![0, 1, 2]);
    }

    #[test]
    fn once_passed_stays_passed() {
        let (_, points) = relative_points(d0(), &samples(&[0., 500., 510., 511.]), 100.);
        assert_eq!(points.len(), 4);
    }

    #[test]
    fn increase_equal_to_threshold_does_not_pass() {
        let (start, points) = relative_points(d0(), &samples(&[0., 100., 200.]), 100.);
        assert_eq!(start, None);
        assert!(points.is_empty());
        assert!(relative_points(d0(), &[], 1.).1.is_empty());
    }

    #[test]
    fn anchor_is_the_calendar_date_of_day_zero() {
        let store: RecordStore = vec![("Italy".to_string(), series(&[10, 20, 250, 260]))]
            .into_iter()
            .collect();
        let params = AlignParams {
            threshold: 150.,
            ..AlignParams::default()
        };
        let a = align(&store, &params, &Identity);
        assert_eq!(a.series[0].anchor, NaiveDate::from_ymd_opt(2020, 3, 2).unwrap());
        assert_eq!(a.bounds.max_day, 2);
        assert_eq!(a.bounds.max_value, 260.);
        assert_eq!(a.bounds.min_value, 0.);
    }

    #[test]
    fn day_limit_bounds_the_axis_but_not_the_series() {
        let store: RecordStore = vec![("Italy".to_string(), series(&[0, 500, 1000, 1500, 2000]))]
            .into_iter()
            .collect();
        let params = AlignParams {
            threshold: 100.,
            day_limit: Some(2),
            ..AlignParams::default()
        };
        let a = align(&store, &params, &Identity);
        assert_eq!(a.series[0].points.len(), 5);
        assert_eq!(a.bounds.max_day, 1);
        assert_eq!(a.bounds.max_value, 500.);
    }

    #[test]
    fn excluded_only_countries_still_get_bounds() {
        let store: RecordStore = vec![("China".to_string(), series(&[0, 500, 1000]))]
            .into_iter()
            .collect();
        let a = align(&store, &AlignParams::default(), &Identity);
        assert_eq!(a.bounds.max_value, 1000.);
    }

    #[test]
    fn empty_store_aligns_to_nothing() {
        let a = align(&RecordStore::default(), &AlignParams::default(), &Identity);
        assert!(a.is_empty());
        assert_eq!(a.bounds.max_value, 0.);
    }

    #[test]
    fn display_lists_dates_from_the_anchor() {
        let store: RecordStore = vec![("Italy".to_string(), series(&[10, 20, 250]))]
            .into_iter()
            .collect();
        let params = AlignParams {
            threshold: 150.,
            ..AlignParams::default()
        };
        let text = align(&store, &params, &Identity).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "country,day,date,total_cases");
        assert_eq!(lines[1], "Italy,0,2020-03-02,20");
        assert_eq!(lines[2], "Italy,1,2020-03-03,250");
    }

    #[test]
    fn dates_skip_the_days_the_source_skipped() {
        let ts: TimeSeries = vec![(1, 10), (2, 500), (4, 900)]
            .into_iter()
            .map(|(day, v)| {
                (
                    NaiveDate::from_ymd_opt(2020, 3, day).unwrap(),
                    DailyRecord {
                        total_cases: Some(v),
                        ..DailyRecord::default()
                    },
                )
            })
            .collect();
        let store: RecordStore = vec![("Italy".to_string(), ts)].into_iter().collect();
        let params = AlignParams {
            threshold: 100.,
            ..AlignParams::default()
        };
        let a = align(&store, &params, &Identity);
        let days: Vec<(usize, NaiveDate)> = a.series[0].points.iter().map(|p| (p.day, p.date)).collect();
        assert_eq!(
            days,
            vec![
                (0, NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()),
                (1, NaiveDate::from_ymd_opt(2020, 3, 2).unwrap()),
                (2, NaiveDate::from_ymd_opt(2020, 3, 4).unwrap()),
            ]
        );
        let text = a.to_string();
        assert_eq!(text.lines().last(), Some("Italy,2,2020-03-04,900"));

        let dir = tempfile::tempdir().unwrap();
        let fout = dir.path().join("TotalCasesWD.csv");
        a.to_csv(&fout).unwrap();
        let written = std::fs::read_to_string(&fout).unwrap();
        assert_eq!(written.lines().last(), Some("Italy,2,2020-03-04,900"));
    }
}
