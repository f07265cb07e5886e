use crate::alias::AliasTable;
use crate::error::{line_of, CovidError, Result};
use crate::{parse_count, DailyRecord, RecordStore, TimeSeries, JHU_DATE_FORMAT};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use log::{debug, info};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// province, country, latitude, longitude
pub const LEADING_COLUMNS: usize = 4;
const COUNTRY_COLUMN: usize = 1;

/// cumulative cases, deaths and recoveries of one country on one date
pub type Totals = [i64; 3];

const CASES: usize = 0;
const DEATHS: usize = 1;
const RECOVERIES: usize = 2;

type CountryTotals = BTreeMap<String, BTreeMap<NaiveDate, Totals>>;

pub fn from_csvs<P: AsRef<Path>>(
    confirmed: P,
    deaths: P,
    recovered: P,
    aliases: &AliasTable,
) -> Result<RecordStore> {
    info!(
        "reading johns hopkins data from {}, {}, {}",
        confirmed.as_ref().display(),
        deaths.as_ref().display(),
        recovered.as_ref().display()
    );
    from_readers(
        std::fs::File::open(confirmed.as_ref())?,
        std::fs::File::open(deaths.as_ref())?,
        std::fs::File::open(recovered.as_ref())?,
        aliases,
    )
}

pub fn from_readers<R: Read>(
    confirmed: R,
    deaths: R,
    recovered: R,
    aliases: &AliasTable,
) -> Result<RecordStore> {
    let mut totals = CountryTotals::new();
    accumulate(confirmed, CASES, aliases, &mut totals)?;
    accumulate(deaths, DEATHS, aliases, &mut totals)?;
    accumulate(recovered, RECOVERIES, aliases, &mut totals)?;
    info!("aggregated cumulative totals for {} countries", totals.len());
    let store: RecordStore = totals
        .into_iter()
        .map(|(country, by_date)| {
            debug!("{}: {} dates", country, by_date.len());
            (country, first_differences(by_date))
        })
        .collect();
    Ok(store)
}

/// Adds the regional rows of one stream into the slot of the per country totals.
/// Dates absent from the stream leave the slot at zero.
fn accumulate<R: Read>(
    rdr: R,
    slot: usize,
    aliases: &AliasTable,
    totals: &mut CountryTotals,
) -> Result<()> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(rdr);
    let headers = rdr.headers()?.clone();
    if headers.len() < LEADING_COLUMNS {
        return Err(CovidError::MissingColumn("Country/Region".to_string()));
    }
    let dates = headers
        .iter()
        .skip(LEADING_COLUMNS)
        .map(|h| {
            NaiveDate::parse_from_str(h, JHU_DATE_FORMAT).map_err(|_| CovidError::InvalidDate {
                line: 1,
                value: h.to_string(),
            })
        })
        .collect::<Result<Vec<NaiveDate>>>()?;

    for result in rdr.records() {
        let record = result?;
        let line = line_of(&record);
        if record.len() != headers.len() {
            return Err(CovidError::RowLength {
                line,
                expected: headers.len(),
                found: record.len(),
            });
        }
        let country = aliases.canonical(&record[COUNTRY_COLUMN]);
        let by_date = totals.entry(country.to_string()).or_default();
        for ((date, cell), header) in dates
            .iter()
            .zip(record.iter().skip(LEADING_COLUMNS))
            .zip(headers.iter().skip(LEADING_COLUMNS))
        {
            let count = parse_count(cell).ok_or_else(|| CovidError::InvalidCount {
                line,
                column: header.to_string(),
                value: cell.to_string(),
            })?;
            let total = &mut by_date.entry(*date).or_insert([0; 3])[slot];
            *total = total.checked_add(count).ok_or_else(|| CovidError::InvalidCount {
                line,
                column: header.to_string(),
                value: cell.to_string(),
            })?;
        }
    }
    Ok(())
}

/// Derives the daily records from cumulative totals iterated in date order.
/// The first date is differenced against zero; negative deltas are kept as they are.
pub fn first_differences(totals: BTreeMap<NaiveDate, Totals>) -> TimeSeries {
    let mut previous: Totals = [0; 3];
    totals
        .into_iter()
        .map(|(date, t)| {
            let daily = DailyRecord {
                new_cases: Some(t[CASES].saturating_sub(previous[CASES])),
                new_deaths: Some(t[DEATHS].saturating_sub(previous[DEATHS])),
                new_recoveries: Some(t[RECOVERIES].saturating_sub(previous[RECOVERIES])),
                total_cases: Some(t[CASES]),
                total_deaths: Some(t[DEATHS]),
                total_recoveries: Some(t[RECOVERIES]),
                total_active_cases: Some(t[CASES].saturating_sub(t[RECOVERIES])),
            };
            previous = t;
            (date, daily)
        })
        .collect()
}
