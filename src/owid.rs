use crate::alias::AliasTable;
use crate::error::{line_of, CovidError, Result};
use crate::{parse_count, DailyRecord, RecordStore, OWID_DATE_FORMAT};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use log::{debug, info};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

pub const REQUIRED_COLUMNS: [&str; 6] = [
    "date",
    "location",
    "new_cases",
    "new_deaths",
    "total_cases",
    "total_deaths",
];

fn column_indices(headers: &csv::StringRecord) -> Result<[usize; 6]> {
    let mut indices = [0usize; 6];
    for (i, column) in REQUIRED_COLUMNS.iter().enumerate() {
        indices[i] = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(column))
            .ok_or_else(|| CovidError::MissingColumn(column.to_string()))?;
    }
    Ok(indices)
}

pub fn from_csv<P: AsRef<Path>>(path: P, aliases: &AliasTable) -> Result<RecordStore> {
    let file = std::fs::File::open(path.as_ref())?;
    info!("reading ourworldindata data from {}", path.as_ref().display());
    from_reader(file, aliases)
}

/// Builds the record store; any malformed row fails the whole source.
pub fn from_reader<R: Read>(rdr: R, aliases: &AliasTable) -> Result<RecordStore> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(rdr);
    let headers = rdr.headers()?.clone();
    let cols = column_indices(&headers)?;

    // keyed by the name as written; a repeated row replaces the earlier one
    let mut raw: BTreeMap<(String, NaiveDate), (u64, DailyRecord)> = BTreeMap::new();
    let mut rows = 0usize;
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
        let date_cell = &record[cols[0]];
        let date = NaiveDate::parse_from_str(date_cell, OWID_DATE_FORMAT).map_err(|_| {
            CovidError::InvalidDate {
                line,
                value: date_cell.to_string(),
            }
        })?;
        let location = record[cols[1]].to_string();
        let count = |i: usize| -> Result<Option<i64>> {
            let cell = &record[cols[i]];
            match parse_count(cell) {
                Some(v) => Ok(Some(v)),
                None => Err(CovidError::InvalidCount {
                    line,
                    column: REQUIRED_COLUMNS[i].to_string(),
                    value: cell.to_string(),
                }),
            }
        };
        let daily = DailyRecord {
            new_cases: count(2)?,
            new_deaths: count(3)?,
            new_recoveries: None,
            total_cases: count(4)?,
            total_deaths: count(5)?,
            total_recoveries: None,
            total_active_cases: None,
        };
        if raw.insert((location, date), (line, daily)).is_some() {
            debug!("line {}: replaces an earlier row of the same date", line);
        }
        rows += 1;
    }

    // spellings of one country are summed
    let mut merged: BTreeMap<String, BTreeMap<NaiveDate, DailyRecord>> = BTreeMap::new();
    for ((location, date), (line, daily)) in raw {
        let country = aliases.canonical(&location).to_string();
        let slot = merged.entry(country).or_default().entry(date);
        match slot {
            Entry::Vacant(v) => {
                v.insert(daily);
            }
            Entry::Occupied(mut o) => {
                let sum = o.get().merge(&daily).map_err(|metric| CovidError::InvalidCount {
                    line,
                    column: metric.name().to_string(),
                    value: daily.get(metric).map(|v| v.to_string()).unwrap_or_default(),
                })?;
                o.insert(sum);
            }
        }
    }
    info!("read {} rows for {} countries", rows, merged.len());

    let store: RecordStore = merged
        .into_iter()
        .map(|(country, records)| {
            debug!("{}: {} dates", country, records.len());
            (country, records.into_iter().collect())
        })
        .collect();
    Ok(store)
}
