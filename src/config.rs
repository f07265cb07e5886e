use crate::alias::AliasTable;
use crate::align::{AlignParams, DEFAULT_AXIS_EXCLUDE, DEFAULT_IGNORE};
use crate::error::Result;
use crate::smooth::Smoothing;
use crate::source::Source;
use crate::Metric;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    /// further attempts after the first failure
    pub retries: u32,
    /// wait before the first retry, doubled at every retry
    pub backoff_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> FetchSettings {
        FetchSettings {
            timeout_secs: 30,
            retries: 3,
            backoff_secs: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceUrls {
    pub owid: String,
    pub jh_confirmed: String,
    pub jh_deaths: String,
    pub jh_recovered: String,
}

impl Default for SourceUrls {
    fn default() -> SourceUrls {
        let jh = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series";
        SourceUrls {
            owid: "http://cowid.netlify.com/data/full_data.csv".to_string(),
            jh_confirmed: format!("{}/time_series_19-covid-Confirmed.csv", jh),
            jh_deaths: format!("{}/time_series_19-covid-Deaths.csv", jh),
            jh_recovered: format!("{}/time_series_19-covid-Recovered.csv", jh),
        }
    }
}

/// One chart to draw: which metric, how to align it, where to write it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChartSpec {
    pub metric: Metric,
    pub title: String,
    /// file name without tag, source suffix and extension, e.g. TotalCases
    pub file_stem: String,
    pub threshold: f64,
    #[serde(default)]
    pub day_limit: Option<usize>,
    #[serde(default)]
    pub max_case: Option<f64>,
}

impl ChartSpec {
    pub fn new(metric: Metric, title: &str, file_stem: &str, threshold: f64) -> ChartSpec {
        ChartSpec {
            metric,
            title: title.to_string(),
            file_stem: file_stem.to_string(),
            threshold,
            day_limit: None,
            max_case: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// added to the built-in alias table
    pub aliases: AliasTable,
    /// ignored on top of the source aggregates
    pub ignore_countries: Vec<String>,
    pub axis_exclude_countries: Vec<String>,
    /// all the countries when empty
    pub interested_countries: Vec<String>,
    pub smoothing: Smoothing,
    pub sources: SourceUrls,
    pub fetch: FetchSettings,
    /// the default charts of the source when empty
    pub charts: Vec<ChartSpec>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            aliases: AliasTable::empty(),
            ignore_countries: Vec::new(),
            axis_exclude_countries: DEFAULT_AXIS_EXCLUDE.iter().map(|c| c.to_string()).collect(),
            interested_countries: Vec::new(),
            smoothing: Smoothing::default(),
            sources: SourceUrls::default(),
            fetch: FetchSettings::default(),
            charts: Vec::new(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// the built-in aliases plus the configured ones
    pub fn alias_table(&self) -> AliasTable {
        let mut table = AliasTable::default();
        table.extend(&self.aliases);
        table
    }

    pub fn charts_for(&self, source: Source) -> Vec<ChartSpec> {
        if self.charts.is_empty() {
            source.default_charts()
        } else {
            self.charts.clone()
        }
    }

    /// the source aggregates plus the configured countries
    pub fn ignored(&self) -> Vec<String> {
        let mut ignore: Vec<String> = DEFAULT_IGNORE.iter().map(|c| c.to_string()).collect();
        for c in self.ignore_countries.iter() {
            if !ignore.contains(c) {
                ignore.push(c.clone());
            }
        }
        ignore
    }

    pub fn align_params(&self, chart: &ChartSpec) -> AlignParams {
        AlignParams {
            metric: chart.metric,
            threshold: chart.threshold,
            day_limit: chart.day_limit,
            interested: self.interested_countries.clone(),
            ignore: self.ignored(),
            axis_exclude: self.axis_exclude_countries.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_the_aligner_defaults() {
        let config = Config::default();
        let chart = ChartSpec::new(Metric::TotalCases, "Total Cases", "TotalCases", 200.);
        assert_eq!(config.align_params(&chart), AlignParams::default());
        assert_eq!(config.alias_table(), AliasTable::default());
    }

    #[test]
    fn load_reads_partial_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"aliases:
  Czechia: [Czech Republic]
interested_countries: [Italy, Germany]
smoothing:
  method: spline
fetch:
  retries: 1
charts:
  - metric: total_deaths
    title: Total Deaths
    file_stem: TotalDeaths
    threshold: 7
    day_limit: 30
",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.interested_countries, vec!["Italy", "Germany"]);
        assert_eq!(config.smoothing, Smoothing::Spline);
        assert_eq!(config.fetch.retries, 1);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert!(config.ignore_countries.is_empty());
        assert_eq!(config.ignored().len(), DEFAULT_IGNORE.len());
        let aliases = config.alias_table();
        assert_eq!(aliases.canonical("Czech Republic"), "Czechia");
        assert_eq!(aliases.canonical("Mainland China"), "China");
        let charts = config.charts_for(Source::JohnsHopkins);
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].metric, Metric::TotalDeaths);
        assert_eq!(charts[0].day_limit, Some(30));
        assert_eq!(charts[0].max_case, None);
    }

    #[test]
    fn configured_ignores_add_to_the_aggregates() {
        let config: Config = serde_yaml::from_str("ignore_countries: [Foo, World]\n").unwrap();
        let chart = ChartSpec::new(Metric::TotalCases, "Total Cases", "TotalCases", 200.);
        let ignore = config.align_params(&chart).ignore;
        assert_eq!(ignore.len(), DEFAULT_IGNORE.len() + 1);
        assert!(ignore.contains(&"World".to_string()));
        assert!(ignore.contains(&"Cruise Ship".to_string()));
        assert!(ignore.contains(&"Foo".to_string()));
    }

    #[test]
    fn empty_chart_list_uses_the_source_defaults() {
        let config = Config::default();
        assert_eq!(config.charts_for(Source::OurWorldInData).len(), 2);
        assert_eq!(config.charts_for(Source::JohnsHopkins).len(), 4);
    }

    #[test]
    fn bad_yaml_is_an_error() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"fetch: [not, a, map]\n").unwrap();
        assert!(Config::load(temp.path()).is_err());
    }
}
