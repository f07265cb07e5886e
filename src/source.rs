use crate::alias::AliasTable;
use crate::config::{ChartSpec, SourceUrls};
use crate::error::{CovidError, Result};
use crate::fetch::Fetcher;
use crate::{jhu, owid, Metric, RecordStore};
use log::info;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// daily deltas, no recoveries
    OurWorldInData,
    /// cumulative totals in three files
    JohnsHopkins,
}

impl Source {
    /// ourworldindata unless only johns hopkins is asked for
    pub fn from_flags(jh: bool, wd: bool) -> Source {
        if jh && !wd {
            Source::JohnsHopkins
        } else {
            Source::OurWorldInData
        }
    }

    /// appended to the output file names
    pub fn suffix(self) -> &'static str {
        match self {
            Source::OurWorldInData => "WD",
            Source::JohnsHopkins => "JH",
        }
    }

    pub fn urls(self, urls: &SourceUrls) -> Vec<String> {
        match self {
            Source::OurWorldInData => vec![urls.owid.clone()],
            Source::JohnsHopkins => vec![
                urls.jh_confirmed.clone(),
                urls.jh_deaths.clone(),
                urls.jh_recovered.clone(),
            ],
        }
    }

    /// where the downloaded files are kept: folder/<tag><url file name>
    pub fn cache_paths(self, urls: &SourceUrls, folder: &Path, tag: &str) -> Vec<PathBuf> {
        self.urls(urls)
            .iter()
            .map(|u| folder.join(format!("{}{}", tag, url_file_name(u))))
            .collect()
    }

    pub fn download(
        self,
        fetcher: &Fetcher,
        urls: &SourceUrls,
        folder: &Path,
        tag: &str,
    ) -> Result<Vec<PathBuf>> {
        let paths = self.cache_paths(urls, folder, tag);
        for (url, path) in self.urls(urls).iter().zip(paths.iter()) {
            fetcher.download(url, path)?;
        }
        Ok(paths)
    }

    /// reads the cached files, in the order given by cache_paths
    pub fn load(self, paths: &[PathBuf], aliases: &AliasTable) -> Result<RecordStore> {
        let store = match (self, paths) {
            (Source::OurWorldInData, [p]) => owid::from_csv(p, aliases)?,
            (Source::JohnsHopkins, [confirmed, deaths, recovered]) => {
                jhu::from_csvs(confirmed, deaths, recovered, aliases)?
            }
            _ => {
                return Err(CovidError::SourceFiles {
                    expected: self.urls(&SourceUrls::default()).len(),
                    found: paths.len(),
                })
            }
        };
        info!("{:?}: {} countries", self, store.len());
        Ok(store)
    }

    pub fn default_charts(self) -> Vec<ChartSpec> {
        let mut charts = vec![
            ChartSpec::new(Metric::TotalCases, "Total Cases", "TotalCases", 150.),
            ChartSpec::new(Metric::TotalDeaths, "Total Deaths", "TotalDeaths", 7.),
        ];
        if self == Source::JohnsHopkins {
            charts.push(ChartSpec::new(
                Metric::TotalRecoveries,
                "Total Recoveries",
                "TotalRecoveries",
                10.,
            ));
            charts.push(ChartSpec::new(
                Metric::TotalActiveCases,
                "Total Active Cases",
                "TotalActiveCases",
                150.,
            ));
        }
        charts
    }
}

/// last path segment of the url, without query
fn url_file_name(url: &str) -> &str {
    let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}
