use super::VERSION;
use crate::config::FetchSettings;
use crate::error::Result;
use crate::source::Source;
use clap::{App, Arg};
use log::{info, warn};
use reqwest::blocking::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Blocking downloader with a request timeout and a bounded number of retries,
/// waiting twice as long before each new attempt.
pub struct Fetcher {
    client: Client,
    retries: u32,
    backoff: Duration,
}

impl Fetcher {
    pub fn new(settings: &FetchSettings) -> Result<Fetcher> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Fetcher::with_client(
            client,
            settings.retries,
            Duration::from_secs(settings.backoff_secs),
        ))
    }

    pub fn with_client(client: Client, retries: u32, backoff: Duration) -> Fetcher {
        Fetcher {
            client,
            retries,
            backoff,
        }
    }

    fn get_once(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }

    /// the body of url; the last error once the retries are used up
    pub fn get(&self, url: &str) -> Result<Vec<u8>> {
        let mut attempt = 0u32;
        loop {
            match self.get_once(url) {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.retries => {
                    let wait = self.backoff * 2u32.saturating_pow(attempt);
                    warn!("fetching {} failed, {}; trying again in {:?}", url, e, wait);
                    std::thread::sleep(wait);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn download<P: AsRef<Path>>(&self, url: &str, fout: P) -> Result<()> {
        let body = self.get(url)?;
        info!("saving {} to {}", url, fout.as_ref().display());
        std::fs::write(fout.as_ref(), body)?;
        Ok(())
    }
}

/// Takes the CLI arguments of the fetch app: source, output folder, date tag and config file.
pub fn parse_cli_fetch() -> (Source, PathBuf, bool, Option<PathBuf>) {
    let arg_jh = Arg::with_name("jh")
        .help("use the johns hopkins data")
        .long("jh");
    let arg_wd = Arg::with_name("wd")
        .help("use the ourworldindata data (default)")
        .long("wd");
    let arg_folder = Arg::with_name("output_folder")
        .help("folder to store the data")
        .short("o")
        .long("output-folder")
        .takes_value(true)
        .default_value("./");
    let arg_tag = Arg::with_name("date_tag")
        .help("prefix the files with the date of today")
        .long("date-tag");
    let arg_config = Arg::with_name("config")
        .help("yaml file with aliases, source urls and fetch settings")
        .short("c")
        .long("config")
        .takes_value(true);
    let cli_args = App::new("covid_fetch")
        .version(VERSION.unwrap_or("unknown"))
        .about("cli app to download the covid-19 time series and list the countries")
        .arg(arg_jh)
        .arg(arg_wd)
        .arg(arg_folder)
        .arg(arg_tag)
        .arg(arg_config)
        .get_matches();
    let source = Source::from_flags(cli_args.is_present("jh"), cli_args.is_present("wd"));
    let folder = PathBuf::from(cli_args.value_of("output_folder").unwrap_or("./"));
    let date_tag = cli_args.is_present("date_tag");
    let config = cli_args.value_of("config").map(PathBuf::from);
    (source, folder, date_tag, config)
}
