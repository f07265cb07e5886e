use super::VERSION;
use crate::chart::ImageFormat;
use crate::config::Config;
use crate::smooth::Smoothing;
use crate::source::Source;
use crate::TAG_FORMAT;
use chrono::Local;
use clap::{App, Arg};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct PlotArgs {
    pub source: Source,
    pub format: ImageFormat,
    pub date_tag: bool,
    pub output_folder: PathBuf,
    pub config: Option<PathBuf>,
    /// read the cached source files instead of downloading them
    pub offline: bool,
    pub countries: Vec<String>,
    pub day_limit: Option<usize>,
    pub max_case: Option<f64>,
    pub smoothing: Option<Smoothing>,
    /// also write the aligned series as csv next to each chart
    pub csv: bool,
}

impl PlotArgs {
    /// Overrides the config with the values given on the command line;
    /// the chart list is resolved for the source so the limits apply to every chart.
    pub fn apply(&self, config: &mut Config) {
        if !self.countries.is_empty() {
            config.interested_countries = self.countries.clone();
        }
        if let Some(s) = self.smoothing {
            config.smoothing = s;
        }
        let mut charts = config.charts_for(self.source);
        for chart in charts.iter_mut() {
            if self.day_limit.is_some() {
                chart.day_limit = self.day_limit;
            }
            if self.max_case.is_some() {
                chart.max_case = self.max_case;
            }
        }
        config.charts = charts;
    }
}

/// YYYYMMDD_ of today, or nothing
pub fn date_tag(enabled: bool) -> String {
    if enabled {
        Local::now().format(TAG_FORMAT).to_string()
    } else {
        String::new()
    }
}

/// folder/<tag><stem><source suffix>.<extension>, e.g. 20200318_TotalCasesJH.png
pub fn output_path(folder: &Path, tag: &str, stem: &str, source: Source, format: ImageFormat) -> PathBuf {
    folder.join(format!(
        "{}{}{}.{}",
        tag,
        stem,
        source.suffix(),
        format.extension()
    ))
}

fn validate_number<T: std::str::FromStr>(v: String) -> Result<(), String> {
    v.parse::<T>()
        .map(|_| ())
        .map_err(|_| format!("{} is not a valid number", v))
}

/// Takes the CLI arguments that control the download, the alignment and the plotting.
pub fn parse_cli() -> PlotArgs {
    let arg_jh = Arg::with_name("jh")
        .help("use the johns hopkins data")
        .long("jh");
    let arg_wd = Arg::with_name("wd")
        .help("use the ourworldindata data (default)")
        .long("wd");
    let arg_png = Arg::with_name("png")
        .help("make png plots instead of svg")
        .long("png");
    let arg_tag = Arg::with_name("date_tag")
        .help("prefix the data and plot files with the date of today")
        .long("date-tag");
    let arg_folder = Arg::with_name("output_folder")
        .help("folder to store data and plots")
        .short("o")
        .long("output-folder")
        .takes_value(true)
        .default_value("./");
    let arg_config = Arg::with_name("config")
        .help("yaml file with aliases, country lists, smoothing, source urls and charts")
        .short("c")
        .long("config")
        .takes_value(true);
    let arg_offline = Arg::with_name("offline")
        .help("use the data already stored in the output folder")
        .long("offline");
    let arg_countries = Arg::with_name("countries")
        .help("plot only these countries, comma separated")
        .long("countries")
        .takes_value(true)
        .multiple(true)
        .use_delimiter(true);
    let arg_day_limit = Arg::with_name("day_limit")
        .help("number of days since the threshold used for the axis range")
        .long("day-limit")
        .takes_value(true)
        .validator(validate_number::<usize>);
    let arg_max_case = Arg::with_name("max_case")
        .help("upper limit of the y axis")
        .long("max-case")
        .takes_value(true)
        .validator(validate_number::<f64>);
    let arg_smoothing = Arg::with_name("smoothing")
        .help("smoothing applied before searching the threshold")
        .long("smoothing")
        .takes_value(true)
        .possible_values(&["none", "spline", "mavg"]);
    let arg_csv = Arg::with_name("csv")
        .help("also write the aligned series as csv")
        .long("csv");

    let cli_args = App::new("covid_plot")
        .version(VERSION.unwrap_or("unknown"))
        .about("cli app to plot the covid-19 trajectories of the countries from the day their daily increase passed a threshold")
        .arg(arg_jh)
        .arg(arg_wd)
        .arg(arg_png)
        .arg(arg_tag)
        .arg(arg_folder)
        .arg(arg_config)
        .arg(arg_offline)
        .arg(arg_countries)
        .arg(arg_day_limit)
        .arg(arg_max_case)
        .arg(arg_smoothing)
        .arg(arg_csv)
        .get_matches();

    let format = if cli_args.is_present("png") {
        ImageFormat::Png
    } else {
        ImageFormat::Svg
    };
    let countries: Vec<String> = cli_args
        .values_of("countries")
        .map(|v| v.map(|c| c.trim().to_string()).collect())
        .unwrap_or_default();
    PlotArgs {
        source: Source::from_flags(cli_args.is_present("jh"), cli_args.is_present("wd")),
        format,
        date_tag: cli_args.is_present("date_tag"),
        output_folder: PathBuf::from(cli_args.value_of("output_folder").unwrap_or("./")),
        config: cli_args.value_of("config").map(PathBuf::from),
        offline: cli_args.is_present("offline"),
        countries,
        day_limit: cli_args.value_of("day_limit").and_then(|v| v.parse().ok()),
        max_case: cli_args.value_of("max_case").and_then(|v| v.parse().ok()),
        smoothing: cli_args.value_of("smoothing").and_then(|v| v.parse().ok()),
        csv: cli_args.is_present("csv"),
    }
}
