use anyhow::Context;
use covid_graphs::align::align;
use covid_graphs::chart::{render, ChartOptions};
use covid_graphs::config::Config;
use covid_graphs::fetch::Fetcher;
use covid_graphs::plot::{date_tag, output_path, parse_cli};
use covid_graphs::CovidError;
use log::{info, warn};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = parse_cli();

    let mut config = match &args.config {
        Some(p) => Config::load(p).with_context(|| format!("loading config {}", p.display()))?,
        None => Config::default(),
    };
    args.apply(&mut config);

    let folder = &args.output_folder;
    std::fs::create_dir_all(folder)
        .with_context(|| format!("creating output folder {}", folder.display()))?;
    let tag = date_tag(args.date_tag);

    let paths = if args.offline {
        info!("using the data stored in {}", folder.display());
        args.source.cache_paths(&config.sources, folder, &tag)
    } else {
        let fetcher = Fetcher::new(&config.fetch)?;
        args.source
            .download(&fetcher, &config.sources, folder, &tag)
            .context("downloading the source data")?
    };
    let store = args
        .source
        .load(&paths, &config.alias_table())
        .context("reading the source data")?;
    println!("Countries: {}", store.countries().collect::<Vec<_>>().join(", "));

    let smoother = config.smoothing.smoother();
    for chart in config.charts.iter() {
        let params = config.align_params(chart);
        let alignment = align(&store, &params, smoother.as_ref());
        let fout = output_path(folder, &tag, &chart.file_stem, args.source, args.format);
        let mut opts = ChartOptions::new(&chart.title, chart.metric);
        opts.max_case = chart.max_case;
        match render(&alignment, &opts, &fout, args.format) {
            Ok(()) => {}
            Err(CovidError::NothingToPlot(title)) => {
                warn!(
                    "skipping {}, no country increased by more than {} in a day",
                    title, chart.threshold
                );
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("plotting {}", fout.display())),
        }
        if args.csv {
            alignment.to_csv(fout.with_extension("csv"))?;
        }
    }
    Ok(())
}
