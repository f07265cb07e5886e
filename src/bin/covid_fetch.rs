use anyhow::Context;
use covid_graphs::config::Config;
use covid_graphs::fetch::{parse_cli_fetch, Fetcher};
use covid_graphs::plot::date_tag;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let (source, folder, tagged, config) = parse_cli_fetch();
    let config = match config {
        Some(p) => Config::load(&p).with_context(|| format!("loading config {}", p.display()))?,
        None => Config::default(),
    };
    std::fs::create_dir_all(&folder)
        .with_context(|| format!("creating output folder {}", folder.display()))?;

    let fetcher = Fetcher::new(&config.fetch)?;
    let paths = source
        .download(&fetcher, &config.sources, &folder, &date_tag(tagged))
        .context("downloading the source data")?;
    let store = source
        .load(&paths, &config.alias_table())
        .context("reading the downloaded data")?;
    print!("{}", store);
    Ok(())
}
