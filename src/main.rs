use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use log::{error, info, LevelFilter};
use url::Url;

use immoscrape::{
    config::{self, Config},
    immoweb::helpers::output_stem,
    logger::setup_logger,
    ListingProducer, OutputFormat,
};

#[derive(Parser, Debug)]
#[command(name = "scrape", about = "Scrape apartment listings from paginated search results")]
struct Cli {
    /// First results page, e.g. an Immoweb search URL
    #[arg(long, value_parser = parse_start_url)]
    start_url: String,

    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: u32,

    /// One or more output formats
    #[arg(long, value_enum, num_args = 1.., default_value = "csv")]
    out: Vec<OutputFormat>,

    /// Directory for output files, defaults to the configured output_dir
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// TOML config file, overrides CONFIG_PATH
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn parse_start_url(raw: &str) -> Result<String, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid URL '{raw}': {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(raw.to_string()),
        scheme => Err(format!("unsupported scheme '{scheme}', expected http or https")),
    }
}

fn apply_overrides(mut config: Config, cli: &Cli) -> Config {
    if cli.headful {
        config.headless = false;
    }
    if let Some(dir) = &cli.out_dir {
        config.output_dir = dir.display().to_string();
    }
    config
}

async fn run(cli: Cli) -> Result<()> {
    let config = apply_overrides(config::read_config(cli.config.as_deref())?, &cli);

    let mut formats: Vec<OutputFormat> = Vec::new();
    for format in &cli.out {
        if !formats.contains(format) {
            formats.push(*format);
        }
    }

    let (table, _summary) =
        ListingProducer::run_chromium(&config, &cli.start_url, cli.max_pages as usize).await?;

    table.write_files(
        &PathBuf::from(&config.output_dir),
        &output_stem(&cli.start_url),
        &formats,
    )?;

    info!("Rows: {}", table.len());
    Ok(())
}

/*
   The error is reported once through the logger; returning it from main
   as well would print it a second time
*/
fn report(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Scrape failed: {:?}", err);
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Usage errors exit here, before a browser is started or a file written
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(err) = setup_logger(level) {
        eprintln!("Failed to set up logging: {err}");
        return ExitCode::FAILURE;
    }

    report(run(cli).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_run_maps_to_failure_code() {
        let code = report(Err(anyhow::anyhow!("navigation failed")));
        assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::FAILURE));
    }

    #[test]
    fn successful_run_maps_to_success_code() {
        assert_eq!(format!("{:?}", report(Ok(()))), format!("{:?}", ExitCode::SUCCESS));
    }

    #[test]
    fn start_url_must_be_http() {
        assert!(parse_start_url("https://www.immoweb.be/en/search").is_ok());
        assert!(parse_start_url("ftp://www.immoweb.be/").is_err());
        assert!(parse_start_url("not a url").is_err());
    }
}
