//! Mangoose CLI - incremental manga chapter downloader.

use anyhow::Context;
use clap::{ArgGroup, Parser};
use mangoose::config::{CONFIG_FILENAME, ConfigStore};
use mangoose::error::Result;
use mangoose::fetcher::HttpFetcher;
use mangoose::logging::{self, LogOptions};
use mangoose::scrapers::ScraperRegistry;
use mangoose::sync::{SyncReport, Synchronizer};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Downloads new chapters of the manga series you follow.
#[derive(Parser, Debug)]
#[command(name = "mangoose")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("action").args(["new_series", "auto", "delete"])))]
#[command(
    after_help = "Example: mangoose -n \"Boku no Hero Academia\" https://readms.net/manga/my_hero_academia -d ~/manga -l"
)]
struct Args {
    /// Sets the destination folder for downloaded series.
    #[arg(short = 'd', long, value_name = "PATH")]
    set_downloads_folder: Option<PathBuf>,

    /// Adds a series to the download list, given its name and chapter index URL.
    #[arg(short = 'n', long, num_args = 2, value_names = ["NAME", "URL"])]
    new_series: Option<Vec<String>>,

    /// Downloads every tracked series, skipping chapters already downloaded.
    #[arg(short, long)]
    auto: bool,

    /// Removes a series from the download list. This can't be undone.
    #[arg(long, value_name = "NAME")]
    delete: Option<String>,

    /// Also writes log output to mangoose.log.
    #[arg(short, long)]
    log: bool,

    /// Turns off console output.
    #[arg(short, long)]
    quiet: bool,

    /// Shows debug messages on the console.
    #[arg(short, long)]
    verbose: bool,

    /// Settings file holding tracked series and download progress.
    #[arg(long, value_name = "PATH", default_value = CONFIG_FILENAME)]
    settings: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_options = LogOptions {
        console: !args.quiet,
        file_dir: args.log.then(|| PathBuf::from(".")),
        verbose: args.verbose,
    };
    let _log_guard = match logging::init(&log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to set up logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut store = ConfigStore::open(args.settings.clone())
        .with_context(|| format!("Failed to load {}", args.settings.display()))?;
    let registry = ScraperRegistry::new();

    // The folder change applies before any action so a sync uses it
    if let Some(folder) = &args.set_downloads_folder {
        store
            .set_downloads_folder(folder)
            .context("Failed to set downloads folder")?;
    }

    if let Some([name, url]) = args.new_series.as_deref() {
        match registry.find_for_url(url) {
            Some(scraper) => info!("{} will be downloaded from {}.", name, scraper.name()),
            None => warn!(
                "No scraper recognises {}; this series will be skipped when downloading.",
                url
            ),
        }
        store.add_series(name, url).context("Failed to add series")?;
    }

    if let Some(name) = &args.delete {
        store
            .delete_series(name)
            .context("Failed to delete series")?;
    }

    if args.auto {
        let fetcher = HttpFetcher::new().context("Failed to create HTTP client")?;
        let report = Synchronizer::new(&mut store, &fetcher, &registry)
            .sync_all()
            .await
            .context("Synchronization aborted")?;
        log_summary(&report);
    }

    Ok(())
}

fn log_summary(report: &SyncReport) {
    for series in &report.series {
        if series.error.is_some() {
            continue;
        }
        info!(
            "{}: {} new, {} already downloaded.",
            series.name,
            series.downloaded.len(),
            series.skipped
        );
        for (chapter, reason) in &series.failed {
            warn!("{}: chapter {} will be retried next run ({})", series.name, chapter, reason);
        }
    }
}
