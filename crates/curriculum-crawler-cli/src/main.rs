//! Curriculum Crawler CLI entry point.

use std::num::NonZeroUsize;
use std::path::Path;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use curriculum_crawler::{storage, ChromiumDriver, CrawlConfig, Crawler, CurriculumDataset};
use curriculum_crawler_cli::config::resolve_data_path;
use curriculum_crawler_cli::{repl, summary};

#[derive(Parser)]
#[command(
    name = "curriculum",
    about = "Crawl the Júpiter Web curriculum wizard and browse institutions, programs, and disciplines",
    version
)]
struct Cli {
    /// Process at most this many institutions.
    max_units: Option<NonZeroUsize>,

    /// Crawl again even if a cached data file exists.
    #[arg(long)]
    fresh: bool,

    /// Path to the JSON data file.
    #[arg(short, long)]
    data: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Exit after loading or crawling instead of opening the console.
    #[arg(long)]
    no_console: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the data file and print its counts.
    Validate,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   curriculum completions bash > ~/.local/share/bash-completion/completions/curriculum
    ///   curriculum completions zsh > ~/.zfunc/_curriculum
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let data_path = resolve_data_path(cli.data.as_deref());

    match cli.command {
        Some(Commands::Validate) => {
            match storage::load(&data_path) {
                Ok(dataset) => {
                    println!("Valid data file: {}", data_path.display());
                    print!("{}", summary::dataset_summary(&dataset));
                }
                Err(e) => {
                    eprintln!("Invalid data file: {e}");
                    std::process::exit(1);
                }
            }
            return Ok(());
        }

        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "curriculum", &mut std::io::stdout());
            return Ok(());
        }

        None => {}
    }

    let cached = if cli.fresh {
        None
    } else {
        load_cached(&data_path)
    };

    let dataset = match cached {
        Some(dataset) => dataset,
        None => match crawl(cli.max_units, &data_path).await? {
            Some(dataset) => dataset,
            None => std::process::exit(1),
        },
    };

    if !cli.no_console {
        repl::run(&dataset)?;
    }

    Ok(())
}

/// The cached dataset, if the data file exists and holds any data.
fn load_cached(path: &Path) -> Option<CurriculumDataset> {
    if !path.exists() {
        return None;
    }
    let dataset = storage::load_or_empty(path);
    if dataset.is_empty() {
        tracing::warn!("No usable cached data in {}, crawling again", path.display());
        return None;
    }
    print!("{}", summary::dataset_summary(&dataset));
    Some(dataset)
}

/// Crawl, save whatever was accumulated, and print a summary. `None` when
/// the crawl failed fatally before collecting any institution.
async fn crawl(
    max_units: Option<NonZeroUsize>,
    data_path: &Path,
) -> anyhow::Result<Option<CurriculumDataset>> {
    let config = CrawlConfig::from_env().with_max_institutions(max_units.map(NonZeroUsize::get));
    match config.max_institutions {
        Some(max) => tracing::info!("Starting crawl of up to {max} institutions"),
        None => tracing::info!("Starting crawl of all institutions"),
    }

    let crawler = Crawler::new(config.clone())?;
    let driver = match ChromiumDriver::launch(&config).await {
        Ok(driver) => driver,
        Err(e) => {
            tracing::error!("{e}");
            return Ok(None);
        }
    };

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        tracing::warn!("Interrupted, stopping crawl");
    };
    let report = crawler.run(Box::new(driver), shutdown).await;

    print!("{}", summary::crawl_summary(&report));

    if !report.dataset.institutions.is_empty() {
        if let Err(e) = storage::save(&report.dataset, data_path) {
            tracing::error!("Failed to save {}: {e}", data_path.display());
        }
    }

    if report.fatal.is_some() && report.dataset.institutions.is_empty() {
        return Ok(None);
    }
    Ok(Some(report.dataset))
}
