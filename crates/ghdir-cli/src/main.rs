//! ghdir - fetch a single folder from a GitHub repository
//!
//! Usage:
//!   ghdir https://github.com/owner/repo/tree/main/src/lib

use anyhow::Result;
use clap::Parser;
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ghdir_core::prelude::*;

#[derive(Parser)]
#[command(name = "ghdir")]
#[command(about = "Fetch a single folder from a GitHub repository", long_about = None)]
struct Cli {
    /// Source URL, e.g. https://github.com/owner/repo/tree/main/src/lib
    url: String,

    /// Skip the large-download confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// Ignore the change cache and fetch even if the remote is unchanged
    #[arg(short, long)]
    force: bool,

    /// Suppress the progress bar
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ghdir=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("{} {err:#}", style("Error:").red().bold());
        let code = match err.downcast_ref::<FetchError>() {
            Some(FetchError::BackupRestoreFailed { .. }) => 2,
            _ => 1,
        };
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = ConfigStore::from_default_dir().load();
    let target = FetchTarget::parse_with_default_branch(&cli.url, &config.default_branch)?;

    println!("{}", style("ghdir • GitHub folder fetch").cyan().bold());
    println!("  {}/{} • {}", target.owner, target.repository, target.branch);
    if !target.subfolder.is_empty() {
        println!("  Folder: {}", target.subfolder);
    }

    let remote = RemoteClient::new(config.archive_host)?;
    let cache = ChangeCache::load_default();
    let work_dir = std::env::current_dir()?;
    let mut engine = FetchEngine::new(remote, cache, work_dir).with_force(cli.force);

    println!("\nChecking repository...");
    let plan = engine.plan(&target)?;
    tracing::debug!(
        strategy = ?plan.strategy,
        content_length = ?plan.content_length,
        "selected retrieval strategy"
    );

    if plan.strategy == Strategy::Unchanged {
        println!("{}", style("Already up to date.").green().bold());
        return Ok(());
    }

    if plan.needs_confirmation && !cli.yes && !confirm_large_download(&plan)? {
        println!("Aborted.");
        return Ok(());
    }

    let outcome = if plan.strategy == Strategy::SparseCheckout {
        println!("\nArchive is large; switching to git sparse-checkout...");
        engine.execute(&target, &plan, &mut NoopObserver)?
    } else {
        println!("\nDownloading archive...");
        let mut progress = DownloadProgress::new(plan.content_length, cli.quiet);
        let outcome = engine.execute(&target, &plan, &mut progress);
        progress.finish();
        outcome?
    };

    match outcome {
        FetchOutcome::Unchanged => {
            println!("{}", style("Already up to date.").green().bold());
        }
        FetchOutcome::Completed {
            entries_written, ..
        } => {
            println!(
                "\n{}",
                style(format!("Done! Fetched {entries_written} files and folders")).green().bold()
            );
            println!("  → ./{}", target.output_name());
        }
    }

    Ok(())
}

/// Ask before committing to a download past the confirmation threshold.
fn confirm_large_download(plan: &FetchPlan) -> Result<bool> {
    let size_mib = plan.content_length.unwrap_or(0) / (1024 * 1024);
    println!(
        "{}",
        style(format!(
            "Warning: the archive is large ({size_mib} MiB); downloading may take a while."
        ))
        .yellow()
        .bold()
    );
    let proceed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Continue?")
        .default(false)
        .interact()?;
    Ok(proceed)
}

/// Progress bar fed by the download byte stream.
struct DownloadProgress {
    bar: ProgressBar,
}

impl DownloadProgress {
    fn new(total: Option<u64>, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            match total {
                Some(length) => {
                    let bar = ProgressBar::new(length);
                    bar.set_style(
                        ProgressStyle::default_bar()
                            .template("  [{bar:30.cyan/dim}] {bytes:>9}/{total_bytes} {bytes_per_sec:>11}")
                            .unwrap()
                            .progress_chars("━╾─"),
                    );
                    bar
                }
                None => {
                    let bar = ProgressBar::new_spinner();
                    bar.set_style(
                        ProgressStyle::default_spinner()
                            .template("  {spinner} {bytes:>9} {bytes_per_sec:>11}")
                            .unwrap(),
                    );
                    bar
                }
            }
        };
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressObserver for DownloadProgress {
    fn on_bytes(&mut self, count: u64) {
        self.bar.inc(count);
    }
}
