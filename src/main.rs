use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use usagescope::analysis::Inspector;
use usagescope::config::AnalysisParameters;
use usagescope::export::{export, ExportData, ExportFormat};
use usagescope::logger;
use usagescope::oracle::{PackageCache, SnapshotWorkspace, SpecificationChain};

#[derive(Parser)]
#[command(name = "usagescope")]
#[command(author = "Zachary Woods <143150513+zach-fau@users.noreply.github.com>")]
#[command(version)]
#[command(about = "Measures how much of each declared package dependency a codebase actually uses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored log output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze package usage for every project of a workspace snapshot
    Inspect(InspectArgs),
    /// Show version information
    Version,
}

#[derive(Args)]
struct InspectArgs {
    /// Workspace snapshot (JSON)
    snapshot: PathBuf,

    /// Package cache directory (defaults to $USAGESCOPE_PACKAGE_CACHE)
    #[arg(long)]
    package_cache: Option<PathBuf>,

    /// Comma separated metrics: usage, scattering, transitive-count
    #[arg(long)]
    metrics: Option<String>,

    /// Comma separated namespace prefixes to ignore
    #[arg(long)]
    exclude_namespaces: Option<String>,

    /// Comma separated project names to skip
    #[arg(long)]
    exclude_projects: Option<String>,

    /// Also list packages without any metric value
    #[arg(long)]
    show_all: bool,

    /// Maximum number of projects analyzed at once
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Report format: markdown, json or csv
    #[arg(short, long, default_value = "markdown")]
    format: ExportFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("usagescope v{}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Commands::Inspect(args) => {
            logger::init_logger(cli.verbose, cli.quiet, cli.no_color);

            match inspect(args).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

async fn inspect(args: InspectArgs) -> Result<()> {
    let parameters = AnalysisParameters::from_lists(
        args.exclude_projects.as_deref(),
        args.exclude_namespaces.as_deref(),
        args.metrics.as_deref(),
        args.max_concurrency,
        args.show_all,
    )
    .context("Invalid analysis parameters")?;

    let workspace = SnapshotWorkspace::load(&args.snapshot).with_context(|| {
        format!(
            "Failed to load workspace snapshot {}",
            args.snapshot.display()
        )
    })?;

    let mut specifications =
        SpecificationChain::new().with(Arc::new(workspace.specifications().clone()));
    if let Some(cache) = args
        .package_cache
        .map(PackageCache::new)
        .or_else(PackageCache::from_env)
    {
        info!("Using package cache at {}", cache.root().display());
        specifications = specifications.with(Arc::new(cache));
    }

    let mut data = ExportData::new(
        workspace.name(),
        parameters.metrics().to_vec(),
        parameters.show_all(),
    );
    let inspector = Arc::new(Inspector::new(Arc::new(specifications), parameters));

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling analysis");
            interrupt.cancel();
        }
    });

    let mut results = inspector.analyze_solution(Arc::new(workspace), cancel.clone());
    while let Some(result) = results.next().await {
        info!(
            "{}: {} ({} ms)",
            result.name,
            result.state,
            result.elapsed.as_millis()
        );
        data.add_project(&result);
    }

    if cancel.is_cancelled() {
        bail!("Analysis cancelled");
    }

    data.sort_projects();
    let mut stdout = io::stdout().lock();
    export(args.format, &data, &mut stdout).context("Failed to write report")?;

    Ok(())
}
