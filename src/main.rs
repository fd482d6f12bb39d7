use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use genrehaku::config;
use genrehaku::fetchers::spotify::SpotifyClient;
use genrehaku::fetchers::websearch::WebSearchFallback;
use genrehaku::{
    BatchEvent, BatchOptions, BatchStats, GenreMap, GenreSource, LoftyStore, LookupChain,
    ProcessOptions, TagStore, run_batch, runner,
};

static EXAMPLES: &str = r"EXAMPLES:
    Fill in genres for every mp3 under a directory:
    genrehaku ~/Music

    Preview what would change without writing anything:
    genrehaku --dry-run ~/Music

    Only touch files with no genre yet, and set years too:
    genrehaku --only-missing-genre --update-year ~/Music

    Use a custom keyword mapping:
    genrehaku --mapping genres.json ~/Music";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    after_help = EXAMPLES
)]
struct Args {
    /// Directory scanned recursively for .mp3 files
    directory: PathBuf,

    /// Skip files that already carry a genre tag
    #[arg(long)]
    only_missing_genre: bool,

    /// Also write the release year when a lookup finds one
    #[arg(long)]
    update_year: bool,

    /// Worker pool size
    #[arg(long, default_value_t = runner::DEFAULT_JOBS)]
    jobs: usize,

    /// JSON file overriding the built-in keyword -> category mapping
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// Ask only Spotify, never the web-search fallback
    #[arg(long)]
    no_fallback: bool,

    /// Resolve and report without writing any tags
    #[arg(long)]
    dry_run: bool,

    /// Mirror log output into this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let file_config = config::load_config().await?;

    let mapping_path = args
        .mapping
        .clone()
        .or_else(|| file_config.mapping.as_ref().and_then(|m| m.file.clone()));
    let map = match &mapping_path {
        Some(path) => GenreMap::from_json_file(path)?,
        None => GenreMap::default(),
    };
    let map = Arc::new(map);

    let credentials = config::spotify_credentials(&file_config).with_context(|| {
        format!(
            "Spotify credentials missing: set {} and {} or add a [spotify] section to the config file",
            config::CLIENT_ID_VAR,
            config::CLIENT_SECRET_VAR
        )
    })?;

    let spotify = SpotifyClient::new(credentials).context("Failed to init Spotify client")?;
    let fallback: Option<Box<dyn GenreSource>> = if args.no_fallback {
        None
    } else {
        Some(Box::new(
            WebSearchFallback::new(map.clone()).context("Failed to init web search fallback")?,
        ))
    };
    let source: Arc<dyn GenreSource> = Arc::new(LookupChain::new(Box::new(spotify), fallback));
    let store: Arc<dyn TagStore> = Arc::new(LoftyStore);

    let cancel = Arc::new(AtomicBool::new(false));
    let interrupt_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight files");
            interrupt_flag.store(true, Ordering::Relaxed);
        }
    });

    let options = BatchOptions {
        root: args.directory.clone(),
        jobs: args.jobs,
        process: ProcessOptions {
            only_missing_genre: args.only_missing_genre,
            update_year: args.update_year,
            dry_run: args.dry_run,
        },
    };

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let batch = tokio::spawn(run_batch(store, source, map, options, event_tx, cancel));

    let mut progress = (0usize, 0usize);
    while let Some(event) = event_rx.recv().await {
        match event {
            BatchEvent::Progress { done, total } => progress = (done, total),
            BatchEvent::Log(line) => {
                if progress.1 > 0 {
                    println!("[{}/{}] {line}", progress.0, progress.1);
                } else {
                    println!("{line}");
                }
            }
            BatchEvent::Finished(_) => {}
        }
    }

    let stats = batch.await.context("Batch task failed")??;
    print_summary(&stats, args.dry_run);

    Ok(())
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Arc::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}

fn print_summary(stats: &BatchStats, dry_run: bool) {
    println!();
    if dry_run {
        println!("Dry run, nothing was written.");
    }
    println!("Total files:   {}", stats.total_files);
    println!("Processed:     {}", stats.processed_files);
    println!("Updated:       {}", stats.updated_files);
    println!("Errors:        {}", stats.error_files);
    println!("Not found:     {}", stats.not_found_files.len());

    if !stats.not_found_files.is_empty() {
        println!();
        println!("No genre found for:");
        for name in &stats.not_found_files {
            println!("  {name}");
        }
    }
}
