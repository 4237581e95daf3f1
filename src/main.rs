use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use stack_tracker::cli::{self, prompt};
use stack_tracker::config::{self, DEFAULT_CONFIG_FILE, TrackerConfig};
use stack_tracker::package::types::{Category, UnknownCategory};
use stack_tracker::reconcile::Reconciler;
use stack_tracker::refresh::{RefreshScope, Refresher};
use stack_tracker::scheduler::Scheduler;
use stack_tracker::server::{self, AppState};
use stack_tracker::store::query::names_match;
use stack_tracker::store::{SnapshotStore, TrendingSort};

#[derive(Parser)]
#[command(name = "stack-tracker")]
#[command(version, about = "Track versions and popularity of npm, PyPI and GitHub packages")]
struct Cli {
    /// Tracker configuration file
    #[arg(long, global = true, env = "STACK_TRACKER_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Snapshot store file [default: <data dir>/stacks_data.json]
    #[arg(long, global = true, env = "STACK_TRACKER_STORE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API with scheduled refreshes
    Serve {
        #[arg(long, env = "STACK_TRACKER_BIND", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,
    },
    /// Refresh package data now
    Update {
        /// Only refresh fast-moving packages
        #[arg(long)]
        fast: bool,
    },
    /// List stored packages grouped by category
    List {
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
    },
    /// Show one package with its history
    Show { name: String },
    /// Search packages by name
    Search { query: String },
    /// Rank packages by a popularity metric
    Trending {
        /// stars, downloads, forks or combined
        #[arg(long, default_value = "downloads")]
        sort_by: TrendingSort,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// List packages not checked recently
    Outdated {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Add a package to the configuration interactively
    AddPackage,
}

/// Strict parse; `From<String>` maps unknown tags to `other`
fn parse_category(s: &str) -> Result<Category, UnknownCategory> {
    s.parse()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let store_path = cli.store.clone().unwrap_or_else(config::store_path);

    let log_dir = match cli.command {
        Command::Serve { .. } => {
            let dir = config::log_dir();
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {:?}", dir))?;
            Some(dir)
        }
        _ => None,
    };
    let _guard = stack_tracker::logging::init(log_dir.as_deref());

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli, store_path))
}

async fn run(args: Cli, store_path: PathBuf) -> anyhow::Result<()> {
    let mut stdout = io::stdout();

    match args.command {
        Command::Serve { bind } => serve(&args.config, &store_path, bind).await,
        Command::Update { fast } => {
            let refresher = build_refresher(&args.config, &store_path)?;
            let scope = if fast {
                RefreshScope::FastMoving
            } else {
                RefreshScope::Full
            };
            let report = refresher.run(scope).await;
            cli::render_update_summary(&mut stdout, &report)?;
            if !report.is_saved() {
                bail!("Refresh results could not be saved to {:?}", store_path);
            }
            Ok(())
        }
        Command::List { category } => {
            let store = SnapshotStore::new(&store_path);
            let records = match category {
                Some(category) => store.by_category(category),
                None => store.load(),
            };
            Ok(cli::render_list(&mut stdout, &records, category)?)
        }
        Command::Show { name } => {
            let store = SnapshotStore::new(&store_path);
            let Some((_, stored)) = store
                .load_with_history()
                .into_iter()
                .find(|(key, _)| names_match(key, &name))
            else {
                bail!("Package '{}' not found", name);
            };
            Ok(cli::render_show(&mut stdout, &stored.record, &stored.history)?)
        }
        Command::Search { query } => {
            let store = SnapshotStore::new(&store_path);
            Ok(cli::render_search(&mut stdout, &query, &store.search(&query))?)
        }
        Command::Trending { sort_by, limit } => {
            let store = SnapshotStore::new(&store_path);
            Ok(cli::render_trending(&mut stdout, &store.trending(sort_by, limit), sort_by)?)
        }
        Command::Outdated { days } => {
            let store = SnapshotStore::new(&store_path);
            let records = store.outdated(days)?;
            Ok(cli::render_outdated(&mut stdout, &records, days, Utc::now())?)
        }
        Command::AddPackage => add_package(&args.config, &mut stdout),
    }
}

fn load_config(path: &Path) -> anyhow::Result<TrackerConfig> {
    TrackerConfig::load(path).with_context(|| format!("Failed to load configuration {:?}", path))
}

fn build_refresher(config_path: &Path, store_path: &Path) -> anyhow::Result<Refresher> {
    let config = load_config(config_path)?;
    let store = SnapshotStore::with_policy(store_path, config.snapshot);
    Ok(Refresher::new(
        Reconciler::default(),
        Arc::new(store),
        Arc::new(config),
    ))
}

async fn serve(config_path: &Path, store_path: &Path, bind: SocketAddr) -> anyhow::Result<()> {
    let refresher = Arc::new(build_refresher(config_path, store_path)?);
    let store = refresher.store().clone();

    if store.load().is_empty() {
        info!("Store is empty, running initial full refresh");
        let report = refresher.run(RefreshScope::Full).await;
        if !report.is_saved() {
            error!("Initial refresh could not be saved");
        }
    }

    let scheduler = Arc::new(Scheduler::new(refresher));
    scheduler.start();

    let state = AppState {
        store,
        scheduler: scheduler.clone(),
    };
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };
    let result = server::run_server(bind, state, shutdown).await;

    scheduler.stop().await;
    result.with_context(|| format!("HTTP server on {} failed", bind))
}

fn add_package(config_path: &Path, out: &mut impl Write) -> anyhow::Result<()> {
    let mut config = if config_path.exists() {
        load_config(config_path)?
    } else {
        TrackerConfig::default()
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let Some(package) = prompt::prompt_new_package(&mut input, out)? else {
        return Ok(());
    };

    config.add_package(&package.name, package.config, package.fast_moving)?;
    config
        .save(config_path)
        .with_context(|| format!("Failed to save configuration {:?}", config_path))?;

    writeln!(out, "Added {} to {}", package.name, config_path.display())?;
    writeln!(out, "Run 'stack-tracker update' to fetch its data")?;
    Ok(())
}
