//! awj-sync - client-side state sync for Analog Way processors
//!
//! Feeds recorded or piped device updates through the subscription engine and
//! shows the resulting display variables.

use anyhow::{Context, Result};
use awj_sync::cli;
use awj_sync::config::{watcher::ConfigWatcher, AppConfig};
use awj_sync::feed;
use awj_sync::session::{InitTarget, Session, SessionHandle};
use awj_sync::sinks::{ReactionLog, VariableStore};
use awj_sync::state::MirrorSnapshot;
use clap::Parser;
use colored::*;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// AWJ state sync - mirror device state and dispatch path subscriptions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// JSON-lines update feed to replay ('-' for stdin)
    #[arg(short, long)]
    feed: Option<String>,

    /// Interactive prompt after the feed (or instead of it)
    #[arg(long)]
    repl: bool,

    /// Restore the mirror from a snapshot before priming
    #[arg(long)]
    restore: Option<String>,

    /// Write a mirror snapshot on exit
    #[arg(long)]
    dump: Option<String>,

    /// Connection identity to record in the local namespace
    #[arg(long, env = "AWJ_CONNECTION_ID")]
    connection_id: Option<String>,

    /// List the subscriptions of the configured family and exit
    #[arg(long)]
    list_subscriptions: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level, args.log_json)?;

    info!("Starting awj-sync v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let (config_watcher, initial_config) = ConfigWatcher::new(args.config.clone()).await?;
    let config = (*initial_config).clone();

    let variables = Arc::new(VariableStore::new());
    let reactions = Arc::new(ReactionLog::new());

    let mut session = Session::connect(
        config.device.family,
        config.settings(),
        variables.clone(),
        reactions.clone(),
    )
    .context("Failed to register the family catalog")?;

    if args.list_subscriptions {
        list_subscriptions(&session);
        return Ok(());
    }

    for watch in &config.watches {
        session
            .watch(watch)
            .with_context(|| format!("Failed to register watch '{}'", watch.name))?;
    }

    if let Some(path) = &args.restore {
        let snapshot = MirrorSnapshot::load_from_file(path).await?;
        session.restore(&snapshot);
        info!("Mirror restored from {}", path);
    }

    let handle = SessionHandle::spawn(session);

    if let Some(id) = &args.connection_id {
        handle.set_connection_id(id.clone());
    }

    let primed = handle.prime(InitTarget::All).await?;
    info!(
        "Subscriptions primed: {} reaction(s), refresh {}",
        primed.reactions.len(),
        primed.refresh
    );

    run_app(&args, config, handle.clone(), variables.clone(), config_watcher, shutdown_signal()).await?;

    if let Some(path) = &args.dump {
        handle.snapshot().await?.save_to_file(path).await?;
        info!("Mirror snapshot written to {}", path);
    }

    if !args.repl {
        println!("\n{}", "Variables:".bold());
        cli::print_variables(&variables, None);
    }

    info!(
        "awj-sync shutdown complete ({} re-evaluation pass(es), {} refresh(es))",
        reactions.passes().len(),
        reactions.refreshes()
    );
    Ok(())
}

async fn run_app(
    args: &Args,
    mut config: AppConfig,
    handle: SessionHandle,
    variables: Arc<VariableStore>,
    mut config_watcher: ConfigWatcher,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let work = drive(args, handle.clone(), variables);
    tokio::pin!(work);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut work => {
                result?;
                break;
            }

            Some(new_config) = config_watcher.next_config() => {
                info!("Configuration file changed, syncing watches...");

                if new_config.device.family != config.device.family
                    || new_config.selection.sync != config.selection.sync
                {
                    warn!("Device family or selection sync changed; restart to apply");
                }

                match handle.sync_watches(new_config.watches.clone()).await {
                    Ok(outcome) => {
                        debug!("Watch sync primed {} reaction(s)", outcome.reactions.len());
                        config = new_config;
                    }
                    Err(e) => warn!("Failed to sync watches (keeping old ones): {:#}", e),
                }
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping");
                break;
            }
        }
    }

    Ok(())
}

/// Replay the feed, then hand over to the REPL; idle when neither is asked for
async fn drive(args: &Args, handle: SessionHandle, variables: Arc<VariableStore>) -> Result<()> {
    if let Some(source) = &args.feed {
        let forwarded = if source == "-" {
            feed::pump(BufReader::new(tokio::io::stdin()), &handle).await?
        } else {
            let file = tokio::fs::File::open(source)
                .await
                .with_context(|| format!("Failed to open feed: {}", source))?;
            feed::pump(BufReader::new(file), &handle).await?
        };
        // Round-trip so every queued message is applied before we go on
        handle.subscriptions().await?;
        info!("Feed finished: {} message(s)", forwarded);
    }

    if args.repl {
        return cli::run_repl(handle, variables).await;
    }

    if args.feed.is_none() {
        info!("No feed and no REPL, waiting for CTRL+C");
        std::future::pending::<()>().await;
    }

    Ok(())
}

fn list_subscriptions(session: &Session) {
    println!(
        "\n{}",
        format!("=== Subscriptions ({}) ===", session.family()).bold().cyan()
    );
    for sub in session.registry().snapshot() {
        let reactions: Vec<&str> = sub.reactions.iter().map(|r| r.as_str()).collect();
        println!("  {}", sub.name.bright_white());
        println!("    pattern:   {}", sub.pattern.as_str().green());
        if !reactions.is_empty() {
            println!("    reactions: {}", reactions.join(", ").yellow());
        }
        if sub.handler.is_some() {
            println!("    handler:   {}", "yes".dimmed());
        }
    }
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
