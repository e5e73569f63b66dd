//! Roundtrip command line.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use eyre::{eyre, Error, Result};
use log::{error, info};

use roundtrip::arb::graph::{GraphSnapshot, RateGraph};
use roundtrip::bot::{self, Driver};
use roundtrip::config::Config;
use roundtrip::notify::{Notifier, OpportunityLog, SlackNotifier};
use roundtrip::sync::{partition_pairs, OneInchClient};
use roundtrip::utils::logger::setup_logger;
use roundtrip::utils::shutdown;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// Detects arbitrage cycles across a basket of tokens
struct Cli {
    /// Command to run, `start` when omitted
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
/// Available commands
enum Commands {
    /// Fetch rates and detect arbitrage until Ctrl-C
    Start(Overrides),
    /// Detect arbitrage once in a JSON rate graph
    Detect {
        /// File holding `{"USDT": {"ETH": 0.0005}, ...}`
        graph: PathBuf,
        /// Also send opportunities to Slack
        #[arg(long)]
        notify: bool,
    },
    /// Send slack message
    Slack {
        /// Text to post
        message: String,
    },
    /// Print the pairs each fetch worker owns
    Pairs(Overrides),
}

#[derive(Args)]
/// Command line settings taking precedence over the environment
struct Overrides {
    /// Number of fetch workers
    #[arg(long)]
    workers: Option<usize>,
    /// Global quote requests per second
    #[arg(long)]
    rate_limit: Option<f64>,
    /// Seconds between detection passes
    #[arg(long)]
    interval: Option<f64>,
}

impl Overrides {
    /// Applies the overrides to `config` and validates the result
    fn apply(self, mut config: Config) -> Result<Config> {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(rate_limit) = self.rate_limit {
            config.rate_limit = rate_limit;
        }
        if let Some(interval) = self.interval {
            config.detect_interval = std::time::Duration::try_from_secs_f64(interval)
                .map_err(|e| eyre!("Invalid interval '{interval}': {e}"))?;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Opportunity sinks for `config`: always the log file, Slack when channels are set
fn notifiers(config: &Config, slack: bool) -> Result<Vec<Arc<dyn Notifier>>> {
    let log = OpportunityLog::new(&config.log_file);
    info!("Writing opportunities to {}", log.path().display());
    let mut notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(log)];
    if slack && !config.slack_channels.is_empty() {
        notifiers.push(Arc::new(SlackNotifier::new(config.slack_channels.clone())?));
    }
    Ok(notifiers)
}

/// Runs the live pipeline until Ctrl-C
async fn start(config: Config) -> Result<(), Error> {
    info!(
        "Tracking {} tokens with {} workers at {} requests/s",
        config.tokens.len(),
        config.workers,
        config.rate_limit
    );

    let source = Arc::new(OneInchClient::new(
        &config.api_url,
        config.api_key.clone(),
        config.fetch_timeout,
    )?);
    let driver = Driver::new(&config, source, notifiers(&config, true)?)?;

    let (trigger, shutdown) = shutdown::channel();
    let pipeline = tokio::spawn(driver.run(shutdown));

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, waiting for tasks to complete...");
    trigger.trigger();
    pipeline.await?;
    Ok(())
}

/// Runs one detection pass over a JSON rate graph
async fn detect_file(config: &Config, path: &Path, notify: bool) -> Result<(), Error> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| eyre!("Failed to read {}: {e}", path.display()))?;
    let raw: BTreeMap<String, BTreeMap<String, f64>> = serde_json::from_str(&contents)?;
    let graph = RateGraph::try_from(raw)?;

    let opportunities = bot::detect(GraphSnapshot::new(graph)).await?;
    println!("Found {} arbitrage opportunities", opportunities.len());

    let notifiers = notifiers(config, notify)?;
    for opportunity in &opportunities {
        for notifier in &notifiers {
            if let Err(e) = notifier.notify(opportunity).await {
                error!("Failed to deliver via {}: {e}", notifier.name());
            }
        }
    }
    Ok(())
}

/// Posts `message` to the configured Slack channels
async fn send_slack_message(config: &Config, message: &str) -> Result<(), Error> {
    let notifier = SlackNotifier::new(config.slack_channels.clone())?;
    notifier.send(message).await?;
    info!("Posted message to {} channels", notifier.channels().len());
    Ok(())
}

/// Prints each worker's pairs
fn print_pairs(config: &Config) {
    for (id, pairs) in partition_pairs(&config.tokens, config.workers).iter().enumerate() {
        println!("Worker {id} ({} pairs)", pairs.len());
        for pair in pairs {
            println!("    {pair}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    setup_logger()?;

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Some(Commands::Start(overrides)) => start(overrides.apply(config)?).await?,
        Some(Commands::Detect { graph, notify }) => detect_file(&config, &graph, notify).await?,
        Some(Commands::Slack { message }) => send_slack_message(&config, &message).await?,
        Some(Commands::Pairs(overrides)) => print_pairs(&overrides.apply(config)?),
        None => start(config).await?,
    }

    Ok(())
}
