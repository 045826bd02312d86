use std::io::{self, Write};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use log::*;

use lnchan::coordinator::{ResolvedPeer, DEFAULT_LOCAL_AMOUNT_SAT, DEFAULT_PUSH_AMOUNT_SAT};
use lnchan::{ChannelId, ChannelOpenCoordinator, ConnectionResolver, RegistryUpdater};
use lnchan_util::config::{load_config, Config};
use lnchan_util::logging::setup_logging;

mod dry_run;

use dry_run::DryRunBackend;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(short = 'f', long, value_parser, help = "configuration file", value_name = "FILE")]
    config: Option<String>,

    #[clap(
        long,
        help = "set the logging level",
        value_name = "LEVEL",
        value_parser = ["off", "error", "warn", "info", "debug", "trace"],
    )]
    log_level: Option<String>,

    #[clap(short, long, value_parser, help = "data directory", value_name = "DIR")]
    datadir: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a connection string, invoice or node id
    #[clap(name = "resolve")]
    Resolve { input: String },
    /// Show how the peer would be reached
    #[clap(name = "target")]
    Target { input: String },
    /// Run the open-channel flow against a dry-run backend
    #[clap(name = "open")]
    Open {
        input: String,
        #[clap(
            long,
            help = "channel funding amount",
            default_value_t = DEFAULT_LOCAL_AMOUNT_SAT,
            value_parser = clap::value_parser!(u64).range(1..),
        )]
        local_sat: u64,
        #[clap(
            long,
            help = "amount to push to the peer",
            default_value_t = DEFAULT_PUSH_AMOUNT_SAT
        )]
        push_sat: u64,
    },
    /// Force-close a channel through the dry-run backend
    #[clap(name = "close")]
    Close { channel_id: String },
    /// Our node id, and peer, node and channel counts
    #[clap(name = "status")]
    Status,
    /// List the configured channels
    #[clap(name = "channels")]
    Channels,
}

fn load(cli: &Cli) -> anyhow::Result<Config> {
    match &cli.config {
        Some(path) => Ok(load_config(path)?),
        None => Ok(Config::default()),
    }
}

async fn run<W: Write>(cli: Cli, config: Config, out: &mut W) -> anyhow::Result<()> {
    let directory = Arc::new(config.directory()?);
    let coordinator = ChannelOpenCoordinator::new(
        ConnectionResolver::bolt11(),
        directory.clone(),
        directory,
        Arc::new(DryRunBackend),
    );

    match cli.command {
        Commands::Resolve { input } => {
            let parsed = ConnectionResolver::bolt11().resolve_input(&input)?;
            writeln!(out, "node_id {}", parsed.node_id)?;
            if let Some(rest) = parsed.rest {
                writeln!(out, "address {}", rest)?;
            }
        }
        Commands::Target { input } => match coordinator.resolve_peer(&input).await? {
            ResolvedPeer::AlreadyConnected(node_id) => writeln!(out, "connected {}", node_id)?,
            ResolvedPeer::Connect(target) => writeln!(out, "connect {}", target)?,
        },
        Commands::Open { input, local_sat, push_sat } => {
            let result = coordinator.open_channel(&input, local_sat, push_sat).await?;
            writeln!(out, "{}", result.message)?;
        }
        Commands::Close { channel_id } => {
            let channel_id = hex::decode(&channel_id)
                .ok()
                .and_then(|bytes| ChannelId::from_slice(&bytes))
                .ok_or_else(|| anyhow!("channel id must be 32 bytes of hex"))?;
            let message = coordinator.force_close(&channel_id).await?;
            writeln!(out, "{}", message)?;
        }
        Commands::Status => {
            if let Some(node_id) = coordinator.local_node_id().await {
                writeln!(out, "node_id {}", node_id)?;
            }
            writeln!(out, "{}", coordinator.status_summary().await)?;
            if let Some(node_id) = coordinator.suggest_peer().await {
                writeln!(out, "suggested peer {}", node_id)?;
            }
        }
        Commands::Channels => {
            let channels = config.channels()?;
            let (mut updater, sender) = RegistryUpdater::new();
            let (_trigger, listener) = triggered::trigger();
            // the backend side of the queue lives on its own thread
            let producer = thread::spawn(move || sender.full_refresh(channels));
            updater.run(listener, |registry| debug!("{} channels", registry.len())).await;
            producer.join().map_err(|_| anyhow!("channel producer panicked"))?;
            for row in updater.registry().rows() {
                writeln!(
                    out,
                    "{} {} {} {} {}",
                    row.channel_id,
                    row.node_id,
                    row.local_balance_sat,
                    row.remote_balance_sat,
                    row.state
                )?;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load(&cli)?;
    let datadir = config.datadir(cli.datadir.as_deref());
    setup_logging(&datadir, "lnchan", config.log_level(cli.log_level.as_deref()))
        .context("logging setup")?;
    info!("lnchan {} starting", env!("CARGO_PKG_VERSION"));
    run(cli, config, &mut io::stdout()).await
}
