//! pulse daemon — entry point for running a pulse node.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use pulse_network::MemoryChannelNetwork;
use pulse_node::logging::{init_logging, LogFormat};
use pulse_node::{NodeConfig, PulseNode};

#[derive(Parser)]
#[command(name = "pulse-daemon", about = "pulse protocol node daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings are
    /// used as the base; CLI flags override them.
    #[arg(long, env = "PULSE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "PULSE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "PULSE_LOG_FORMAT")]
    log_format: Option<String>,

    /// Upper bound on frames produced before voluntary halt (0 = unbounded).
    #[arg(long, env = "PULSE_MAX_FRAMES")]
    max_frames: Option<u64>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Start the node.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node.
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref config_path) => NodeConfig::from_toml_file(&config_path.display().to_string())?,
        None => NodeConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(max_frames) = cli.max_frames {
        config.engine.max_frames = max_frames;
    }

    init_logging(LogFormat::from_str(&config.log_format), &config.log_level);
    if let Some(ref config_path) = cli.config {
        tracing::info!("loaded config from {}", config_path.display());
    }

    match cli.command {
        Command::Node { action } => match action {
            NodeAction::Run => {
                tracing::info!(
                    full_prover = config.engine.full_prover,
                    max_frames = config.engine.max_frames,
                    "starting pulse node"
                );

                // Transport bring-up is deployment-specific; the daemon
                // runs over the loopback transport and advances the clock
                // solo.
                let network = Arc::new(MemoryChannelNetwork::new());
                let node = Arc::new(PulseNode::new(config, network)?);

                let mut runner = {
                    let node = node.clone();
                    tokio::spawn(async move { node.run().await })
                };

                tokio::select! {
                    _ = node.shutdown_controller().wait_for_signal() => {
                        node.stop();
                        (&mut runner).await??;
                    }
                    result = &mut runner => {
                        result??;
                    }
                }

                match node.shutdown_controller().reason() {
                    Some(reason) => tracing::info!(%reason, "pulse daemon exited cleanly"),
                    None => tracing::info!("pulse daemon exited cleanly"),
                }
            }
        },
    }

    Ok(())
}
