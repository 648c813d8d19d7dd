//! stridechain node: loads the ledger, starts the mining scheduler and
//! serves the peer/client API.

use clap::Parser;
use std::path::PathBuf;
use stridechain::{api, config::load_config, node::Node};
use tracing::info;

#[derive(Parser)]
#[command(name = "stridechain-node", about = "Run a stridechain ledger node")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = load_config(&args.config)?;

    // A corrupt persisted chain aborts startup here.
    let node = Node::new(&config)?;

    {
        let chain = node.blockchain.read().await;
        info!(
            size = chain.size,
            difficulty = chain.difficulty,
            mining_reward = chain.mining_reward,
            "ledger ready"
        );
    }

    if config.mining.enabled {
        node.start_mining_loop();
    }

    api::serve(node, config.node.port).await?;
    Ok(())
}
