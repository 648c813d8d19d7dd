//! Wallet tooling: key generation, address derivation and transaction
//! signing. Prints JSON so output can be piped straight into the node's
//! HTTP API.

use clap::{Parser, Subcommand};
use serde_json::json;
use stridechain::transaction::Transaction;
use stridechain::wallet::KeyPair;

#[derive(Parser)]
#[command(name = "stridechain-wallet", about = "stridechain wallet tooling")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new key pair.
    Generate,
    /// Derive the address for a secret key.
    Address {
        /// Hex-encoded secret key.
        #[arg(long)]
        secret: String,
    },
    /// Create and sign a transaction.
    Sign {
        /// Hex-encoded secret key of the sender.
        #[arg(long)]
        secret: String,
        /// Recipient address.
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match Args::parse().command {
        Command::Generate => {
            let keypair = KeyPair::generate();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "address": keypair.address(),
                    "secretKey": keypair.secret_key_hex(),
                }))?
            );
        }
        Command::Address { secret } => {
            let keypair = KeyPair::from_secret_hex(&secret)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "address": keypair.address() }))?
            );
        }
        Command::Sign { secret, to, amount } => {
            let keypair = KeyPair::from_secret_hex(&secret)?;
            let mut tx = Transaction::regular(keypair.address(), to, amount);
            keypair.sign_transaction(&mut tx)?;
            println!("{}", serde_json::to_string_pretty(&tx)?);
        }
    }
    Ok(())
}
