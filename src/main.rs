use anyhow::{Context, Result};
use bitcoin::{Network, OutPoint, Txid};
use clap::{Parser, Subcommand};
use std::str::FromStr;

use tanos::swap::{SwapBuyer, SwapSeller};

#[derive(Parser)]
#[command(name = "tanos")]
#[command(about = "TANOS - atomic swaps of Nostr events for Bitcoin", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full swap locally: sign, lock, pre-sign, reveal, complete
    Demo {
        /// Content of the Nostr event being sold
        #[arg(long, default_value = "Nostr event for a TANOS atomic swap")]
        content: String,

        /// Value of the locked output in satoshis
        #[arg(long, default_value = "100000")]
        locked_sats: u64,

        /// Fee to leave for the spend in satoshis
        #[arg(long, default_value = "1000")]
        fee_sats: u64,

        /// Txid of the outpoint holding the locked funds
        #[arg(
            long,
            default_value = "0000000000000000000000000000000000000000000000000000000000000000"
        )]
        prev_txid: String,

        /// Output index of the locked outpoint
        #[arg(long, default_value = "0")]
        prev_vout: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo {
            content,
            locked_sats,
            fee_sats,
            prev_txid,
            prev_vout,
        } => run_demo(&content, locked_sats, fee_sats, &prev_txid, prev_vout),
    }
}

fn run_demo(
    content: &str,
    locked_sats: u64,
    fee_sats: u64,
    prev_txid: &str,
    prev_vout: u32,
) -> Result<()> {
    println!("TANOS: Taproot Adaptor for Nostr-Orchestrated Swaps");
    println!("----------------------------------------------------");

    let mut rng = rand::thread_rng();

    // Seller: a Nostr content creator.
    let mut seller = SwapSeller::new_random(&mut rng);
    println!(
        "Seller public key: {}",
        hex::encode(seller.public_key().to_xonly_bytes())
    );

    // Buyer: a Bitcoin holder.
    let mut buyer = SwapBuyer::new_random(&mut rng);
    println!(
        "Buyer public key:  {}",
        hex::encode(buyer.public_key().to_xonly_bytes())
    );

    // Seller signs the event but keeps it private; only the offer goes out.
    let offer = seller.sign_event(content)?.clone();
    println!("\n--- Offer ---");
    println!("Event id:       {}", hex::encode(offer.event_id));
    println!("Signature nonce: {}", hex::encode(offer.nonce_x));
    println!(
        "Commitment T:    {}",
        hex::encode(offer.commitment.to_bytes())
    );

    // Buyer audits the offer before committing any funds.
    offer.audit().context("Seller's offer failed its audit")?;
    println!("Offer audit: OK");

    // Buyer builds the spend of the locked output and pre-signs it.
    println!("\n--- Locking phase ---");
    let txid = Txid::from_str(prev_txid).context("Invalid previous txid")?;
    let amount = locked_sats
        .checked_sub(fee_sats)
        .context("Fee exceeds the locked value")?;
    buyer.build_spending_tx(
        OutPoint::new(txid, prev_vout),
        locked_sats,
        amount,
        Network::Signet,
    )?;
    println!("Sighash: {}", hex::encode(buyer.sighash()?));

    let pre_signature = buyer.create_adaptor(&offer.commitment)?.clone();
    println!(
        "Adaptor nonce R': {}",
        hex::encode(pre_signature.nonce_point().to_xonly_bytes())
    );
    println!("Adaptor signature created and verified");

    // Exchange phase: the seller publishes the event.
    println!("\n--- Exchange phase ---");
    let event = seller.reveal()?.clone();
    println!("Seller reveals event signature: {}", event.sig);

    // Buyer completes the Bitcoin signature from the revealed event.
    let final_signature = buyer.complete_from_event(&event)?;
    println!("Final Schnorr signature: {}", hex::encode(final_signature));
    println!("Spend ready for broadcast: {}", buyer.raw_spend_tx()?);

    // Seller observes the spend and recovers the secret from it.
    let recovered = seller.confirm_spend(&pre_signature, &final_signature)?;
    println!("\n--- Settlement ---");
    println!(
        "Seller recovered the event scalar from the spend: {}",
        hex::encode(recovered.to_bytes())
    );
    println!("Swap complete: both artifacts are now public and consistent.");

    Ok(())
}
