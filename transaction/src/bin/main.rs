use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use privacy_transaction::message::unix_now;
use privacy_transaction::{
    build_mint_tx, build_transfer_tx, ledger_balance, verify_transaction, MemoryLedger,
    PrivacyMessage, TxConfig, TxError,
};
use privacy_types::{KeySet, OtaReceiver, PaymentInfo};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "simulate")]
#[command(about = "Mint, transfer and double-spend against an in-memory ledger", long_about = None)]
struct Cli {
    /// JSON transaction config; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "100000")]
    mint: u64,
    #[arg(long, default_value = "100")]
    send: u64,
    #[arg(long)]
    fee_per_kb: Option<u64>,
}

fn admit(ledger: &mut MemoryLedger, msg: &PrivacyMessage, config: &TxConfig) -> privacy_transaction::Result<()> {
    verify_transaction(ledger, msg, config, unix_now())?;
    ledger.apply_proof(&msg.proof)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TxConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => TxConfig::default(),
    }
    .with_env_overrides()?;
    if let Some(fee_per_kb) = cli.fee_per_kb {
        config.fee_per_kb = fee_per_kb;
    }
    config.validate()?;

    let sender = KeySet::from_seed(b"simulate sender");
    let recipient = KeySet::from_seed(b"simulate recipient");
    let mut ledger = MemoryLedger::new();

    let receiver = OtaReceiver::from_address(sender.payment_address())?;
    let mint = build_mint_tx(&receiver, cli.mint, Vec::new(), None)?;
    admit(&mut ledger, &mint, &config).context("mint rejected")?;
    info!(balance = ledger_balance(&ledger, &sender)?, "sender funded");

    let payment = PaymentInfo::new(*recipient.payment_address(), cli.send, Vec::new());
    let transfer = build_transfer_tx(&ledger, &sender, vec![payment.clone()], None, &config)?;
    let replay = build_transfer_tx(&ledger, &sender, vec![payment], None, &config)?;

    admit(&mut ledger, &transfer, &config).context("transfer rejected")?;
    info!(
        fee = transfer.fee,
        sender = ledger_balance(&ledger, &sender)?,
        recipient = ledger_balance(&ledger, &recipient)?,
        "transfer applied"
    );

    match admit(&mut ledger, &replay, &config) {
        Err(TxError::Duplicate { kind, index }) => {
            info!(kind, %index, "double spend rejected");
        }
        Err(e) => bail!("second spend failed for the wrong reason: {}", e),
        Ok(()) => bail!("second spend of the same coin was accepted"),
    }

    println!("{}", serde_json::to_string_pretty(&transfer)?);
    Ok(())
}
