use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Instrument;
use uuid::Uuid;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "hclm")]
#[command(about = "HCLM position client", long_about = None)]
struct Cli {
    /// Layered config paths in merge order. Built-in Sepolia defaults when omitted.
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    /// Account the workflows act for (0x-prefixed address).
    #[arg(long, global = true, env = "HCLM_ACCOUNT")]
    account: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash,

    #[command(flatten)]
    Ledger(LedgerCommand),
}

/// Commands that talk to the ledger.
#[derive(Subcommand)]
enum LedgerCommand {
    /// Print the account's position snapshot
    Status,

    /// Print sale state (and the account's contribution, if any)
    SaleStatus,

    /// Deposit ETH as collateral
    Deposit {
        /// ETH, decimal (e.g. 0.5)
        #[arg(long)]
        eth: String,
    },

    /// Borrow HCLM against collateral
    Borrow {
        /// HCLM, decimal
        #[arg(long)]
        amount: String,
    },

    /// Repay part of the debt
    Repay {
        /// HCLM, decimal
        #[arg(long)]
        amount: String,
    },

    /// Repay exactly the recorded interest
    RepayInterest,

    /// Touch the position so accrued interest is recorded
    Poke,

    /// Claim pending rewards
    Claim,

    /// Settle all debt and withdraw all collateral
    Close,

    /// Fold new pool contributions into the reward index (token owner only)
    Aggregate {
        /// Print the plan without submitting
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Buy HCLM from the sale
    Buy {
        /// ETH, decimal
        #[arg(long)]
        eth: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        // needs no ledger connection
        Commands::ConfigHash => commands::config_hash(&cli.config_paths),
        Commands::Ledger(cmd) => {
            let ctx = Context::connect(&cli.config_paths, cli.account.as_deref())?;
            // every log line of this invocation carries the same id
            let span = tracing::info_span!("hclm", invocation = %Uuid::new_v4());
            run(cmd, &ctx).instrument(span).await
        }
    }
}

async fn run(cmd: LedgerCommand, ctx: &Context) -> Result<()> {
    match cmd {
        LedgerCommand::Status => commands::position::status(ctx).await,
        LedgerCommand::SaleStatus => commands::market::sale_status(ctx).await,
        LedgerCommand::Deposit { eth } => commands::position::deposit(ctx, &eth).await,
        LedgerCommand::Borrow { amount } => commands::position::borrow(ctx, &amount).await,
        LedgerCommand::Repay { amount } => commands::position::repay(ctx, &amount).await,
        LedgerCommand::RepayInterest => commands::position::repay_interest(ctx).await,
        LedgerCommand::Poke => commands::position::poke(ctx).await,
        LedgerCommand::Claim => commands::market::claim(ctx).await,
        LedgerCommand::Close => commands::position::close(ctx).await,
        LedgerCommand::Aggregate { dry_run } => commands::market::aggregate(ctx, dry_run).await,
        LedgerCommand::Buy { eth } => commands::market::buy(ctx, &eth).await,
    }
}

/// Logs go to stderr; stdout carries only `key=value` output.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
