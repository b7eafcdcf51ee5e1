use bankcore::application::engine::BankEngine;
use bankcore::config::BankConfig;
use bankcore::domain::ports::BankStoreRef;
use bankcore::infrastructure::in_memory::InMemoryStore;
use bankcore::interfaces::command::Command;
use bankcore::interfaces::csv::account_writer::AccountWriter;
use bankcore::interfaces::csv::command_reader::CommandReader;
use bankcore::interfaces::identity::AccountNumberIdentity;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "BANK_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Balance granted to newly opened accounts
    #[arg(long, env = "BANK_OPENING_BALANCE", default_value = "300")]
    opening_balance: Decimal,

    /// Annual interest rate applied to new loans
    #[arg(long, env = "BANK_ANNUAL_RATE", default_value = "0.05")]
    annual_rate: Decimal,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<PathBuf>) -> Result<BankStoreRef> {
    use bankcore::infrastructure::rocksdb::RocksDbStore;

    Ok(match db_path {
        Some(path) => {
            info!(path = %path.display(), "using RocksDB storage");
            Arc::new(RocksDbStore::open(path).into_diagnostic()?)
        }
        None => Arc::new(InMemoryStore::new()),
    })
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<PathBuf>) -> Result<BankStoreRef> {
    if db_path.is_some() {
        warn!(
            "persistent storage requested via --db-path, but the 'storage-rocksdb' feature is not enabled; falling back to in-memory storage"
        );
    }
    Ok(Arc::new(InMemoryStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let store = open_store(cli.db_path)?;
    let config = BankConfig {
        annual_rate: cli.annual_rate,
        opening_balance: cli.opening_balance,
        ..BankConfig::default()
    };
    let engine = BankEngine::new(store.clone(), config);
    let identity = AccountNumberIdentity::new(store);

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    let (mut applied, mut rejected) = (0usize, 0usize);
    for (row, record) in reader.commands().enumerate() {
        let line = row + 2;
        let outcome = match record {
            Ok(record) => match Command::try_from(record) {
                Ok(command) => command.execute(&engine, &identity).await,
                Err(e) => Err(e),
            },
            Err(e) => {
                warn!(line, error = %e, "Error reading command");
                rejected += 1;
                continue;
            }
        };
        match outcome {
            Ok(()) => applied += 1,
            Err(e) => {
                warn!(line, error = %e, "Error processing command");
                rejected += 1;
            }
        }
    }
    info!(applied, rejected, "batch finished");

    let accounts = engine.accounts().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(accounts).into_diagnostic()?;

    Ok(())
}
