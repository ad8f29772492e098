//! candy-operator command line.
//!
//! ```text
//! candy-operator [--settings PATH] [--log-level LEVEL] <command>
//!
//!   deploy    create the configuration record and upload its items
//!   mint      mint one item from a deployed record
//!   withdraw  drain balances of every record owned by the keypair
//! ```

use clap::{Args, Parser, Subcommand};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signer;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use candy_operator::blockchain::types::parse_address;
use candy_operator::blockchain::{load_keypair, AddressDeriver, Ledger, RpcLedger};
use candy_operator::cache::{CacheStore, FileCacheStore};
use candy_operator::config::schema::DEFAULT_ENV;
use candy_operator::config::{
    load_deployment_config, load_tool_config_or_default, resolve_deployment, ToolConfig,
};
use candy_operator::deploy::{ConfigUploader, DeploymentOrchestrator};
use candy_operator::mint::{mint_one, MintTransactionBuilder};
use candy_operator::observability::init_logging;
use candy_operator::withdraw::{CharityShare, WithdrawalSweeper};

#[derive(Parser)]
#[command(name = "candy-operator", version)]
#[command(about = "Deploy, mint from and withdraw candy machine configuration records", long_about = None)]
struct Cli {
    /// Operator settings file (TOML).
    #[arg(long, global = true, env = "CANDY_OPERATOR_SETTINGS")]
    settings: Option<PathBuf>,

    /// Log level or filter directives; overrides RUST_LOG.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Common {
    /// Signing keypair file.
    #[arg(short, long)]
    keypair: PathBuf,

    /// Cluster name.
    #[arg(short, long, default_value = DEFAULT_ENV)]
    env: String,

    /// Custom RPC endpoint, overrides the cluster name.
    #[arg(short, long)]
    rpc_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the configuration record and upload its items
    Deploy {
        #[command(flatten)]
        common: Common,

        #[arg(short, long, default_value = "temp")]
        cache_name: String,

        /// Configuration input document (JSON).
        #[arg(long)]
        config_path: PathBuf,
    },
    /// Mint one item
    Mint {
        #[command(flatten)]
        common: Common,

        #[arg(short, long, default_value = "temp")]
        cache_name: String,

        /// Record address; defaults to the cached deployment.
        #[arg(long)]
        candy_machine: Option<String>,
    },
    /// Withdraw record balances to the authority
    Withdraw {
        #[command(flatten)]
        common: Common,

        /// Report totals without submitting anything.
        #[arg(long)]
        dry_run: bool,

        /// Charity address receiving a share of each balance.
        #[arg(long)]
        charity: Option<String>,

        /// Charity share, 0-100.
        #[arg(long, default_value_t = 0.0)]
        charity_percent: f64,
    },
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let config = load_tool_config_or_default(cli.settings.as_deref())?;
    let program_id = parse_address(&config.program.candy_machine_id)?;

    let started = Instant::now();
    let successful = match cli.command {
        Commands::Deploy {
            common,
            cache_name,
            config_path,
        } => deploy(&config, program_id, &common, &cache_name, config_path).await?,
        Commands::Mint {
            common,
            cache_name,
            candy_machine,
        } => mint(&config, program_id, &common, &cache_name, candy_machine.as_deref()).await?,
        Commands::Withdraw {
            common,
            dry_run,
            charity,
            charity_percent,
        } => withdraw(&config, program_id, &common, dry_run, charity.as_deref(), charity_percent).await?,
    };

    tracing::info!(elapsed_secs = started.elapsed().as_secs_f64(), "Finished");
    println!("Done. Successful = {}.", successful);
    Ok(if successful {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn connect(config: &ToolConfig, common: &Common) -> Arc<dyn Ledger> {
    let rpc_url = config.cluster.resolve_url(&common.env, common.rpc_url.as_deref());
    tracing::info!(env = %common.env, rpc_url = %rpc_url, "Connecting to cluster");
    Arc::new(RpcLedger::new(rpc_url, &config.cluster))
}

async fn deploy(
    config: &ToolConfig,
    program_id: Pubkey,
    common: &Common,
    cache_name: &str,
    config_path: PathBuf,
) -> CliResult<bool> {
    let payer = load_keypair(&common.keypair)?;
    let ledger = connect(config, common);
    let store: Arc<dyn CacheStore> = Arc::new(FileCacheStore::new(config.cache.dir.clone()));

    let raw = load_deployment_config(&config_path)?;
    let settings = resolve_deployment(raw, &payer.pubkey(), ledger.as_ref()).await?;

    let uploader = ConfigUploader::new(ledger.clone(), store.clone(), config.upload, program_id);
    let orchestrator = DeploymentOrchestrator::new(ledger, store, uploader, program_id, &common.env, cache_name);
    let report = orchestrator.deploy(&settings, &payer).await?;

    tracing::info!(
        candy_machine = %report.record.ledger_address,
        uuid = %report.record.identity_tag,
        created = report.created,
        phases = ?report.phases,
        "Deploy finished"
    );
    if let Some(upload) = &report.upload {
        for failure in &upload.failures {
            tracing::warn!(
                start_index = failure.start_index,
                end_index = failure.end_index,
                "Group not written; rerun deploy to retry"
            );
        }
    }
    Ok(report.success())
}

async fn mint(
    config: &ToolConfig,
    program_id: Pubkey,
    common: &Common,
    cache_name: &str,
    candy_machine: Option<&str>,
) -> CliResult<bool> {
    let buyer = load_keypair(&common.keypair)?;
    let candy_machine = match candy_machine {
        Some(address) => parse_address(address)?,
        None => FileCacheStore::new(config.cache.dir.clone())
            .load(&common.env, cache_name)?
            .map(|state| state.record())
            .transpose()?
            .flatten()
            .map(|record| record.ledger_address)
            .ok_or("no --candy-machine given and no deployment cached")?,
    };

    let ledger = connect(config, common);
    let builder = MintTransactionBuilder::new(AddressDeriver::new(program_id));
    let receipt = mint_one(ledger.as_ref(), &builder, &candy_machine, &buyer).await?;
    tracing::info!(mint = %receipt.mint, signature = %receipt.signature, "Mint confirmed");
    Ok(true)
}

async fn withdraw(
    config: &ToolConfig,
    program_id: Pubkey,
    common: &Common,
    dry_run: bool,
    charity: Option<&str>,
    charity_percent: f64,
) -> CliResult<bool> {
    let charity = match charity {
        Some(address) => Some(CharityShare::new(parse_address(address)?, charity_percent)?),
        None => {
            CharityShare::new(Pubkey::default(), charity_percent)?;
            if charity_percent > 0.0 {
                return Err("--charity-percent requires --charity".into());
            }
            None
        }
    };

    let authority = load_keypair(&common.keypair)?;
    let sweeper = WithdrawalSweeper::new(connect(config, common), program_id);
    let report = sweeper.sweep(&authority, charity.as_ref(), dry_run).await?;

    tracing::info!(
        records = report.record_count,
        lamports = report.total_lamports,
        donation = report.donation_lamports,
        succeeded = report.success_count,
        dry_run,
        "Withdraw finished"
    );
    Ok(report.success())
}
