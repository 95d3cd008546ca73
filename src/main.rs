use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bitcoin::{Amount, Denomination};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use regtest_explorer::config::{
    ExplorerConfig, RpcConfig, DEFAULT_ADDRESS_WINDOW, DEFAULT_MEMPOOL_CAP,
    DEFAULT_RETARGET_INTERVAL, DEFAULT_RPC_PASSWORD, DEFAULT_RPC_TIMEOUT_SECS, DEFAULT_RPC_URL,
    DEFAULT_RPC_USER, DEFAULT_TARGET_BLOCK_TIME_SECS, DEFAULT_TX_SCAN_DEPTH,
};
use regtest_explorer::{Explorer, RpcClient};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Pretty,
    Compact,
}

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long, env = "BITCOIN_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    #[arg(long, env = "BITCOIN_RPC_USER", default_value = DEFAULT_RPC_USER)]
    rpc_user: String,

    #[arg(long, env = "BITCOIN_RPC_PASSWORD", default_value = DEFAULT_RPC_PASSWORD, hide_env_values = true)]
    rpc_password: String,

    /// Per-call timeout, in seconds.
    #[arg(long, env = "BITCOIN_RPC_TIMEOUT", default_value_t = DEFAULT_RPC_TIMEOUT_SECS)]
    rpc_timeout: u64,

    /// Blocks walked for address history.
    #[arg(long, env = "EXPLORER_ADDRESS_WINDOW", default_value_t = DEFAULT_ADDRESS_WINDOW)]
    address_window: u64,

    /// Blocks walked for the recent-transactions feed.
    #[arg(long, env = "EXPLORER_TX_SCAN_DEPTH", default_value_t = DEFAULT_TX_SCAN_DEPTH)]
    tx_scan_depth: u64,

    /// Mempool transactions enriched per listing.
    #[arg(long, env = "EXPLORER_MEMPOOL_CAP", default_value_t = DEFAULT_MEMPOOL_CAP)]
    mempool_cap: usize,

    /// Blocks per difficulty epoch.
    #[arg(long, env = "EXPLORER_RETARGET_INTERVAL", default_value_t = DEFAULT_RETARGET_INTERVAL)]
    retarget_interval: u64,

    /// Intended spacing between blocks, in seconds.
    #[arg(long, env = "EXPLORER_TARGET_BLOCK_TIME", default_value_t = DEFAULT_TARGET_BLOCK_TIME_SECS)]
    target_block_time: u64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Most recent blocks.
    Blocks {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// One block, by height or hash.
    Block { reference: String },
    /// Balance, UTXOs and recent history of an address.
    Address { address: String },
    /// Page of recent confirmed transactions.
    Txs {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// One transaction, with inputs resolved.
    Tx { txid: String },
    /// Unconfirmed transactions.
    Mempool {
        /// Raw pool entries instead of enriched transactions.
        #[arg(long)]
        entries: bool,
    },
    MempoolInfo,
    /// Fee advice for 1, 3 and 6 block targets.
    Fees,
    /// Next difficulty adjustment.
    Retarget,
    /// Difficulty, hashrate and retarget outlook.
    Network,
    /// Chain summary.
    Info,
    /// Height, txid, block hash or address.
    Search { query: String },
    /// Broadcast a raw transaction.
    Broadcast { hex: String },
    /// Pay an amount (in BTC) from the node wallet.
    Send {
        address: String,
        #[arg(value_parser = parse_btc)]
        amount: Amount,
    },
}

fn parse_btc(s: &str) -> Result<Amount, String> {
    Amount::from_str_in(s, Denomination::Bitcoin).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rpc = RpcConfig {
        url: args.rpc_url.clone(),
        user: args.rpc_user.clone(),
        password: args.rpc_password.clone(),
        timeout: Duration::from_secs(args.rpc_timeout),
    };
    let config = ExplorerConfig::default()
        .with_address_window(args.address_window)
        .with_tx_scan_depth(args.tx_scan_depth)
        .with_mempool_cap(args.mempool_cap)
        .with_retarget_interval(args.retarget_interval)
        .with_target_block_time(args.target_block_time);

    let client = RpcClient::new(rpc).context("failed to set up node client")?;
    let explorer = Explorer::new(client, config);

    log::info!("[MAIN] {:?}", args.command);
    let t0 = Instant::now();
    run(&explorer, &args)?;
    log::info!("[MAIN] done in {:?}", t0.elapsed());

    Ok(())
}

fn run(explorer: &Explorer<RpcClient>, args: &Args) -> Result<()> {
    let format = args.format;
    match &args.command {
        Command::Blocks { limit } => print(format, &explorer.list_blocks(*limit)?),
        Command::Block { reference } => print(
            format,
            &explorer
                .get_block(reference)
                .with_context(|| format!("block {reference}"))?,
        ),
        Command::Address { address } => print(
            format,
            &explorer
                .get_address_view(address)
                .with_context(|| format!("address {address}"))?,
        ),
        Command::Txs { limit, offset } => {
            print(format, &explorer.list_transactions(*limit, *offset)?)
        }
        Command::Tx { txid } => print(
            format,
            &explorer
                .get_transaction(txid)
                .with_context(|| format!("transaction {txid}"))?,
        ),
        Command::Mempool { entries: true } => print(format, &explorer.list_mempool_entries()?),
        Command::Mempool { entries: false } => print(format, &explorer.list_mempool()?),
        Command::MempoolInfo => print(format, &explorer.get_mempool_info()?),
        Command::Fees => print(format, &explorer.get_fee_recommendation()),
        Command::Retarget => print(format, &explorer.get_retarget_projection()?),
        Command::Network => print(format, &explorer.get_network_stats()?),
        Command::Info => print(format, &explorer.get_chain_info()?),
        Command::Search { query } => print(
            format,
            &explorer
                .search(query)
                .with_context(|| format!("search {query:?}"))?,
        ),
        Command::Broadcast { hex } => {
            let txid = explorer
                .broadcast_raw_transaction(hex)
                .context("broadcast failed")?;
            print(format, &txid)
        }
        Command::Send { address, amount } => {
            let txid = explorer
                .send_funds(address, *amount)
                .with_context(|| format!("sending {amount} to {address}"))?;
            print(format, &txid)
        }
    }
}

fn print<T: Serialize>(format: OutputFormat, value: &T) -> Result<()> {
    let out = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    };
    println!("{out}");
    Ok(())
}
