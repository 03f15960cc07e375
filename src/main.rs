use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use base64::Engine as _;
use clap::{Parser, Subcommand, ValueEnum};
use perpsync_rs::client::TradingClient;
use perpsync_rs::config::{ClientConfig, DEFAULT_CONFIG_PATH};
use perpsync_rs::loader::unix_ms;
use perpsync_rs::orders::{self, Instruction, OrderRequest, OrderType, Side};
use perpsync_rs::reader::rpc::JsonRpcReader;
use perpsync_rs::state::Snapshot;
use perpsync_rs::telemetry;
use rust_decimal::Decimal;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "perpsync", about = "Batched account/order-book sync for a perp exchange")]
struct Cli {
    /// Config file; PERPSYNC__* env vars override its keys
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Prometheus exporter port (needs the metrics-exporter feature)
    #[arg(long, default_value_t = 9000)]
    metrics_port: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load once and print books, positions and account value
    Snapshot,
    /// Refresh periodically, printing best bid/ask each time
    Watch {
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
    /// Compose (but do not send) a place-perp-order instruction
    Order {
        #[arg(long)]
        market: String,
        #[arg(long, value_enum)]
        side: SideArg,
        #[arg(long)]
        quantity: Decimal,
        /// Limit price; omitted means a market order at the best opposite level
        #[arg(long)]
        price: Option<Decimal>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Long,
    Short,
}

impl From<SideArg> for Side {
    fn from(s: SideArg) -> Self {
        match s {
            SideArg::Long => Side::Long,
            SideArg::Short => Side::Short,
        }
    }
}

fn print_books(snapshot: &Snapshot) {
    for ctx in &snapshot.markets {
        let norm = orders::Normaliser::new(&ctx.market);
        let best = |side: &Option<Arc<perpsync_rs::state::BookSide>>| {
            match side.as_ref().and_then(|s| s.best()) {
                None => "None".to_string(),
                Some(l) => match (norm.quantity_lots_to_ui(l.quantity_lots), norm.price_lots_to_ui(l.price_lots)) {
                    (Some(q), Some(p)) => format!("{} @ {}", q, p),
                    _ => format!("{} lots @ {} lots", l.quantity_lots, l.price_lots),
                },
            }
        };
        println!(
            "[{}] {:<10} BID {} | ASK {}",
            snapshot.captured_at_ms,
            ctx.market.name,
            best(&ctx.bids),
            best(&ctx.asks)
        );
    }
}

fn print_instruction(ix: &Instruction) {
    println!("program: {}", ix.program_id);
    for (i, meta) in ix.accounts.iter().enumerate() {
        println!(
            "  #{:<2} {} {}{}",
            i,
            meta.address,
            if meta.is_signer { "s" } else { "-" },
            if meta.is_writable { "w" } else { "-" }
        );
    }
    println!("data: {}", base64::engine::general_purpose::STANDARD.encode(&ix.data));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env
    telemetry::init_tracing("perpsync_rs=info,perpsync=info");

    let cli = Cli::parse();
    telemetry::init_metrics(cli.metrics_port)?;

    let config = Arc::new(
        ClientConfig::load(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))?,
    );
    let reader = JsonRpcReader::new(&config.rpc_url, Duration::from_millis(config.rpc_timeout_ms))?;
    let client = TradingClient::new(config.clone(), reader);

    let snapshot = client.bootstrap().await.context("initial load")?;
    info!(markets = snapshot.markets.len(), "bootstrapped");

    match cli.command {
        Command::Snapshot => {
            print_books(&snapshot);
            for (market, position) in client.positions()? {
                println!("position {:<10} {}", market, position);
            }
            println!("account value: {}", client.account_value()?);
        }
        Command::Watch { interval_ms } => {
            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match client.refresh().await {
                            Ok(snapshot) => print_books(&snapshot),
                            Err(e) => error!(error = %e, "refresh failed"),
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("shutting down");
                        break;
                    }
                }
            }
        }
        Command::Order { market, side, quantity, price } => {
            let client_order_id = unix_ms();
            let ix = match price {
                None => match Side::from(side) {
                    Side::Long => client.market_long(&market, quantity, client_order_id)?,
                    Side::Short => client.market_short(&market, quantity, client_order_id)?,
                },
                Some(price) => {
                    let request = OrderRequest {
                        side: side.into(),
                        price,
                        quantity,
                        client_order_id,
                        order_type: OrderType::Limit,
                    };
                    orders::compose(&config, &snapshot, &market, &request)?
                }
            };
            print_instruction(&ix);
        }
    }

    Ok(())
}
