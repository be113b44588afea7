//! Operator resync tool.
//!
//! Resyncs goods from the catalog into the search index and prints the outcome
//! as JSON. Ctrl-C stops issuing new work; documents already written stay.

use anyhow::Context;
use catalog_sync::admin::SyncGoodsDataRequest;
use catalog_sync::{Settings, SyncComponents};
use clap::Parser;
use dotenv::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Resync goods into the search index.
#[derive(Debug, Parser)]
#[command(name = "catalog-resync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Force a resync; with no ids this is a full pass followed by orphan pruning.
    #[arg(long)]
    force: bool,

    /// Comma-separated goods ids to resync. Omit to resync the whole catalog.
    #[arg(long, value_delimiter = ',')]
    goods_ids: Vec<u64>,

    /// Remove search documents that have no catalog record.
    #[arg(long)]
    prune_orphans: bool,

    /// Pretty-print the JSON result.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("catalog_sync=info,catalog_sync_repository=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env();

    let components = SyncComponents::connect(&settings)
        .await
        .context("failed to connect to the catalog and search index")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current item");
            on_signal.cancel();
        }
    });

    let request = SyncGoodsDataRequest {
        force_sync: cli.force,
        goods_ids: cli.goods_ids,
        prune_orphans: cli.prune_orphans,
    };
    info!(request = ?request, "Running resync");

    let response = components
        .data_sync
        .sync_goods_data(request, &cancel)
        .await;

    let output = if cli.pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    }
    .context("failed to serialize resync result")?;
    println!("{}", output);

    if !response.success {
        anyhow::bail!("resync failed: {}", response.message);
    }
    Ok(())
}
