mod cli;
mod config;
mod database;
mod error;
mod loader;
mod models;
mod pipeline;
mod subgraph;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::{
    cli::Cli,
    config::Config,
    pipeline::run_once,
    subgraph::SubgraphClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let summary = run_once(
        Config::load(),
        |config| SubgraphClient::new(config.subgraph_url.clone()),
        cli.dry_run,
    )
    .await?;

    if summary.dry_run {
        for row in &summary.rows {
            println!("{}", serde_json::to_string_pretty(row)?);
        }
    }

    info!(
        "Run complete: watermark {:?}, fetched {}, appended {}",
        summary.watermark, summary.fetched, summary.appended
    );

    Ok(())
}
