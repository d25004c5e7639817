use clap::Parser;

#[derive(Parser)]
#[command(name = "bank-subgraph-etl")]
#[command(about = "Append new BANK transfers from the subgraph into stg_subgraph_bank_1")]
pub struct Cli {
    /// Fetch and shape rows, print them, and skip the write
    #[arg(long, hide = true)]
    pub dry_run: bool,
}
