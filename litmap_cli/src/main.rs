//! `litmap`: the ingest/embed/topic/hierarchy/index/serve stage binary.

mod clients;
mod commands;

use clap::Parser;

#[derive(Debug, Parser)]
#[clap(name = "litmap", about = "Research-literature knowledge pipeline stage runner")]
struct Args {
    #[clap(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = args.command.run_config().resolved_logging().build().install() {
        eprintln!("failed to install logging: {e}");
        std::process::exit(1);
    }

    if let Err(e) = commands::command(args.command).await {
        observability_deps::tracing::error!(error = %e, "litmap command failed");
        std::process::exit(1);
    }
}
