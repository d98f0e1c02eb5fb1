use anyhow::{Error, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use wxdb::cli::{command, init_tracing, Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    let settings = command::load_settings(&cli)?;
    init_tracing(&settings.log_level);

    // Stop after the in-flight lines on Ctrl-C; committed rows stay.
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl-C, finishing in-flight files...");
            token.cancel();
        }
    });

    let result = match &cli.command {
        Commands::Ingest(args) => command::ingest(settings, args, cancel).await,
        Commands::Aggregate(args) => command::aggregate(settings, args).await,
        Commands::Run { ingest, aggregate } => {
            command::aggregate::run(settings, ingest, aggregate, cancel).await
        }
        Commands::Query { target } => command::query(&settings, target),
        Commands::Stations {} => command::stations(&settings),
    };

    match result {
        Ok(summary) => println!("{}", summary),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
