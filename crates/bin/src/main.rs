use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod output;

use cli::{Cli, Commands};
use output::OutputFormat;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tollgate=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from_flag(cli.json);

    match &cli.command {
        Commands::Serve(args) => commands::serve::run(&cli.config, args).await,
        Commands::Store(args) => commands::drivers::storage(args, format),
        Commands::Encrypt(args) => commands::drivers::encryption(args, format),
        Commands::CreateStore => commands::store::create(&cli.config, format).await,
        Commands::UserAdd(args) => commands::store::user_add(&cli.config, args, format).await,
        Commands::Config(args) => commands::config::run(&cli.config, args),
        Commands::Health(args) => commands::health::run(args, format).await,
    }
}
