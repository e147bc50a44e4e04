use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pagefeed::cli::{commands, Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing, `info` unless RUST_LOG says otherwise
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            commands::run(&config, output.as_deref()).await?;
        }
        Commands::Extract {
            config,
            html,
            write,
        } => {
            commands::extract(&config, &html, write)?;
        }
        Commands::Check { config } => {
            commands::check(&config)?;
        }
    }

    Ok(())
}
