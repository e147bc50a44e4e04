pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pagefeed")]
#[command(about = "Turn listing pages into RSS feeds", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a site's listing page and merge its items into the feed
    Run {
        /// Path to the site config (TOML)
        config: PathBuf,

        /// Feed file to write (overrides the config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Extract items from a saved HTML snapshot, without a browser
    Extract {
        /// Path to the site config (TOML)
        config: PathBuf,

        /// Saved page HTML
        #[arg(long)]
        html: PathBuf,

        /// Also merge the items into the feed file
        #[arg(short, long)]
        write: bool,
    },
    /// Validate a site config: selectors, date pattern, output path
    Check {
        /// Path to the site config (TOML)
        config: PathBuf,
    },
}
