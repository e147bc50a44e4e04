use std::fs;
use std::path::Path;

use anyhow::Context;
use scraper::Html;

use crate::app::{publish_snapshot, run_site, RunSummary};
use crate::config::SiteConfig;
use crate::scraper::{ItemExtractor, SequenceState};

pub async fn run(config_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let config = SiteConfig::load(config_path)?;
    let summary = run_site(&config, output).await?;
    print_summary(&config, &summary);
    Ok(())
}

pub fn extract(config_path: &Path, html_path: &Path, write: bool) -> anyhow::Result<()> {
    let config = SiteConfig::load(config_path)?;
    let html = fs::read_to_string(html_path)
        .with_context(|| format!("Failed to read {}", html_path.display()))?;

    if write {
        let summary = publish_snapshot(&html, &config, &config.output_path())?;
        print_summary(&config, &summary);
        return Ok(());
    }

    let items = ItemExtractor::new(&config.extraction)?.extract(&Html::parse_document(&html));
    println!("{}", serde_json::to_string_pretty(&items)?);
    println!("{} items", items.len());
    Ok(())
}

pub fn check(config_path: &Path) -> anyhow::Result<()> {
    let config = SiteConfig::load(config_path)?;
    ItemExtractor::new(&config.extraction)?;

    println!("Config OK: {}", config_path.display());
    println!("  Site:   {}", config.url);
    println!("  Feed:   {}", config.feed_title);
    println!("  Output: {}", config.output_path().display());
    if config.popup.is_active() {
        println!("  Popups: {}", config.popup.buttons.join(" → "));
    }
    Ok(())
}

fn print_summary(config: &SiteConfig, summary: &RunSummary) {
    println!("{}", config.feed_title);
    match summary.popups {
        Some(SequenceState::Abandoned { step }) => {
            println!("  Popups:    gave up at step {}", step)
        }
        Some(_) => println!("  Popups:    dismissed"),
        None => {}
    }
    println!("  Extracted: {}", summary.extracted);
    println!("  New:       {}", summary.added);
    println!("  Total:     {}", summary.total);
    println!("  Written:   {}", summary.output.display());
}
