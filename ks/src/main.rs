use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use knowledgestore::KnowledgeStore;
use knowledgestore::cli::{Cli, Command};
use knowledgestore::config::Config;

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("knowledgestore starting");

    let store = KnowledgeStore::open(&config.store_path)?;

    match cli.command {
        Command::Show { json } => {
            let knowledge = store.get();
            if json {
                println!("{}", serde_json::to_string_pretty(&knowledge)?);
                return Ok(());
            }
            println!("Projects: {}", knowledge.total_projects.to_string().cyan());
            println!("{}", "Strategies:".bold());
            for s in &knowledge.successful_strategies {
                println!("  {} {}", "+".green(), s);
            }
            println!("{}", "Critiques:".bold());
            for c in &knowledge.failed_points {
                println!("  {} {}", "-".red(), c);
            }
            println!("{}", "References:".bold());
            for r in &knowledge.references {
                println!("  {}", r.dimmed());
            }
        }
        Command::Record { strategy, critique } => {
            let knowledge = store.save(&strategy, &critique)?;
            println!(
                "{} Recorded project #{}",
                "✓".green(),
                knowledge.total_projects.to_string().cyan()
            );
        }
        Command::Reference { text } => {
            let knowledge = store.add_reference(&text)?;
            println!("{} {} references", "✓".green(), knowledge.references.len());
        }
    }

    Ok(())
}
