//! CLI argument parsing for knowledgestore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ks")]
#[command(author, version, about = "Persisted page-building knowledge log", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the knowledge record
    Show {
        /// Print raw JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Record a finished project with what worked and what did not
    Record {
        /// Strategy that worked
        #[arg(short, long, required = true)]
        strategy: String,

        /// Critique of the result
        #[arg(short = 'x', long, required = true)]
        critique: String,
    },

    /// Add a reference
    Reference {
        /// Reference text or URL
        #[arg(required = true)]
        text: String,
    },
}
