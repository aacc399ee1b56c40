//! CLI command definitions and terminal rendering helpers

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

use crate::config::Config;
use crate::domain::{ChatMessage, ChatRole, GeneratedSlice, PROGRESS_STEPS, PipelineStage, StepStatus};
use crate::state::Session;

/// PageForge - AI product detail-page builder
#[derive(Parser)]
#[command(
    name = "pf",
    about = "Build, edit and export AI-generated product detail pages",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a new page from product data
    Build {
        /// Product name
        #[arg(short, long)]
        name: String,

        /// Free-form spec text
        #[arg(short, long, default_value = "")]
        specs: String,

        /// Product image (repeatable); the first one is the visual reference
        #[arg(short, long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,

        /// Export all slides once the build completes
        #[arg(short, long)]
        export: bool,
    },

    /// Show the current session
    Show {
        /// Print the session as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit a slide's text by hand
    Edit {
        /// Slide number (1-based)
        #[arg(value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        index: usize,

        /// New headline
        #[arg(long)]
        copy: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,
    },

    /// Focus a slide (1-based, clamped)
    Focus {
        #[arg(value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        index: usize,
    },

    /// Chat with the editor assistant about the focused slide
    Chat {
        /// Send one message and exit; omit for the interactive session
        message: Option<String>,
    },

    /// Export slides as 1080x1920 PNGs
    Export {
        /// Export only this slide (1-based)
        #[arg(short, long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        index: Option<usize>,

        /// Output directory (defaults to export.output-dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Record what worked and what did not in the knowledge log
    Learn {
        /// Strategy that worked
        #[arg(short, long)]
        strategy: String,

        /// Critique of the result
        #[arg(short = 'x', long)]
        critique: String,
    },
}

/// Convert a 1-based slide number from the command line to an index
///
/// Slide-number arguments reject `0` at parse time.
pub fn slide_index(number: usize) -> usize {
    number.saturating_sub(1)
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pageforge")
        .join("logs")
        .join("pageforge.log")
}

/// Generate the after_help text with key status and file locations
pub fn generate_after_help(config: &Config) -> String {
    debug!("generate_after_help: called");
    let mut help = String::new();

    let key_icon = if std::env::var(&config.llm.api_key_env).is_ok() {
        "\u{2705}"
    } else {
        "\u{274C}"
    };
    help.push_str("API key:\n");
    help.push_str(&format!("  {} {}\n", key_icon, config.llm.api_key_env));

    help.push('\n');
    help.push_str(&format!("Session is stored in: {}\n", config.storage.session_dir.display()));
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));
    help
}

/// One-line progress strip over the four generation steps
pub fn format_progress(stage: PipelineStage) -> String {
    PROGRESS_STEPS
        .iter()
        .map(|step| {
            let label = step.label();
            match stage.step_status(*step) {
                StepStatus::Completed => format!("\u{2713} {}", label).green().to_string(),
                StepStatus::Active => format!("\u{25CF} {}", label).bright_cyan().bold().to_string(),
                StepStatus::Pending => format!("\u{25CB} {}", label).dimmed().to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// Render one slide as a short block
pub fn format_slice(index: usize, slice: &GeneratedSlice, focused: bool) -> String {
    let marker = if focused { "\u{25B6}".bright_yellow().to_string() } else { " ".to_string() };
    let image = if slice.url.is_empty() {
        "no image".red().to_string()
    } else {
        "image".dimmed().to_string()
    };
    format!(
        "{} {} {} {} ({})\n    {}\n    {}",
        marker,
        format!("{}.", index + 1).bold(),
        slice.section_type.badge(index).bright_blue(),
        slice.title,
        image,
        slice.copy.bright_white().bold(),
        slice.description
    )
}

pub fn format_chat_message(message: &ChatMessage) -> String {
    let who = match message.role {
        ChatRole::User => "You".bright_green(),
        ChatRole::Model => "Editor".bright_blue(),
    };
    format!("{}: {}", who, message.text)
}

/// Print stage, progress and every slide of `session`
pub fn print_session(session: &Session) {
    println!("{} {}", "Stage:".bright_cyan(), session.stage);
    println!("{}", format_progress(session.stage));
    if let Some(error) = &session.last_error {
        println!("{} {}", "Last error:".red(), error);
    }
    if let Some(product) = &session.product {
        println!("{} {} ({} image(s))", "Product:".bright_cyan(), product.name, product.images.len());
    }
    println!();
    if session.slices.is_empty() {
        println!("{}", "No slides yet. Run `pf build` first.".dimmed());
        return;
    }
    for (i, slice) in session.slices.iter().enumerate() {
        println!("{}", format_slice(i, slice, i == session.focus));
    }
}
