//! PageForge - AI product detail-page builder
//!
//! CLI entry point: build a page, inspect and edit it, chat with the editor
//! assistant, export PNGs and record lessons in the knowledge log.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use knowledgestore::KnowledgeStore;
use pageforge::agent::{ChatAgent, ChatError, ChatSession};
use pageforge::cli::{Cli, Command, format_progress, format_slice, generate_after_help, print_session, slide_index};
use pageforge::config::Config;
use pageforge::domain::{ImageData, PipelineStage, ProductData, SlicePatch};
use pageforge::export::Exporter;
use pageforge::llm::{LlmClient, create_client};
use pageforge::pipeline::{Pipeline, PipelineError, PipelineModels};
use pageforge::repl;
use pageforge::state::{FileSessionPersistence, StateEvent, StateManager};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pageforge")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level_str = cli_log_level.or(config_log_level);
    let level = if let Some(s) = level_str {
        match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        }
    } else {
        tracing::Level::INFO
    };

    let log_file = fs::File::create(log_dir.join("pageforge.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Build command with dynamic after_help that shows key status and file locations
    let cmd = Cli::command().after_help(generate_after_help(&Config::load(None).unwrap_or_default()));

    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(provider = %config.llm.provider, "PageForge loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Build {
            name,
            specs,
            images,
            export,
        } => {
            debug!(%name, images = images.len(), export, "main: matched Build command");
            cmd_build(&config, name, specs, images, export).await
        }
        Command::Show { json } => {
            debug!(json, "main: matched Show command");
            cmd_show(&config, json).await
        }
        Command::Edit {
            index,
            copy,
            description,
        } => {
            debug!(index, "main: matched Edit command");
            cmd_edit(&config, index, copy, description).await
        }
        Command::Focus { index } => {
            debug!(index, "main: matched Focus command");
            cmd_focus(&config, index).await
        }
        Command::Chat { message } => {
            debug!(has_message = message.is_some(), "main: matched Chat command");
            cmd_chat(&config, message).await
        }
        Command::Export { index, out } => {
            debug!(?index, ?out, "main: matched Export command");
            cmd_export(&config, index, out).await
        }
        Command::Learn { strategy, critique } => {
            debug!("main: matched Learn command");
            cmd_learn(&config, &strategy, &critique)
        }
    }
}

/// Spawn the state actor over the session file
fn open_state(config: &Config) -> Result<StateManager> {
    debug!(dir = %config.storage.session_dir.display(), "open_state: called");
    let persistence = FileSessionPersistence::open(&config.storage.session_dir)?;
    Ok(StateManager::spawn(persistence))
}

/// Persist the session and stop the actor
async fn close_state(state: StateManager) -> Result<()> {
    debug!("close_state: called");
    state.flush().await.context("Failed to save session")?;
    state.shutdown().await?;
    Ok(())
}

/// Backend client, after checking the key is present
fn open_client(config: &Config) -> Result<Arc<dyn LlmClient>> {
    config.validate()?;
    create_client(&config.llm).map_err(|e| eyre::eyre!("Failed to create LLM client: {}", e))
}

/// Build a new page
async fn cmd_build(config: &Config, name: String, specs: String, images: Vec<PathBuf>, export: bool) -> Result<()> {
    debug!(%name, "cmd_build: called");
    let images = images
        .iter()
        .map(|path| ImageData::from_path(path).with_context(|| format!("Failed to read image {}", path.display())))
        .collect::<Result<Vec<_>>>()?;
    let product = ProductData::new(name, specs, images);
    product.validate().map_err(|msg| eyre::eyre!(msg))?;

    let llm = open_client(config)?;
    let state = open_state(config)?;
    let pipeline = Pipeline::new(llm, state.clone(), PipelineModels::from(&config.llm));

    let printer = tokio::spawn(print_progress(state.clone(), state.subscribe_events()));
    let result = pipeline.build(&product).await;
    match &result {
        // Runs that reached completed or error have already told the printer to stop
        Ok(_) | Err(PipelineError::ExternalService { .. }) => {
            let _ = printer.await;
        }
        Err(_) => printer.abort(),
    }

    let outcome = match result {
        Ok(slices) => {
            println!();
            println!("{} {} slide(s)", "Completed:".green().bold(), slices.len());
            if export && !slices.is_empty() {
                let exporter = Exporter::from_config(&config.export)?;
                let batch = exporter.export_all(&slices, &config.export.output_dir);
                println!(
                    "Exporting {} slide(s) to {}...",
                    batch.len(),
                    config.export.output_dir.display()
                );
                batch.wait().await;
            }
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Build failed");
            Err(eyre::eyre!("Build failed: {}", e))
        }
    };

    close_state(state).await?;
    outcome
}

/// Print stage changes and slides as they arrive
async fn print_progress(state: StateManager, mut events: broadcast::Receiver<StateEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "print_progress: lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        match event {
            StateEvent::StageChanged { to, .. } => {
                println!("{}", format_progress(to));
                if to == PipelineStage::Completed || to == PipelineStage::Error {
                    break;
                }
            }
            StateEvent::SliceAppended { index, .. } => {
                match state.slices().await {
                    Ok(slices) => {
                        if let Some(slice) = slices.get(index) {
                            println!("{}", format_slice(index, slice, false));
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to read slides for progress"),
                }
            }
            _ => {}
        }
    }
}

/// Show the current session
async fn cmd_show(config: &Config, json: bool) -> Result<()> {
    debug!(json, "cmd_show: called");
    let state = open_state(config)?;
    let session = state.snapshot().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        print_session(&session);
    }
    state.shutdown().await?;
    Ok(())
}

/// Replace a slide's text by hand
async fn cmd_edit(config: &Config, number: usize, copy: Option<String>, description: Option<String>) -> Result<()> {
    debug!(number, "cmd_edit: called");
    let patch = SlicePatch { copy, description };
    if patch.is_empty() {
        return Err(eyre::eyre!("Nothing to change. Pass --copy and/or --description."));
    }

    let state = open_state(config)?;
    let index = slide_index(number);
    let result = state.patch_fields(index, patch).await;
    match result {
        Ok(slice) => println!("{}", format_slice(index, &slice, false)),
        Err(e) => {
            state.shutdown().await?;
            return Err(eyre::eyre!("Edit failed: {}", e));
        }
    }
    close_state(state).await
}

/// Move the focus
async fn cmd_focus(config: &Config, number: usize) -> Result<()> {
    debug!(number, "cmd_focus: called");
    let state = open_state(config)?;
    let focus = state.set_focus(slide_index(number)).await?;
    let session = state.snapshot().await?;
    match session.slices.get(focus) {
        Some(slice) => println!("{}", format_slice(focus, slice, true)),
        None => println!("{}", "No slides yet.".dimmed()),
    }
    close_state(state).await
}

/// One chat message, or the interactive editor without one
async fn cmd_chat(config: &Config, message: Option<String>) -> Result<()> {
    debug!(has_message = message.is_some(), "cmd_chat: called");
    let llm = open_client(config)?;
    let state = open_state(config)?;

    let Some(message) = message else {
        let result = repl::run_interactive(config, llm, state.clone(), None).await;
        close_state(state).await?;
        return result;
    };

    let chat = ChatSession::new(ChatAgent::new(llm, config.llm.chat_model.clone()), state.clone());
    let outcome = match chat.exchange(&message).await {
        Ok(reply) => {
            println!("{} {}", "Editor:".bright_blue(), reply.text);
            if reply.action.is_some() {
                let session = state.snapshot().await?;
                if let Some(slice) = session.focused() {
                    println!("{}", "Slide updated:".green());
                    println!("{}", format_slice(session.focus, slice, true));
                }
            }
            Ok(())
        }
        Err(ChatError::Service(e)) if e.is_client_error() => Err(eyre::eyre!(
            "{}\nCheck chat-model and {} in your config.",
            e,
            config.llm.api_key_env
        )),
        Err(e) => Err(e.into()),
    };

    close_state(state).await?;
    outcome
}

/// Export one or all slides
async fn cmd_export(config: &Config, number: Option<usize>, out: Option<PathBuf>) -> Result<()> {
    debug!(?number, "cmd_export: called");
    let out = out.unwrap_or_else(|| config.export.output_dir.clone());
    let exporter = Exporter::from_config(&config.export)?;
    if !exporter.has_font() {
        println!("{}", "No font available, exporting without text.".yellow());
    }

    let state = open_state(config)?;
    let slices = state.slices().await?;
    state.shutdown().await?;

    if slices.is_empty() {
        println!("{}", "Nothing to export. Run `pf build` first.".dimmed());
        return Ok(());
    }

    match number {
        Some(number) => {
            let index = slide_index(number);
            let slice = slices
                .get(index)
                .ok_or_else(|| eyre::eyre!("Slide {} does not exist ({} slides)", number, slices.len()))?;
            let path = exporter.export_one(slice, index, &out)?;
            println!("{} {}", "Saved".green(), path.display());
        }
        None => {
            let batch = exporter.export_all(&slices, &out);
            println!("Exporting {} slide(s) to {}...", batch.len(), out.display());
            batch.wait().await;
            println!("{}", "Done.".green());
        }
    }
    Ok(())
}

/// Append a strategy and a critique to the knowledge log
fn cmd_learn(config: &Config, strategy: &str, critique: &str) -> Result<()> {
    debug!("cmd_learn: called");
    let store = KnowledgeStore::open(&config.storage.knowledge_dir)?;
    let knowledge = store.save(strategy, critique)?;
    println!(
        "{} {} project(s), {} strategies, {} critiques",
        "Recorded:".green(),
        knowledge.total_projects,
        knowledge.successful_strategies.len(),
        knowledge.failed_points.len()
    );
    Ok(())
}
