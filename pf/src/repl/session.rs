//! REPL session over one page

use std::path::PathBuf;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::agent::{ChatError, ChatSession};
use crate::cli::{format_chat_message, format_slice, print_session};
use crate::export::Exporter;
use crate::state::StateManager;

/// Parsed slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Quit,
    Show,
    Next,
    Prev,
    /// 1-based slide number
    Focus(usize),
    /// Export the focused slide
    Export,
    /// Export every slide
    ExportAll,
    History,
    Unknown(String),
}

impl SlashCommand {
    pub fn parse(input: &str) -> Self {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("");

        match cmd {
            "/help" | "/h" => Self::Help,
            "/quit" | "/q" | "/exit" => Self::Quit,
            "/show" | "/s" => Self::Show,
            "/next" | "/n" => Self::Next,
            "/prev" | "/p" => Self::Prev,
            "/focus" | "/f" => match parts.get(1).and_then(|n| n.parse().ok()) {
                Some(n) => Self::Focus(n),
                None => Self::Unknown(input.to_string()),
            },
            "/export" => match parts.get(1) {
                Some(&"all") => Self::ExportAll,
                Some(_) => Self::Unknown(input.to_string()),
                None => Self::Export,
            },
            "/history" => Self::History,
            _ => Self::Unknown(cmd.to_string()),
        }
    }
}

/// Interactive editing session
pub struct ReplSession {
    chat: ChatSession,
    state: StateManager,
    exporter: Exporter,
    out_dir: PathBuf,
}

impl ReplSession {
    pub fn new(chat: ChatSession, state: StateManager, exporter: Exporter, out_dir: PathBuf) -> Self {
        Self {
            chat,
            state,
            exporter,
            out_dir,
        }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self, initial_message: Option<String>) -> Result<()> {
        debug!("run: called");
        self.print_welcome().await?;

        if let Some(message) = initial_message {
            println!("{} {}", ">".bright_green(), message);
            self.send(&message).await?;
        }

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let prompt = self.prompt().await?;
            match rl.readline(&prompt) {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(SlashCommand::parse(input)).await? {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.send(input).await?;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    async fn prompt(&self) -> Result<String> {
        let session = self.state.snapshot().await?;
        if session.slices.is_empty() {
            return Ok(format!("{} ", ">".bright_green()));
        }
        Ok(format!(
            "{} ",
            format!("[{}/{}]>", session.focus + 1, session.slices.len()).bright_green()
        ))
    }

    async fn print_welcome(&self) -> Result<()> {
        let session = self.state.snapshot().await?;
        println!();
        println!("{}", "PageForge Editor".bright_cyan().bold());
        match &session.product {
            Some(product) => println!("Product: {} ({} slides)", product.name, session.slices.len()),
            None => println!("{}", "No page built yet. Run `pf build` first.".dimmed()),
        }
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
        Ok(())
    }

    async fn handle_slash_command(&mut self, command: SlashCommand) -> Result<SlashResult> {
        debug!(?command, "handle_slash_command: called");
        match command {
            SlashCommand::Help => self.print_help(),
            SlashCommand::Quit => return Ok(SlashResult::Quit),
            SlashCommand::Show => print_session(&self.state.snapshot().await?),
            SlashCommand::Next => {
                let focus = self.state.snapshot().await?.focus;
                self.focus(focus + 1).await?;
            }
            SlashCommand::Prev => {
                let focus = self.state.snapshot().await?.focus;
                self.focus(focus.saturating_sub(1)).await?;
            }
            SlashCommand::Focus(n) => self.focus(n.saturating_sub(1)).await?,
            SlashCommand::Export => {
                let session = self.state.snapshot().await?;
                match session.focused() {
                    Some(slice) => match self.exporter.export_one(slice, session.focus, &self.out_dir) {
                        Ok(path) => println!("{} {}", "Saved".green(), path.display()),
                        Err(e) => println!("{} {}", "Export failed:".red(), e),
                    },
                    None => println!("{}", "Nothing to export.".dimmed()),
                }
            }
            SlashCommand::ExportAll => {
                let slices = self.state.slices().await?;
                let batch = self.exporter.export_all(&slices, &self.out_dir);
                println!("Exporting {} slide(s) to {}...", batch.len(), self.out_dir.display());
                batch.wait().await;
                println!("{}", "Done.".green());
            }
            SlashCommand::History => self.print_history().await?,
            SlashCommand::Unknown(cmd) => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
            }
        }
        Ok(SlashResult::Continue)
    }

    async fn focus(&self, index: usize) -> Result<()> {
        let focus = self.state.set_focus(index).await?;
        let session = self.state.snapshot().await?;
        match session.slices.get(focus) {
            Some(slice) => println!("{}", format_slice(focus, slice, true)),
            None => println!("{}", "No slides yet.".dimmed()),
        }
        Ok(())
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:14} Show this help", "/help".yellow());
        println!("  {:14} Exit the editor", "/quit".yellow());
        println!("  {:14} Show every slide", "/show".yellow());
        println!("  {:14} Focus the next slide", "/next".yellow());
        println!("  {:14} Focus the previous slide", "/prev".yellow());
        println!("  {:14} Focus slide N", "/focus N".yellow());
        println!("  {:14} Export the focused slide", "/export".yellow());
        println!("  {:14} Export every slide", "/export all".yellow());
        println!("  {:14} Show the chat log", "/history".yellow());
        println!();
        println!("Anything else is sent to the editor assistant about the focused slide.");
        println!();
    }

    async fn print_history(&self) -> Result<()> {
        let history = self.state.chat_history().await?;
        if history.is_empty() {
            println!("{}", "No conversation history.".dimmed());
            return Ok(());
        }
        println!();
        println!("{}", "Conversation History:".bright_cyan());
        for (i, message) in history.iter().enumerate() {
            println!("  {}. {}", i + 1, format_chat_message(message));
        }
        println!();
        Ok(())
    }

    /// Send one chat message and print the outcome
    ///
    /// Chat failures are shown inline; only state failures end the session.
    async fn send(&self, message: &str) -> Result<()> {
        println!("{}", "...".dimmed());
        match self.chat.exchange(message).await {
            Ok(reply) => {
                println!("{} {}", "Editor:".bright_blue(), reply.text);
                if reply.action.is_some() {
                    let session = self.state.snapshot().await?;
                    if let Some(slice) = session.focused() {
                        println!("{}", "Slide updated:".green());
                        println!("{}", format_slice(session.focus, slice, true));
                    }
                }
            }
            Err(ChatError::State(e)) => return Err(e.into()),
            Err(e) => println!("{} {}", "Error:".red(), e),
        }
        println!();
        Ok(())
    }
}

/// Result of handling a slash command
enum SlashResult {
    Continue,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_commands() {
        assert_eq!(SlashCommand::parse("/help"), SlashCommand::Help);
        assert_eq!(SlashCommand::parse("/q"), SlashCommand::Quit);
        assert_eq!(SlashCommand::parse("/exit"), SlashCommand::Quit);
        assert_eq!(SlashCommand::parse("/next"), SlashCommand::Next);
        assert_eq!(SlashCommand::parse("/p"), SlashCommand::Prev);
        assert_eq!(SlashCommand::parse("/history"), SlashCommand::History);
    }

    #[test]
    fn test_parse_focus() {
        assert_eq!(SlashCommand::parse("/focus 3"), SlashCommand::Focus(3));
        assert_eq!(SlashCommand::parse("  /f   2 "), SlashCommand::Focus(2));
        assert!(matches!(SlashCommand::parse("/focus x"), SlashCommand::Unknown(_)));
        assert!(matches!(SlashCommand::parse("/focus"), SlashCommand::Unknown(_)));
    }

    #[test]
    fn test_parse_export() {
        assert_eq!(SlashCommand::parse("/export"), SlashCommand::Export);
        assert_eq!(SlashCommand::parse("/export all"), SlashCommand::ExportAll);
        assert!(matches!(SlashCommand::parse("/export some"), SlashCommand::Unknown(_)));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(SlashCommand::parse("/bogus arg"), SlashCommand::Unknown("/bogus".to_string()));
    }
}
