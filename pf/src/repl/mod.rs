//! Interactive editor REPL
//!
//! Free text goes to the editor assistant about the focused slide; slash
//! commands move the focus, show the page and export it.

mod session;

pub use session::{ReplSession, SlashCommand};

use std::path::PathBuf;
use std::sync::Arc;

use eyre::Result;

use crate::agent::{ChatAgent, ChatSession};
use crate::config::Config;
use crate::export::Exporter;
use crate::llm::LlmClient;
use crate::state::StateManager;

/// Run the interactive REPL
///
/// This is the entry point for `pf chat` without a message.
pub async fn run_interactive(
    config: &Config,
    llm: Arc<dyn LlmClient>,
    state: StateManager,
    initial_message: Option<String>,
) -> Result<()> {
    let chat = ChatSession::new(ChatAgent::new(llm, config.llm.chat_model.clone()), state.clone());
    let exporter = Exporter::from_config(&config.export)?;
    let out_dir: PathBuf = config.export.output_dir.clone();

    let mut session = ReplSession::new(chat, state, exporter, out_dir);
    session.run(initial_message).await
}
