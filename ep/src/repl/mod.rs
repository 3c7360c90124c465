//! Interactive REPL for evalprompt
//!
//! Slash commands edit the metric form, generate prompts and manage the
//! metrics stored for this session.

mod commands;
mod session;
mod spinner;

pub use commands::{ExampleAction, ReplCommand, parse_command};
pub use session::ReplSession;
pub use spinner::with_spinner;

use eyre::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::session::Session;
use crate::templater::PromptTemplater;

/// Run the interactive REPL
///
/// This is the main entry point for `ep repl` and bare `ep`.
pub async fn run_interactive(config: &Config) -> Result<()> {
    config.validate()?;

    let templater = PromptTemplater::from_config(config).context("Failed to create prompt templater")?;
    info!(model = %templater.model(), "Starting REPL");

    let mut repl = ReplSession::new(Session::new(templater));
    repl.run().await
}
