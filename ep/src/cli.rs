//! CLI command definitions and subcommands

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use metricstore::RubricPreset;
use tracing::debug;

use crate::prompts::TemplateKind;

/// evalprompt - LLM-as-judge evaluation prompt workbench
#[derive(Parser)]
#[command(
    name = "ep",
    about = "Generate, edit and export evaluation prompts for LLM-as-judge metrics",
    version,
    after_help = "Logs are written to: ~/.local/share/evalprompt/logs/evalprompt.log"
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
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the interactive metric editor (default)
    Repl,

    /// Generate one evaluation prompt and print it
    Generate {
        /// Metric name
        #[arg(short, long)]
        name: String,

        /// Evaluation criteria
        #[arg(long)]
        criteria: String,

        /// Scoring rubric text or preset key (see `ep presets`)
        #[arg(short, long)]
        rubric: String,

        /// Input variables, comma separated
        #[arg(short, long, default_value = "input,response")]
        vars: String,

        /// YAML file with up to three few-shot examples
        #[arg(short, long)]
        examples_file: Option<PathBuf>,
    },

    /// List the variable sets that select each prompt template
    Templates,

    /// List scoring rubric presets
    Presets,
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("evalprompt")
        .join("logs")
        .join("evalprompt.log")
}

pub fn print_templates() {
    debug!("print_templates: called");
    println!("{}", "Prompt templates by input variables:".bright_cyan());
    for kind in TemplateKind::ALL {
        let vars: Vec<&str> = kind.variables().iter().map(|v| v.as_str()).collect();
        println!(
            "  {:36} {} ({})",
            vars.join(", ").yellow(),
            kind.label(),
            kind.template_name()
        );
    }
}

pub fn print_presets() {
    debug!("print_presets: called");
    println!("{}", "Scoring rubric presets:".bright_cyan());
    for preset in RubricPreset::ALL {
        println!("  {:12} {}", preset.key().yellow(), preset.description());
    }
}
