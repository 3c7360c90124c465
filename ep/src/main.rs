//! evalprompt - LLM-as-judge evaluation prompt workbench
//!
//! CLI entry point for the interactive editor and one-shot generation.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info};

use evalprompt::cli::{Cli, Command, get_log_path, print_presets, print_templates};
use evalprompt::config::Config;
use evalprompt::repl::{run_interactive, with_spinner};
use evalprompt::session::Session;
use evalprompt::templater::PromptTemplater;
use metricstore::ExampleRecord;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

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
    let cli = Cli::parse();

    // Log level comes from the config file before the full load so that
    // config loading itself is logged
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(
        "evalprompt loaded config: provider={}, model={}",
        config.llm.provider, config.llm.model
    );

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        None | Some(Command::Repl) => run_interactive(&config).await,
        Some(Command::Generate {
            name,
            criteria,
            rubric,
            vars,
            examples_file,
        }) => cmd_generate(&config, name, criteria, rubric, &vars, examples_file.as_deref()).await,
        Some(Command::Templates) => {
            print_templates();
            Ok(())
        }
        Some(Command::Presets) => {
            print_presets();
            Ok(())
        }
    }
}

/// Generate one prompt and print it to stdout
async fn cmd_generate(
    config: &Config,
    name: String,
    criteria: String,
    rubric: String,
    vars: &str,
    examples_file: Option<&Path>,
) -> Result<()> {
    debug!(%name, %vars, ?examples_file, "cmd_generate: called");
    let examples = match examples_file {
        Some(path) => load_examples(path)?,
        None => Vec::new(),
    };

    config.validate()?;
    let templater = PromptTemplater::from_config(config).context("Failed to create prompt templater")?;
    let mut session = Session::new(templater);
    session.set_name(name);
    session.set_criteria(criteria);
    session.set_rubric(rubric);
    session.set_variables(vars)?;
    for example in examples {
        session.add_example(example)?;
    }

    let definition = with_spinner("Generating prompt...", session.generate()).await?;
    println!("{}", definition.prompt);
    Ok(())
}

fn load_examples(path: &Path) -> Result<Vec<ExampleRecord>> {
    let content =
        fs::read_to_string(path).context(format!("Failed to read examples file {}", path.display()))?;
    let examples: Vec<ExampleRecord> =
        serde_yaml::from_str(&content).context(format!("Failed to parse examples file {}", path.display()))?;
    info!(count = examples.len(), "Loaded examples from {}", path.display());
    Ok(examples)
}
