//! REPL session management

use std::path::PathBuf;

use colored::Colorize;
use eyre::Result;
use metricstore::{ExampleRecord, InputVariable, MetricDefinition};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use super::commands::{ExampleAction, ReplCommand, parse_command};
use super::spinner::with_spinner;
use crate::cli::print_presets;
use crate::session::{Session, SessionError};
use crate::templater::PromptError;

/// Line that ends a multi-line value
const END_OF_INPUT: &str = ".";

/// Interactive REPL session
pub struct ReplSession {
    session: Session,
    pending_edit: Option<String>,
}

impl ReplSession {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            pending_edit: None,
        }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", prompt_label(&self.session).bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    if !input.starts_with('/') {
                        println!("{} Commands start with '/'. Type {} for help", "?".yellow(), "/help".yellow());
                        continue;
                    }

                    match parse_command(input) {
                        Ok(command) => match self.handle_command(&mut rl, command).await {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        },
                        Err(message) => {
                            println!("{} {}", "?".yellow(), message);
                            println!("Type {} for available commands", "/help".yellow());
                        }
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

    fn print_welcome(&self) {
        println!();
        println!("{}", "evalprompt - evaluation prompt workbench".bright_cyan().bold());
        println!("Model: {}", self.session.templater().model());
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    /// Execute one command; failures are printed and never end the loop
    async fn handle_command(&mut self, rl: &mut DefaultEditor, command: ReplCommand) -> SlashResult {
        debug!(?command, "handle_command: called");
        if command == ReplCommand::Quit {
            return SlashResult::Quit;
        }
        if let Err(e) = self.dispatch(rl, command).await {
            println!("{} {}", "Error:".red(), e);
            if let Some(hint) = error_hint(&e) {
                println!("{}", hint.dimmed());
            }
        }
        SlashResult::Continue
    }

    async fn dispatch(&mut self, rl: &mut DefaultEditor, command: ReplCommand) -> Result<()> {
        match command {
            ReplCommand::New => {
                self.session.new_metric();
                self.pending_edit = None;
                println!("{}", "Started a new metric.".dimmed());
            }
            ReplCommand::Name(value) => {
                let value = match value {
                    Some(v) => Some(v),
                    None => read_line(rl, "Metric name")?,
                };
                if let Some(name) = value {
                    self.session.set_name(name);
                }
            }
            ReplCommand::Criteria(value) => {
                let value = match value {
                    Some(v) => Some(v),
                    None => read_multiline(rl, "evaluation criteria")?,
                };
                if let Some(text) = value {
                    self.session.set_criteria(text);
                }
            }
            ReplCommand::Rubric(value) => {
                let value = match value {
                    Some(v) => Some(v),
                    None => read_multiline(rl, "scoring rubric (or a preset key, see /presets)")?,
                };
                if let Some(text) = value {
                    self.session.set_rubric(text);
                }
            }
            ReplCommand::Vars(value) => {
                let value = match value {
                    Some(v) => Some(v),
                    None => read_line(rl, "Input variables")?,
                };
                if let Some(list) = value {
                    let vars = self.session.set_variables(&list)?;
                    println!("Input variables: {}", vars.to_string().cyan());
                }
            }
            ReplCommand::Example(action) => self.handle_example(rl, action).await?,
            ReplCommand::Generate => {
                let definition = with_spinner("Generating prompt...", self.session.generate()).await?;
                self.pending_edit = None;
                print_prompt(definition);
            }
            ReplCommand::Regenerate => {
                let definition = with_spinner("Regenerating prompt...", self.session.regenerate()).await?;
                self.pending_edit = None;
                print_prompt(definition);
            }
            ReplCommand::Edit => {
                if let Some(text) = read_multiline(rl, "edited prompt")? {
                    self.pending_edit = Some(text);
                    println!("{}", "Edit staged. Use /save to store it.".dimmed());
                }
            }
            ReplCommand::Save => {
                let prompt = match self.pending_edit.take() {
                    Some(text) => text,
                    None => self
                        .session
                        .current()
                        .map(|d| d.prompt.clone())
                        .ok_or(SessionError::NoSelection)?,
                };
                let definition = self.session.save(prompt)?;
                println!("{} {}", "Saved".green(), definition.name);
            }
            ReplCommand::Reset => {
                self.pending_edit = None;
                let definition = self.session.reset()?;
                print_prompt(definition);
            }
            ReplCommand::Deploy(path) => {
                let path = match path {
                    Some(path) => path,
                    None => {
                        let name = self
                            .session
                            .current()
                            .map(|d| d.name.to_string())
                            .ok_or(SessionError::NoSelection)?;
                        PathBuf::from(format!("{}.yml", name))
                    }
                };
                self.session.deploy(&path)?;
                println!("{} {}", "Deployed to".green(), path.display());
            }
            ReplCommand::Delete => {
                let removed = self.session.delete()?;
                self.pending_edit = None;
                println!("{} {}", "Deleted".green(), removed.name);
            }
            ReplCommand::Select(name) => {
                let definition = self.session.select(&name)?;
                self.pending_edit = None;
                print_prompt(definition);
            }
            ReplCommand::Show => self.print_form(),
            ReplCommand::List => self.print_list(),
            ReplCommand::Presets => print_presets(),
            ReplCommand::Help => print_help(),
            ReplCommand::Quit => {}
        }
        Ok(())
    }

    async fn handle_example(&mut self, rl: &mut DefaultEditor, action: ExampleAction) -> Result<()> {
        debug!(?action, "handle_example: called");
        match action {
            ExampleAction::Add => {
                let Some(example) = read_example(rl, &self.session)? else {
                    return Ok(());
                };
                let count = self.session.add_example(example)?;
                println!("Added example {}", count);
            }
            ExampleAction::Generate => {
                let example = with_spinner("Generating example...", self.session.generate_example())
                    .await?
                    .clone();
                let count = self.session.form().examples.len();
                let vars = self.session.form().variables.clone();
                println!("{}", example.render(count, &vars));
            }
            ExampleAction::Remove(position) => {
                self.session.remove_example(position)?;
                println!("Removed example {}", position);
            }
            ExampleAction::Clear => {
                self.session.clear_examples();
                println!("{}", "Examples cleared.".dimmed());
            }
        }
        Ok(())
    }

    fn print_form(&self) {
        let form = self.session.form();
        let or_unset = |s: &str| if s.trim().is_empty() { "(unset)".dimmed().to_string() } else { s.to_string() };

        println!();
        println!("{}", "Metric:".bright_cyan());
        println!("  {:16} {}", "name".yellow(), or_unset(&form.name));
        println!("  {:16} {}", "criteria".yellow(), or_unset(&form.criteria));
        println!("  {:16} {}", "rubric".yellow(), or_unset(&form.rubric));
        println!("  {:16} {}", "variables".yellow(), form.variables);
        println!("  {:16} {}", "examples".yellow(), form.examples.len());
        for (i, example) in form.examples.iter().enumerate() {
            println!();
            println!("{}", example.render(i + 1, &form.variables).dimmed());
        }
        if let Some(definition) = self.session.current() {
            print_prompt(definition);
        }
        if self.pending_edit.is_some() {
            println!("{}", "An unsaved edit is staged.".yellow());
        }
        println!();
    }

    fn print_list(&self) {
        let names = self.session.store().list();
        if names.is_empty() {
            println!("{}", "No metrics yet.".dimmed());
            return;
        }
        let selected = self.session.current().map(|d| &d.name);
        for name in names {
            let marker = if Some(name) == selected { "*" } else { " " };
            println!(" {} {}", marker.green(), name);
        }
    }
}

/// Result of handling a slash command
enum SlashResult {
    Continue,
    Quit,
}

/// Follow-up advice for errors the user can act on
fn error_hint(err: &eyre::Report) -> Option<String> {
    match err.downcast_ref::<SessionError>()? {
        SessionError::Prompt(PromptError::Llm(llm)) if llm.is_rate_limit() => {
            let wait = llm.retry_after().map(|d| d.as_secs()).unwrap_or_default();
            Some(format!("Rate limited by the provider; try again in {}s", wait))
        }
        SessionError::Prompt(PromptError::Llm(llm)) if llm.is_transient() => {
            Some("Temporary failure; run the command again to retry".to_string())
        }
        SessionError::Metric(metric) if metric.is_validation() => {
            Some("Fix the form with /name, /criteria, /rubric, /vars or /example, then try again".to_string())
        }
        _ => None,
    }
}

fn prompt_label(session: &Session) -> String {
    match session.current() {
        Some(definition) => format!("{}>", definition.name),
        None => ">".to_string(),
    }
}

fn print_prompt(definition: &MetricDefinition) {
    println!();
    println!("{} {}", "Prompt for".bright_cyan(), definition.name.to_string().bold());
    if definition.prompt != definition.generated_prompt {
        println!("{}", "(edited; /reset restores the generated version)".dimmed());
    }
    println!("{}", definition.prompt);
    println!();
}

fn print_help() {
    println!();
    println!("{}", "Form:".bright_cyan());
    println!("  {:24} Clear the form and start a new metric", "/new".yellow());
    println!("  {:24} Set the metric name", "/name [name]".yellow());
    println!("  {:24} Set the evaluation criteria", "/criteria [text]".yellow());
    println!("  {:24} Set the scoring rubric or a preset key", "/rubric [text]".yellow());
    println!("  {:24} Set input variables, e.g. input,response,context", "/vars [list]".yellow());
    println!("  {:24} Add, generate, remove or clear examples", "/example add|gen|rm N|clear".yellow());
    println!();
    println!("{}", "Prompt:".bright_cyan());
    println!("  {:24} Generate the evaluation prompt", "/generate".yellow());
    println!("  {:24} Generate again for an existing metric", "/regenerate".yellow());
    println!("  {:24} Edit the prompt", "/edit".yellow());
    println!("  {:24} Store the edited prompt", "/save".yellow());
    println!("  {:24} Restore the generated prompt", "/reset".yellow());
    println!("  {:24} Write the metric as YAML", "/deploy [path]".yellow());
    println!("  {:24} Delete the selected metric", "/delete".yellow());
    println!();
    println!("{}", "Other:".bright_cyan());
    println!("  {:24} Load a stored metric into the form", "/select <name>".yellow());
    println!("  {:24} Show the form and current prompt", "/show".yellow());
    println!("  {:24} List stored metrics", "/list".yellow());
    println!("  {:24} List scoring rubric presets", "/presets".yellow());
    println!("  {:24} Show this help", "/help".yellow());
    println!("  {:24} Exit", "/quit".yellow());
    println!();
    println!("Multi-line values end with a line containing only '{}'.", END_OF_INPUT);
    println!();
}

/// Read one line; `None` when cancelled or empty
fn read_line(rl: &mut DefaultEditor, label: &str) -> Result<Option<String>> {
    match rl.readline(&format!("{}: ", label)) {
        Ok(line) => {
            let line = line.trim();
            Ok((!line.is_empty()).then(|| line.to_string()))
        }
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(err) => Err(eyre::eyre!("Readline error: {}", err)),
    }
}

/// Read lines until a terminator line; `None` when cancelled or empty
fn read_multiline(rl: &mut DefaultEditor, label: &str) -> Result<Option<String>> {
    println!(
        "{}",
        format!("Enter {}. Finish with a line containing only '{}'.", label, END_OF_INPUT).dimmed()
    );
    let mut buffer = MultilineBuffer::default();
    loop {
        match rl.readline("... ") {
            Ok(line) => {
                if buffer.push(&line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => return Ok(None),
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(eyre::eyre!("Readline error: {}", err)),
        }
    }
    Ok(buffer.finish())
}

/// Prompt for each example field the form's variables allow
fn read_example(rl: &mut DefaultEditor, session: &Session) -> Result<Option<ExampleRecord>> {
    let vars = &session.form().variables;
    let mut example = ExampleRecord::default();

    let Some(input) = read_line(rl, "Question (input)")? else {
        return Ok(None);
    };
    example.input = input;
    let Some(response) = read_line(rl, "Answer (response)")? else {
        return Ok(None);
    };
    example.response = response;
    if vars.contains(InputVariable::Context) {
        example.context = read_line(rl, "Context")?;
    }
    if vars.contains(InputVariable::Reference) {
        example.reference = read_line(rl, "Reference response")?;
    }
    let Some(score) = read_line(rl, "Score")? else {
        return Ok(None);
    };
    example.score = score;
    example.critique = read_line(rl, "Critique")?.unwrap_or_default();
    Ok(Some(example))
}

/// Accumulates multi-line input until the terminator line
#[derive(Debug, Default)]
struct MultilineBuffer {
    lines: Vec<String>,
}

impl MultilineBuffer {
    /// Add a line; returns true once the terminator is seen
    fn push(&mut self, line: &str) -> bool {
        if line.trim() == END_OF_INPUT {
            return true;
        }
        self.lines.push(line.trim_end().to_string());
        false
    }

    fn finish(self) -> Option<String> {
        let text = self.lines.join("\n");
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}
