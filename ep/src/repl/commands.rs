//! Slash command parsing

use std::path::PathBuf;

use tracing::debug;

/// Actions on the form's few-shot examples
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExampleAction {
    Add,
    Generate,
    Remove(usize),
    Clear,
}

/// A parsed REPL command
///
/// Text arguments are `None` when omitted; the REPL then reads a multi-line
/// value ended by a line containing only `.`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    New,
    Name(Option<String>),
    Criteria(Option<String>),
    Rubric(Option<String>),
    Vars(Option<String>),
    Example(ExampleAction),
    Generate,
    Regenerate,
    Edit,
    Save,
    Reset,
    Deploy(Option<PathBuf>),
    Delete,
    Select(String),
    Show,
    List,
    Presets,
    Help,
    Quit,
}

/// Parse one line of input starting with `/`
pub fn parse_command(input: &str) -> Result<ReplCommand, String> {
    debug!(%input, "parse_command: called");
    let input = input.trim();
    let (cmd, rest) = match input.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (input, ""),
    };
    let arg = (!rest.is_empty()).then(|| rest.to_string());

    match cmd {
        "/new" | "/n" => Ok(ReplCommand::New),
        "/name" => Ok(ReplCommand::Name(arg)),
        "/criteria" => Ok(ReplCommand::Criteria(arg)),
        "/rubric" => Ok(ReplCommand::Rubric(arg)),
        "/vars" | "/variables" => Ok(ReplCommand::Vars(arg)),
        "/example" | "/ex" => parse_example_action(rest).map(ReplCommand::Example),
        "/generate" | "/g" => Ok(ReplCommand::Generate),
        "/regenerate" | "/rg" => Ok(ReplCommand::Regenerate),
        "/edit" | "/e" => Ok(ReplCommand::Edit),
        "/save" => Ok(ReplCommand::Save),
        "/reset" => Ok(ReplCommand::Reset),
        "/deploy" => Ok(ReplCommand::Deploy(arg.map(PathBuf::from))),
        "/delete" => Ok(ReplCommand::Delete),
        "/select" => arg
            .map(ReplCommand::Select)
            .ok_or_else(|| "Usage: /select <name>".to_string()),
        "/show" | "/s" => Ok(ReplCommand::Show),
        "/list" | "/ls" => Ok(ReplCommand::List),
        "/presets" => Ok(ReplCommand::Presets),
        "/help" | "/h" => Ok(ReplCommand::Help),
        "/quit" | "/q" | "/exit" => Ok(ReplCommand::Quit),
        _ => {
            debug!(%cmd, "parse_command: unknown command");
            Err(format!("Unknown command: {}", cmd))
        }
    }
}

fn parse_example_action(rest: &str) -> Result<ExampleAction, String> {
    let usage = || "Usage: /example add|gen|rm <n>|clear".to_string();
    let mut parts = rest.split_whitespace();
    let action = match parts.next() {
        Some("add") => ExampleAction::Add,
        Some("gen" | "generate") => ExampleAction::Generate,
        Some("rm" | "remove") => {
            let position = parts
                .next()
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(usage)?;
            ExampleAction::Remove(position)
        }
        Some("clear") => ExampleAction::Clear,
        _ => return Err(usage()),
    };
    if parts.next().is_some() {
        return Err(usage());
    }
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_inline_argument() {
        assert_eq!(
            parse_command("/name  answer_tone "),
            Ok(ReplCommand::Name(Some("answer_tone".to_string())))
        );
        assert_eq!(
            parse_command("/criteria Is the answer polite?"),
            Ok(ReplCommand::Criteria(Some("Is the answer polite?".to_string())))
        );
        assert_eq!(
            parse_command("/vars input, response, context"),
            Ok(ReplCommand::Vars(Some("input, response, context".to_string())))
        );
    }

    #[test]
    fn test_parse_without_argument_requests_multiline() {
        assert_eq!(parse_command("/criteria"), Ok(ReplCommand::Criteria(None)));
        assert_eq!(parse_command("/rubric"), Ok(ReplCommand::Rubric(None)));
        assert_eq!(parse_command("/deploy"), Ok(ReplCommand::Deploy(None)));
    }

    #[test]
    fn test_parse_example_actions() {
        assert_eq!(parse_command("/example add"), Ok(ReplCommand::Example(ExampleAction::Add)));
        assert_eq!(parse_command("/example gen"), Ok(ReplCommand::Example(ExampleAction::Generate)));
        assert_eq!(parse_command("/ex rm 2"), Ok(ReplCommand::Example(ExampleAction::Remove(2))));
        assert_eq!(parse_command("/example clear"), Ok(ReplCommand::Example(ExampleAction::Clear)));
        assert!(parse_command("/example rm").is_err());
        assert!(parse_command("/example rm two").is_err());
        assert!(parse_command("/example").is_err());
        assert!(parse_command("/example clear now").is_err());
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("/generate"), Ok(ReplCommand::Generate));
        assert_eq!(parse_command("/regenerate"), Ok(ReplCommand::Regenerate));
        assert_eq!(parse_command("/q"), Ok(ReplCommand::Quit));
        assert_eq!(
            parse_command("/deploy out/tone.yml"),
            Ok(ReplCommand::Deploy(Some(PathBuf::from("out/tone.yml"))))
        );
    }

    #[test]
    fn test_parse_select_requires_name() {
        assert!(parse_command("/select").is_err());
        assert_eq!(parse_command("/select tone"), Ok(ReplCommand::Select("tone".to_string())));
    }

    #[test]
    fn test_parse_unknown() {
        let err = parse_command("/frobnicate").unwrap_err();
        assert!(err.contains("/frobnicate"));
    }
}
