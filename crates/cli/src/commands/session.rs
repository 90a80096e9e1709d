//! Session command - interactive analysis with history

use anyhow::{Context, Result};
use spam_shield_domain::usecases::{
    Renderer, SessionConfig, SessionController, SkipReason, SubmitOutcome,
};
use spam_shield_domain::{ClassificationRecord, Classifier};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::args::SessionArgs;
use crate::commands::classify::build_classifier;
use crate::config::AppConfig;

const HELP: &str = "\
Type or paste email text; each line is appended to the input.
Lines starting with an unknown :word are kept as text; use :: for a literal leading colon.
Commands:
  :analyze        classify the current input
  :show           show the selected result
  :history        list recent analyses
  :select N       select history entry N
  :stats          show safe vs spam/phish counts
  :input          show the current input
  :clear-input    discard the current input
  :clear-history  remove all history entries
  :help           show this help
  :quit           exit";

/// A parsed `:command` line
#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionCommand {
    Analyze,
    Show,
    History,
    Select(usize),
    Stats,
    Input,
    ClearInput,
    ClearHistory,
    Help,
    Quit,
}

impl SessionCommand {
    /// Parse a line; `None` means the line is email text
    fn parse(line: &str) -> Option<Result<Self, String>> {
        let command = line.trim().strip_prefix(':')?;
        if command.starts_with(':') {
            return None;
        }
        let mut parts = command.split_whitespace();
        let name = parts.next()?;

        let parsed = match name {
            "analyze" | "a" => Ok(Self::Analyze),
            "show" => Ok(Self::Show),
            "history" | "h" => Ok(Self::History),
            "select" | "s" => match parts.next().map(str::parse::<usize>) {
                Some(Ok(n)) if n > 0 => Ok(Self::Select(n)),
                _ => Err("usage: :select N (1-based history position)".to_string()),
            },
            "stats" => Ok(Self::Stats),
            "input" => Ok(Self::Input),
            "clear-input" => Ok(Self::ClearInput),
            "clear-history" => Ok(Self::ClearHistory),
            "help" | "?" => Ok(Self::Help),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            _ => return None,
        };

        Some(parsed)
    }
}

pub async fn execute(args: SessionArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let classifier = build_classifier(&config)?;

    let session_config = SessionConfig {
        history_capacity: args
            .history_capacity
            .unwrap_or(config.general.history_capacity)
            .max(1),
        timeout: match config.llm.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        },
    };

    tracing::info!(
        provider = %config.llm.provider,
        history_capacity = session_config.history_capacity,
        "Starting session"
    );

    let session = SessionController::new(classifier, session_config);
    let view = View {
        renderer: Renderer::default(),
        json: args.json,
    };

    println!("spam-shield session. Type :help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        let command = match SessionCommand::parse(&line) {
            None => {
                append_input(&session, email_text(&line));
                continue;
            }
            Some(Err(message)) => {
                eprintln!("{}", message);
                continue;
            }
            Some(Ok(command)) => command,
        };

        if !run_command(&session, &view, command).await? {
            break;
        }
    }

    Ok(())
}

struct View {
    renderer: Renderer,
    json: bool,
}

impl View {
    fn record(&self, record: &ClassificationRecord) -> Result<()> {
        if self.json {
            let json = serde_json::to_string(record).context("Failed to serialize record")?;
            println!("{}", json);
        } else {
            println!("{}", self.renderer.render_record(record));
        }
        Ok(())
    }
}

/// Undo the `::` escape for text lines that start with a colon
fn email_text(line: &str) -> &str {
    let leading = line.len() - line.trim_start().len();
    if line[leading..].starts_with("::") {
        // Drop one of the two colons
        return &line[leading + 1..];
    }
    line
}

fn append_input<C: Classifier + ?Sized>(session: &SessionController<C>, line: &str) {
    let current = session.snapshot().input_text().to_string();
    if current.is_empty() {
        session.set_input(line);
    } else {
        session.set_input(format!("{}\n{}", current, line));
    }
}

/// Returns false when the session should end
async fn run_command<C: Classifier + ?Sized>(
    session: &SessionController<C>,
    view: &View,
    command: SessionCommand,
) -> Result<bool> {
    match command {
        SessionCommand::Analyze => match session.submit().await {
            Ok(SubmitOutcome::Completed(record)) => view.record(&record)?,
            Ok(SubmitOutcome::Skipped(SkipReason::EmptyInput)) => {
                eprintln!("Nothing to analyze: input is empty");
            }
            Ok(SubmitOutcome::Skipped(SkipReason::AlreadyAnalyzing)) => {
                eprintln!("An analysis is already in progress");
            }
            Err(e) => eprintln!("{}", view.renderer.render_error(&e)),
        },
        SessionCommand::Show => match session.snapshot().current_result() {
            Some(record) => view.record(record)?,
            None => println!("Submit text above to see the classification analysis."),
        },
        SessionCommand::History => {
            println!("{}", view.renderer.render_history(&session.snapshot()));
        }
        SessionCommand::Select(position) => {
            let id = session
                .snapshot()
                .history()
                .get(position - 1)
                .map(|record| record.id);
            match id {
                Some(id) if session.select_history_item(id) => {
                    if let Some(record) = session.snapshot().current_result() {
                        view.record(record)?;
                    }
                }
                _ => eprintln!("No history entry {}", position),
            }
        }
        SessionCommand::Stats => {
            println!("{}", view.renderer.render_stats(session.snapshot().stats()));
        }
        SessionCommand::Input => println!("{}", session.snapshot().input_text()),
        SessionCommand::ClearInput => session.clear_input(),
        SessionCommand::ClearHistory => {
            session.clear_history();
            println!("History cleared");
        }
        SessionCommand::Help => println!("{}", HELP),
        SessionCommand::Quit => return Ok(false),
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_lines_are_text() {
        assert_eq!(SessionCommand::parse("Dear customer,"), None);
        assert_eq!(SessionCommand::parse(""), None);
        assert_eq!(SessionCommand::parse(":)"), None);
        assert_eq!(SessionCommand::parse(":Subject: invoice overdue"), None);
        assert_eq!(SessionCommand::parse(":"), None);
        assert_eq!(SessionCommand::parse("::analyze"), None);
    }

    #[test]
    fn test_double_colon_escapes_literal_colon() {
        assert_eq!(email_text("::analyze the attached file"), ":analyze the attached file");
        assert_eq!(email_text(":) see you soon"), ":) see you soon");
        assert_eq!(email_text("Dear customer,"), "Dear customer,");
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(SessionCommand::parse(":analyze"), Some(Ok(SessionCommand::Analyze)));
        assert_eq!(SessionCommand::parse("  :h "), Some(Ok(SessionCommand::History)));
        assert_eq!(SessionCommand::parse(":select 3"), Some(Ok(SessionCommand::Select(3))));
        assert_eq!(
            SessionCommand::parse(":clear-history"),
            Some(Ok(SessionCommand::ClearHistory))
        );
        assert_eq!(SessionCommand::parse(":quit"), Some(Ok(SessionCommand::Quit)));
    }

    #[test]
    fn test_parse_rejects_bad_commands() {
        assert!(matches!(SessionCommand::parse(":select"), Some(Err(_))));
        assert!(matches!(SessionCommand::parse(":select 0"), Some(Err(_))));
        assert!(matches!(SessionCommand::parse(":select two"), Some(Err(_))));
    }
}
