//! Parsing of interactive commands.

use study_planner_domain::{DomainError, due_date_from_iso};

/// A command typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Add a task.
    Add {
        /// Task title, possibly empty.
        title: String,
        /// Unix seconds, or `0` for no due date.
        due_date: u64,
    },
    /// Mark a task completed.
    Done(u64),
    /// Delete a task.
    Remove(u64),
    /// Print the task list.
    List,
    /// Print transaction status and errors.
    Status,
    /// Re-read tasks from the ledger.
    Refresh,
    /// Print usage.
    Help,
    /// Leave the prompt.
    Quit,
}

/// Why a line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Unrecognized verb.
    Unknown(String),
    /// Missing or non-numeric task id.
    BadId(String),
    /// Bad due date.
    BadDate(DomainError),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(verb) => write!(f, "unknown command `{verb}`, try `help`"),
            Self::BadId(raw) => write!(f, "expected a task id, got `{raw}`"),
            Self::BadDate(e) => write!(f, "{e}"),
        }
    }
}

pub const USAGE: &str = "\
commands:
  add <title> [yyyy-mm-dd]   add a task with an optional due date
  done <id>                  mark a task completed
  rm <id>                    delete a task
  ls                         list tasks
  status                     show transaction status
  refresh                    re-read tasks from the ledger
  quit";

fn parse_id(rest: &str) -> Result<u64, ParseError> {
    rest.trim()
        .trim_start_matches('#')
        .parse()
        .map_err(|_| ParseError::BadId(rest.trim().to_string()))
}

fn looks_like_date(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && token.chars().filter(char::is_ascii_digit).count() == 8
}

/// Parses one input line. Returns `None` for blank lines.
pub fn parse(line: &str) -> Option<Result<Command, ParseError>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match verb.to_ascii_lowercase().as_str() {
        "add" => {
            let (title, date) = match rest.rsplit_once(char::is_whitespace) {
                Some((title, last)) if looks_like_date(last) => (title.trim(), last),
                _ if looks_like_date(rest) => ("", rest),
                _ => (rest, ""),
            };
            due_date_from_iso(date)
                .map(|due_date| Command::Add {
                    title: title.to_string(),
                    due_date,
                })
                .map_err(ParseError::BadDate)
        }
        "done" | "complete" => parse_id(rest).map(Command::Done),
        "rm" | "delete" => parse_id(rest).map(Command::Remove),
        "ls" | "list" => Ok(Command::List),
        "status" => Ok(Command::Status),
        "refresh" => Ok(Command::Refresh),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(ParseError::Unknown(other.to_string())),
    };
    Some(command)
}
