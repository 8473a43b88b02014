use crate::error::Error;
use std::path::PathBuf;

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Upload(PathBuf),
    Ask(String),
    Reset,
    History,
    Context,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        if !line.starts_with('/') {
            return Command::Ask(line.to_string());
        }

        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (line, ""),
        };

        match name {
            "/upload" if !arg.is_empty() => Command::Upload(PathBuf::from(arg)),
            "/reset" | "/clear" => Command::Reset,
            "/history" => Command::History,
            "/context" => Command::Context,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

pub const HELP: &str = "\
Commands:
  /upload <path.pdf>  add a document and make it the one you chat with
  /reset              clear the conversation (indexed documents are kept)
  /history            show the conversation so far
  /context            show the document passages used for the last answer
  /quit               leave
Anything else is asked to the current document.";

pub const NO_DOCUMENT_HINT: &str = "Upload a PDF first with /upload <path>";

/// What the terminal shows when an interaction fails.
pub fn error_message(error: &Error) -> String {
    match error {
        Error::NoDocument => NO_DOCUMENT_HINT.to_string(),
        other => format!("An error occurred: {other}"),
    }
}
