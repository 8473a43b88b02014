use anyhow::{Context, Result};
use pdf_chat::app::ChatApp;
use pdf_chat::config::AppConfig;
use pdf_chat::display::StreamDisplay;
use pdf_chat::error::Error;
use pdf_chat::preview;
use pdf_chat::repl::{self, Command};
use pdf_chat::session::Session;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn handle_upload(app: &ChatApp, session: &mut Session, path: &Path) {
    let file_name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.to_string(),
        None => {
            eprintln!("An error occurred: {} is not a file", path.display());
            return;
        }
    };

    let file_bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("An error occurred: could not read {}: {e}", path.display());
            return;
        }
    };

    println!("Indexing your document...");
    match app.upload(session, &file_name, &file_bytes).await {
        Ok(engine) => {
            println!("Ready to Chat! ({} chunks from {})", engine.chunk_count(), engine.source());
            match preview::default_preview_dir() {
                Some(dir) => match preview::write_preview(&dir, &file_name, &file_bytes) {
                    Ok(path) => println!("PDF Preview: {}", path.display()),
                    Err(e) => warn!(error = %e, "could not write PDF preview"),
                },
                None => warn!("no cache directory available for the PDF preview"),
            }
        }
        Err(e) => eprintln!("{}", repl::error_message(&e)),
    }
}

async fn handle_ask(app: &ChatApp, session: &mut Session, prompt: &str) {
    let mut display = StreamDisplay::new(std::io::stdout());
    let result = app
        .ask(session, prompt, |fragment| Ok(display.push(fragment)?))
        .await;

    if let Err(e) = display.finish() {
        warn!(error = %e, "could not write to terminal");
    }
    match result {
        Ok(_) => {}
        Err(Error::NoDocument) => println!("{}", repl::NO_DOCUMENT_HINT),
        Err(e) => eprintln!("{}", repl::error_message(&e)),
    }
}

fn print_history(session: &Session) {
    if session.messages().is_empty() {
        println!("(no messages yet)");
    }
    for message in session.messages() {
        println!("[{}] {}", message.role, message.content);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let app = ChatApp::from_config(config).context("failed to initialize")?;
    let mut session = Session::new();
    info!(session_id = %session.id(), "session started");

    println!("Chat with Docs using Llama-3");
    println!("{}", repl::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break; // EOF (Ctrl+D)
        };

        match Command::parse(&line) {
            Command::Upload(path) => handle_upload(&app, &mut session, &path).await,
            Command::Ask(prompt) => handle_ask(&app, &mut session, &prompt).await,
            Command::Reset => {
                app.reset(&mut session);
                println!("Chat cleared.");
            }
            Command::History => print_history(&session),
            Command::Context => match session.context() {
                Some(context) => println!("{context}"),
                None => println!("(no context retrieved yet)"),
            },
            Command::Help => println!("{}", repl::HELP),
            Command::Quit => break,
            Command::Empty => continue,
            Command::Unknown(input) => println!("Unknown command: {input} (try /help)"),
        }
    }

    info!(session_id = %session.id(), "session ended");
    Ok(())
}
