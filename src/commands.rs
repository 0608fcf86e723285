use std::path::PathBuf;

use chrono::{DateTime, Local};
use console::style;
use dialoguer::Input;
use tracing::{info, warn};

use crate::config::{API_KEY_VAR, Config};
use crate::conversation::{Answer, Role, SourceRef};
use crate::llm::LlmError;
use crate::session::{EventSink, Session, SessionEvent};
use crate::storage::{FileStore, Upload};
use crate::{ChatError, Result};

/// Renders session events on the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    #[inline]
    fn on_event(&self, event: &SessionEvent) {
        if let Some(rendered) = render_event(event) {
            println!("{}", rendered);
        }
    }
}

/// Text shown for an event, if any. User turns are already on screen.
#[inline]
pub fn render_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::IngestionFailed { file, message } => Some(format!(
            "{} Skipped {}: {}",
            style("⚠").yellow(),
            style(file).bold(),
            message
        )),
        SessionEvent::IndexRebuilt {
            files,
            chunks,
            history_cleared,
        } => {
            let mut line = format!(
                "{} Chatbot ready: indexed {} file(s) into {} chunks",
                style("✓").green(),
                files,
                chunks
            );
            if *history_cleared {
                line.push_str(" (history cleared)");
            }
            Some(line)
        }
        SessionEvent::TurnAppended {
            role: Role::Assistant,
            content,
        } => Some(format!("{} {}", style("Assistant:").bold().cyan(), content)),
        SessionEvent::TurnAppended {
            role: Role::User, ..
        } => None,
        SessionEvent::SourcesRetrieved { sources } if sources.is_empty() => None,
        SessionEvent::SourcesRetrieved { sources } => Some(render_sources(sources)),
    }
}

fn render_sources(sources: &[SourceRef]) -> String {
    let mut lines = vec![style("Sources:").dim().to_string()];
    lines.extend(sources.iter().map(|source| {
        format!(
            "  {} {} (chunk {}, score {:.2}): {}",
            style("•").dim(),
            style(&source.source).bold(),
            source.chunk_id,
            source.score,
            style(&source.excerpt).dim()
        )
    }));
    lines.join("\n")
}

/// Replace the stored PDFs with the given files
#[inline]
pub fn upload_files(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let uploads = paths
        .iter()
        .map(Upload::from_path)
        .collect::<Result<Vec<_>>>()?;

    let store = FileStore::new(config.storage_dir());
    let stored = store.replace_all(&uploads)?;

    println!(
        "{} Saved {} file(s) to {}",
        style("✓").green(),
        stored.len(),
        store.root().display()
    );
    for file in &stored {
        println!("  {} ({})", file.name, format_size(file.size));
    }
    println!("Run 'chatpdf chat' to start asking questions about them.");

    Ok(())
}

/// Print the stored PDFs
#[inline]
pub fn list_files(config: &Config) -> Result<()> {
    let store = FileStore::new(config.storage_dir());
    let files = store.list()?;

    if files.is_empty() {
        println!("No PDF files have been uploaded yet.");
        println!("Use 'chatpdf upload <FILES>...' to add some.");
        return Ok(());
    }

    println!("Uploaded files ({} total) in {}:", files.len(), store.root().display());
    for file in &files {
        let modified = file
            .modified
            .map(|time| DateTime::<Local>::from(time).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "  📄 {}  {}  {}",
            style(&file.name).bold(),
            format_size(file.size),
            style(modified).dim()
        );
    }

    Ok(())
}

/// Interactive chat loop over the stored PDFs
#[inline]
pub fn run_chat(config: &Config) -> Result<()> {
    config
        .validate_for_chat()
        .map_err(|e| ChatError::Configuration(e.to_string()))?;

    let store = FileStore::new(config.storage_dir());
    let mut session = Session::new(config)?.with_sink(Box::new(ConsoleSink));

    eprintln!("{}", style("💬 ChatPDF").bold().cyan());
    eprintln!("Commands: /rebuild, /history, /clear, /quit");
    eprintln!();

    initialize(&mut session, &store);

    loop {
        let line: String = match Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            Err(e) => {
                warn!("Input closed: {}", e);
                break;
            }
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/rebuild" => initialize(&mut session, &store),
            "/clear" => {
                session.clear_history();
                println!("{}", style("History cleared").dim());
            }
            "/history" => print_history(&session),
            question => {
                if let Err(e) = session.ask(question) {
                    println!("{}", style(describe_error(&e)).red());
                }
            }
        }
    }

    info!("Chat session {} ended", session.id());
    Ok(())
}

/// Index the stored PDFs and answer a single question
#[inline]
pub fn ask_once(config: &Config, question: &str) -> Result<()> {
    config
        .validate_for_chat()
        .map_err(|e| ChatError::Configuration(e.to_string()))?;

    let store = FileStore::new(config.storage_dir());
    let mut session = Session::new(config)?;

    for failure in session.rebuild(&store)?.failed {
        eprintln!("{} Skipped {}", style("⚠").yellow(), failure);
    }

    let answer = session.ask(question)?;
    print_answer(&answer);
    Ok(())
}

fn initialize(session: &mut Session, store: &FileStore) {
    eprintln!("{}", style("Updating chatbot...").yellow());
    if let Err(e) = session.rebuild(store) {
        println!("{}", style(describe_error(&e)).red());
    }
}

fn print_history(session: &Session) {
    let turns = session.history().turns();
    if turns.is_empty() {
        println!("{}", style("No messages yet").dim());
        return;
    }
    for turn in turns {
        let speaker = match turn.role {
            Role::User => style("You:").bold().green(),
            Role::Assistant => style("Assistant:").bold().cyan(),
        };
        println!("{} {}", speaker, turn.content);
    }
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.text);
    if !answer.sources.is_empty() {
        println!();
        println!("{}", render_sources(&answer.sources));
    }
}

/// Human-readable description of a failure, with a hint where one helps
#[inline]
pub fn describe_error(error: &ChatError) -> String {
    match error {
        ChatError::Configuration(message) => format!(
            "Configuration problem: {}. Run 'chatpdf config' to fix it.",
            message
        ),
        ChatError::Ingestion { file, message } => format!("Could not read {}: {}", file, message),
        ChatError::Embedding(message) => format!(
            "Embedding failed: {}. Check that the embedding backend is running and the model is pulled.",
            message
        ),
        ChatError::NoDocuments => "No PDF with extractable text was found. \
             Upload files with 'chatpdf upload <FILES>...' first."
            .to_string(),
        ChatError::NotIndexed => {
            "No documents are indexed yet. Upload PDFs and run /rebuild.".to_string()
        }
        ChatError::EmptyQuestion => "Please type a question.".to_string(),
        ChatError::Llm(LlmError::MissingCredentials) => format!(
            "No Groq API key found. Set {} in your environment or .env file.",
            API_KEY_VAR
        ),
        ChatError::Llm(LlmError::Auth { status, .. }) => format!(
            "Groq rejected the API key (HTTP {}). Check {}.",
            status,
            API_KEY_VAR
        ),
        ChatError::Llm(LlmError::RateLimited { attempts, .. }) => format!(
            "Groq is rate limiting requests (gave up after {} attempts). Wait a moment and try again.",
            attempts
        ),
        ChatError::Llm(LlmError::Network(message)) => {
            format!("Could not reach the language model: {}", message)
        }
        other => other.to_string(),
    }
}

fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;

    if bytes >= MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}
