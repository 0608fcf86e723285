use std::path::PathBuf;
use std::process::ExitCode;

use chatpdf::commands::{ask_once, describe_error, list_files, run_chat, upload_files};
use chatpdf::config::{Config, run_interactive_config, show_config};
use chatpdf::{ChatError, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chatpdf")]
#[command(about = "Chat with your PDF documents using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the language model and embedding backend
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Upload PDF files, replacing any previously uploaded ones
    Upload {
        /// PDF files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List uploaded PDF files
    Files,
    /// Start an interactive chat over the uploaded files
    Chat,
    /// Ask a single question over the uploaded files
    Ask {
        /// The question to answer
        question: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load();

    let verbose = config.as_ref().is_ok_and(|config| config.verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "chatpdf=debug" } else { "chatpdf=warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Config { show } => configure(show),
        command => config
            .map_err(ChatError::from)
            .and_then(|config| execute(command, &config)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", console::style("Error:").bold().red(), describe_error(&e));
            ExitCode::FAILURE
        }
    }
}

fn configure(show: bool) -> Result<()> {
    if show {
        show_config()?;
    } else {
        run_interactive_config()?;
    }
    Ok(())
}

fn execute(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Config { show } => configure(show),
        Commands::Upload { files } => upload_files(config, &files),
        Commands::Files => list_files(config),
        Commands::Chat => run_chat(config),
        Commands::Ask { question } => ask_once(config, &question),
    }
}
