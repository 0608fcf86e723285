
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::settings::API_KEY_VAR;
use crate::embeddings::OllamaEmbedder;
use super::{Config, EmbeddingBackend, EmbeddingConfig, LlmConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 ChatPDF Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Language Model").bold().yellow());
    eprintln!("Configure the Groq chat model used to answer questions.");
    eprintln!();
    configure_llm(&mut config.llm)?;

    eprintln!();
    eprintln!("{}", style("Embeddings").bold().yellow());
    eprintln!("Configure how document chunks are embedded for retrieval.");
    eprintln!();
    configure_embedding(&mut config.embedding)?;

    if config.embedding.backend == EmbeddingBackend::Ollama {
        eprintln!();
        eprintln!("{}", style("Testing Ollama connection...").yellow());

        if test_ollama_connection(&config.embedding) {
            eprintln!("{}", style("✓ Ollama connection successful!").green());
        } else {
            eprintln!(
                "{}",
                style("⚠ Warning: Could not connect to Ollama").yellow()
            );
            eprintln!("You can continue, but make sure Ollama is running before chatting.");
        }
    }

    if config.llm.api_key.is_none() && std::env::var(API_KEY_VAR).is_err() {
        eprintln!();
        eprintln!(
            "{} set {} in your environment or a .env file before chatting.",
            style("Note:").bold().yellow(),
            style(API_KEY_VAR).cyan()
        );
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    eprint!("{}", render_config(&config));
    Ok(())
}

fn render_config(config: &Config) -> String {
    let api_key = config
        .llm
        .masked_api_key()
        .map_or_else(|| style("not set".to_string()).red(), |k| style(k).cyan());

    let embedding = match config.embedding.backend {
        EmbeddingBackend::Ollama => match config.embedding.ollama_url() {
            Ok(url) => format!("ollama {} ({})", url, config.embedding.model),
            Err(e) => format!("ollama (invalid URL: {})", e),
        },
        EmbeddingBackend::Hashing => format!("hashing ({} dimensions)", config.embedding.dimension),
    };

    let min_score = config
        .retrieval
        .min_score
        .map_or_else(|| "none".to_string(), |s| s.to_string());

    let lines = [
        format!("{}", style("📋 Current Configuration").bold().cyan()),
        String::new(),
        format!("{}", style("Language Model:").bold().yellow()),
        format!("  Endpoint: {}", style(&config.llm.base_url).cyan()),
        format!("  Model: {}", style(&config.llm.model).cyan()),
        format!("  Temperature: {}", style(config.llm.temperature).cyan()),
        format!("  Max Tokens: {}", style(config.llm.max_tokens).cyan()),
        format!("  API Key: {}", api_key),
        String::new(),
        format!("{}", style("Retrieval:").bold().yellow()),
        format!("  Embeddings: {}", style(embedding).cyan()),
        format!(
            "  Chunk Size: {} (overlap {})",
            style(config.chunking.chunk_size).cyan(),
            style(config.chunking.chunk_overlap).cyan()
        ),
        format!("  Top K: {}", style(config.retrieval.k).cyan()),
        format!("  Min Score: {}", style(min_score).cyan()),
        String::new(),
        format!("  Verbose: {}", style(config.verbose).cyan()),
        format!(
            "  Uploads: {}",
            style(config.storage_dir().display()).cyan()
        ),
        format!(
            "Config file: {}",
            style(config.config_file_path().display()).dim()
        ),
    ];

    let mut rendered = lines.join("\n");
    rendered.push('\n');
    rendered
}

fn load_existing_config() -> Result<Config> {
    load_existing_config_from(&Config::config_dir()?)
}

/// Read the settings file in `config_dir` for editing. Only a missing file
/// falls back to the defaults; an unreadable or invalid one is an error.
fn load_existing_config_from(config_dir: &Path) -> Result<Config> {
    if !config_dir.join("config.toml").exists() {
        eprintln!(
            "{}",
            style("No existing configuration found. Using defaults.").yellow()
        );
        return Ok(Config {
            base_dir: config_dir.to_path_buf(),
            ..Config::default()
        });
    }

    let config = Config::load_from(config_dir).context("Failed to load existing configuration")?;
    eprintln!("{}", style("Found existing configuration.").green());
    Ok(config)
}

fn configure_llm(llm: &mut LlmConfig) -> Result<()> {
    let model: String = Input::new()
        .with_prompt("Groq model")
        .default(llm.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let temperature: f32 = Input::new()
        .with_prompt("Temperature (0-1)")
        .default(llm.temperature)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if (0.0..=1.0).contains(input) {
                Ok(())
            } else {
                Err("Temperature must be between 0 and 1")
            }
        })
        .interact_text()?;

    let max_tokens: u32 = Input::new()
        .with_prompt("Maximum answer tokens")
        .default(llm.max_tokens)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Max tokens must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    llm.set_model(model)?;
    llm.set_temperature(temperature)?;
    llm.set_max_tokens(max_tokens)?;

    Ok(())
}

fn configure_embedding(embedding: &mut EmbeddingConfig) -> Result<()> {
    let backends = &["ollama", "hashing (offline)"];
    let default_index = match embedding.backend {
        EmbeddingBackend::Ollama => 0,
        EmbeddingBackend::Hashing => 1,
    };

    let backend_index = Select::new()
        .with_prompt("Embedding backend")
        .default(default_index)
        .items(backends)
        .interact()?;

    if backend_index == 1 {
        embedding.backend = EmbeddingBackend::Hashing;
        return Ok(());
    }
    embedding.backend = EmbeddingBackend::Ollama;

    let protocols = &["http", "https"];
    let default_protocol = protocols
        .iter()
        .position(|&p| p == embedding.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_protocol)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(embedding.host.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Host cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(embedding.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(embedding.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    embedding.set_protocol(protocol)?;
    embedding.set_host(host)?;
    embedding.set_port(port)?;
    embedding.set_model(model)?;

    Ok(())
}

fn test_ollama_connection(embedding: &EmbeddingConfig) -> bool {
    OllamaEmbedder::new(embedding)
        .map(|embedder| {
            embedder
                .with_timeout(Duration::from_secs(5))
                .with_retry_attempts(1)
        })
        .and_then(|embedder| embedder.health_check())
        .is_ok()
}
