// Configuration management module
// TOML settings file plus environment overrides

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    API_KEY_VAR, Config, ConfigError, EmbeddingBackend, EmbeddingConfig, LlmConfig,
    RetrievalConfig, SessionConfig,
};
