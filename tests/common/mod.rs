// Shared helpers for integration tests

#![allow(dead_code)]

pub mod pdf;

use chatpdf::config::{Config, EmbeddingBackend};
use chatpdf::llm::{CompletionBackend, GenerationConfig, LlmError};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// Configuration with the offline embedder and a workspace under `dir`
pub fn offline_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.base_dir = dir.to_path_buf();
    config.embedding.backend = EmbeddingBackend::Hashing;
    config.embedding.dimension = 256;
    config.llm.api_key = Some("gsk_test_key".to_string());
    config
}

/// Completion backend that answers with a fixed reply and records prompts.
/// Clones share the same prompt log.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    pub reply: String,
    pub prompts: Rc<RefCell<Vec<String>>>,
}

impl RecordingBackend {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Rc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.borrow().last().cloned()
    }
}

impl CompletionBackend for RecordingBackend {
    fn complete(&self, prompt: &str, _config: &GenerationConfig) -> Result<String, LlmError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}
