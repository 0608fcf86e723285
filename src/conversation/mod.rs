// Conversation module
// Condense, retrieve, then generate, keeping an ordered turn history

#[cfg(test)]
mod tests;

pub mod prompt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RetrievalConfig;
use crate::embeddings::Embedder;
use crate::index::{ScoredChunk, VectorIndex};
use crate::llm::{CompletionBackend, GenerationConfig};
use crate::{ChatError, Result};

pub use prompt::{INSUFFICIENT_CONTEXT_ANSWER, answer_prompt, condense_prompt};

const EXCERPT_CHARS: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered conversation turns. Turns are only ever appended as
/// (user, assistant) pairs, so the length is always even.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn::user(question));
        self.turns.push(Turn::assistant(answer));
    }

    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The last `n` turns in insertion order
    #[inline]
    pub fn recent(&self, n: usize) -> &[Turn] {
        &self.turns[self.turns.len().saturating_sub(n)..]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// A chunk that contributed to an answer
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRef {
    pub chunk_id: usize,
    pub source: String,
    pub score: f32,
    pub excerpt: String,
}

impl SourceRef {
    fn from_scored(scored: &ScoredChunk<'_>) -> Self {
        Self {
            chunk_id: scored.chunk.id,
            source: scored.chunk.source.clone(),
            score: scored.score,
            excerpt: excerpt(&scored.chunk.text),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    /// The question used for retrieval after condensing
    pub standalone_question: String,
    pub sources: Vec<SourceRef>,
}

/// Manager that answers questions against an index and records the exchange
#[derive(Debug, Clone)]
pub struct Conversation {
    retrieval: RetrievalConfig,
    generation: GenerationConfig,
    verbose: bool,
    history: History,
}

impl Conversation {
    #[inline]
    pub fn new(retrieval: RetrievalConfig, generation: GenerationConfig, verbose: bool) -> Self {
        Self {
            retrieval,
            generation,
            verbose,
            history: History::new(),
        }
    }

    #[inline]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[inline]
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Answer `question` from `index`, appending the exchange to the history.
    ///
    /// Returns [`ChatError::NotIndexed`] without touching the model when there
    /// is no index. When nothing relevant is retrieved the answer is
    /// [`INSUFFICIENT_CONTEXT_ANSWER`] and the model is not called either.
    #[inline]
    pub fn ask(
        &mut self,
        question: &str,
        index: Option<&VectorIndex>,
        embedder: &dyn Embedder,
        llm: &dyn CompletionBackend,
    ) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::EmptyQuestion);
        }
        let index = index.ok_or(ChatError::NotIndexed)?;

        let standalone_question = self.standalone_question(question, llm)?;

        let mut retrieved = index.query(&standalone_question, self.retrieval.k, embedder)?;
        if let Some(min_score) = self.retrieval.min_score {
            retrieved.retain(|scored| scored.score >= min_score);
        }
        let sources: Vec<SourceRef> = retrieved.iter().map(SourceRef::from_scored).collect();

        let text = if retrieved.is_empty() {
            info!("No relevant chunks for question, answering without the model");
            INSUFFICIENT_CONTEXT_ANSWER.to_string()
        } else {
            let prompt = answer_prompt(
                &standalone_question,
                &retrieved,
                self.history.recent(self.retrieval.history_window),
            );
            self.log_prompt("answer", &prompt);
            llm.complete(&prompt, &self.generation)?
        };

        self.history.push_exchange(question, text.clone());
        debug!("History now holds {} turns", self.history.len());

        Ok(Answer {
            text,
            standalone_question,
            sources,
        })
    }

    fn standalone_question(&self, question: &str, llm: &dyn CompletionBackend) -> Result<String> {
        if self.history.is_empty() || !self.retrieval.condense_question {
            return Ok(question.to_string());
        }

        let prompt = condense_prompt(
            self.history.recent(self.retrieval.history_window),
            question,
        );
        self.log_prompt("condense", &prompt);

        let condensed = llm.complete(&prompt, &self.generation)?;
        let condensed = condensed.trim();
        if condensed.is_empty() {
            Ok(question.to_string())
        } else {
            debug!("Condensed question: {}", condensed);
            Ok(condensed.to_string())
        }
    }

    fn log_prompt(&self, stage: &str, prompt: &str) {
        if self.verbose {
            debug!("{} prompt:\n{}", stage, prompt);
        }
    }
}

fn excerpt(text: &str) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = flattened.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
