use super::*;
use crate::config::LlmConfig;
use crate::embeddings::HashingEmbedder;
use crate::ingestion::Chunk;
use crate::llm::LlmError;
use std::cell::RefCell;
use std::collections::VecDeque;

/// Backend that replays scripted replies and records every prompt
#[derive(Default)]
struct ScriptedBackend {
    replies: RefCell<VecDeque<String>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedBackend {
    fn with_replies(replies: &[&str]) -> Self {
        Self {
            replies: RefCell::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: RefCell::default(),
        }
    }

    fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }
}

impl CompletionBackend for ScriptedBackend {
    fn complete(
        &self,
        prompt: &str,
        _config: &GenerationConfig,
    ) -> std::result::Result<String, LlmError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self
            .replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| "scripted answer".to_string()))
    }
}

struct FailingBackend;

impl CompletionBackend for FailingBackend {
    fn complete(
        &self,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> std::result::Result<String, LlmError> {
        Err(LlmError::Network("connection reset".to_string()))
    }
}

fn embedder() -> HashingEmbedder {
    HashingEmbedder::new(256)
}

fn index(embedder: &HashingEmbedder) -> VectorIndex {
    let texts = [
        ("geo.pdf", "The capital of France is Paris."),
        ("bio.pdf", "Photosynthesis converts light into chemical energy in plants."),
        ("code.pdf", "The borrow checker enforces ownership rules at compile time."),
    ];
    let chunks = texts
        .iter()
        .enumerate()
        .map(|(id, (source, text))| Chunk {
            id,
            source: source.to_string(),
            text: text.to_string(),
            start: 0,
            end: text.len(),
        })
        .collect();
    VectorIndex::build(chunks, embedder).expect("index should build")
}

fn conversation(retrieval: RetrievalConfig) -> Conversation {
    Conversation::new(retrieval, LlmConfig::default().generation_config(), true)
}

#[test]
fn ask_without_index_skips_model() {
    let backend = ScriptedBackend::default();
    let mut conversation = conversation(RetrievalConfig::default());

    let result = conversation.ask("What is the capital of France?", None, &embedder(), &backend);

    assert!(matches!(result, Err(ChatError::NotIndexed)));
    assert_eq!(backend.calls(), 0);
    assert!(conversation.history().is_empty());
}

#[test]
fn empty_question_is_rejected() {
    let embedder = embedder();
    let index = index(&embedder);
    let backend = ScriptedBackend::default();
    let mut conversation = conversation(RetrievalConfig::default());

    let result = conversation.ask("   ", Some(&index), &embedder, &backend);

    assert!(matches!(result, Err(ChatError::EmptyQuestion)));
    assert_eq!(backend.calls(), 0);
}

#[test]
fn first_question_is_not_condensed() {
    let embedder = embedder();
    let index = index(&embedder);
    let backend = ScriptedBackend::with_replies(&["Paris."]);
    let mut conversation = conversation(RetrievalConfig::default());

    let answer = conversation
        .ask("What is the capital of France?", Some(&index), &embedder, &backend)
        .expect("ask should succeed");

    assert_eq!(answer.text, "Paris.");
    assert_eq!(answer.standalone_question, "What is the capital of France?");
    assert_eq!(answer.sources.len(), 3);
    assert_eq!(answer.sources[0].source, "geo.pdf");
    assert_eq!(backend.calls(), 1);
    assert!(backend.prompts.borrow()[0].contains("[Source: geo.pdf | chunk 0]"));
}

#[test]
fn follow_up_is_condensed_before_retrieval() {
    let embedder = embedder();
    let index = index(&embedder);
    let backend = ScriptedBackend::with_replies(&[
        "Paris.",
        "What converts light into chemical energy in plants?",
        "Photosynthesis.",
    ]);
    let mut conversation = conversation(RetrievalConfig::default());

    conversation
        .ask("What is the capital of France?", Some(&index), &embedder, &backend)
        .expect("first ask should succeed");
    let answer = conversation
        .ask("And what about plants?", Some(&index), &embedder, &backend)
        .expect("second ask should succeed");

    assert_eq!(backend.calls(), 3);
    assert!(backend.prompts.borrow()[1].contains("Follow Up Input: And what about plants?"));
    assert_eq!(
        answer.standalone_question,
        "What converts light into chemical energy in plants?"
    );
    assert_eq!(answer.sources[0].source, "bio.pdf");
    // The original wording is what gets recorded
    assert_eq!(conversation.history().turns()[2], Turn::user("And what about plants?"));
}

#[test]
fn blank_condensed_reply_falls_back_to_question() {
    let embedder = embedder();
    let index = index(&embedder);
    let backend = ScriptedBackend::with_replies(&["Paris.", "  ", "Still Paris."]);
    let mut conversation = conversation(RetrievalConfig::default());

    conversation
        .ask("What is the capital of France?", Some(&index), &embedder, &backend)
        .expect("first ask should succeed");
    let answer = conversation
        .ask("Is it big?", Some(&index), &embedder, &backend)
        .expect("second ask should succeed");

    assert_eq!(answer.standalone_question, "Is it big?");
}

#[test]
fn condensing_can_be_disabled() {
    let embedder = embedder();
    let index = index(&embedder);
    let backend = ScriptedBackend::default();
    let mut conversation = conversation(RetrievalConfig {
        condense_question: false,
        ..RetrievalConfig::default()
    });

    for question in ["What is the capital of France?", "Tell me more"] {
        conversation
            .ask(question, Some(&index), &embedder, &backend)
            .expect("ask should succeed");
    }

    assert_eq!(backend.calls(), 2);
}

#[test]
fn no_relevant_chunks_gives_fixed_answer() {
    let embedder = embedder();
    let index = index(&embedder);
    let backend = ScriptedBackend::default();
    let mut conversation = conversation(RetrievalConfig {
        min_score: Some(0.99),
        ..RetrievalConfig::default()
    });

    let answer = conversation
        .ask("Who won the 1998 world cup?", Some(&index), &embedder, &backend)
        .expect("ask should succeed");

    assert_eq!(answer.text, INSUFFICIENT_CONTEXT_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(backend.calls(), 0);
    assert_eq!(conversation.history().len(), 2);
}

#[test]
fn history_grows_by_two_per_exchange() {
    let embedder = embedder();
    let index = index(&embedder);
    let backend = ScriptedBackend::default();
    let mut conversation = conversation(RetrievalConfig::default());

    let questions = ["What is Paris?", "What is photosynthesis?", "What is ownership?"];
    for question in questions {
        conversation
            .ask(question, Some(&index), &embedder, &backend)
            .expect("ask should succeed");
    }

    let turns = conversation.history().turns();
    assert_eq!(turns.len(), 2 * questions.len());
    for (pair, question) in turns.chunks(2).zip(questions) {
        assert_eq!(pair[0], Turn::user(question));
        assert_eq!(pair[1].role, Role::Assistant);
    }
}

#[test]
fn model_failure_leaves_history_untouched() {
    let embedder = embedder();
    let index = index(&embedder);
    let mut conversation = conversation(RetrievalConfig::default());

    let result = conversation.ask("What is Paris?", Some(&index), &embedder, &FailingBackend);

    assert!(matches!(result, Err(ChatError::Llm(LlmError::Network(_)))));
    assert!(conversation.history().is_empty());
}

#[test]
fn recent_returns_tail_in_order() {
    let mut history = History::new();
    history.push_exchange("q1", "a1");
    history.push_exchange("q2", "a2");

    assert_eq!(history.recent(2), &[Turn::user("q2"), Turn::assistant("a2")]);
    assert_eq!(history.recent(10).len(), 4);

    history.clear();
    assert!(history.recent(2).is_empty());
}

#[test]
fn excerpts_are_flattened_and_bounded() {
    assert_eq!(excerpt("line one\n\nline   two"), "line one line two");

    let long = "é".repeat(EXCERPT_CHARS + 10);
    let cut = excerpt(&long);
    assert!(cut.ends_with("..."));
    assert_eq!(cut.chars().count(), EXCERPT_CHARS + 3);
}
