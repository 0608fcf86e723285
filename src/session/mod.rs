// Session module
// One explicitly owned chat session: index, history and backends


use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::conversation::{Answer, Conversation, History, Role, SourceRef};
use crate::embeddings::{Embedder, create_embedder};
use crate::index::VectorIndex;
use crate::ingestion::{ChunkingConfig, chunk_documents, ingest_store};
use crate::llm::{CompletionBackend, GroqClient};
use crate::storage::FileStore;
use crate::{ChatError, Result};

/// State changes reported to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    IngestionFailed {
        file: String,
        message: String,
    },
    IndexRebuilt {
        files: usize,
        chunks: usize,
        history_cleared: bool,
    },
    SourcesRetrieved {
        sources: Vec<SourceRef>,
    },
    TurnAppended {
        role: Role,
        content: String,
    },
}

/// Receiver for session events
pub trait EventSink {
    fn on_event(&self, event: &SessionEvent);
}

/// Sink that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    #[inline]
    fn on_event(&self, _event: &SessionEvent) {}
}

/// Outcome of a successful rebuild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildSummary {
    pub files: usize,
    pub chunks: usize,
    pub failed: Vec<String>,
}

pub struct Session {
    id: Uuid,
    index: Option<VectorIndex>,
    conversation: Conversation,
    chunking: ChunkingConfig,
    clear_history_on_rebuild: bool,
    embedder: Box<dyn Embedder>,
    llm: Box<dyn CompletionBackend>,
    sink: Box<dyn EventSink>,
}

impl std::fmt::Debug for Session {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("indexed_chunks", &self.index.as_ref().map(VectorIndex::len))
            .field("history_turns", &self.conversation.history().len())
            .field("embedder", &self.embedder.model())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session using the backends selected by the configuration
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let llm = GroqClient::new(&config.llm);
        Ok(Self::with_backends(config, embedder, Box::new(llm)))
    }

    /// Create a session around explicit backends
    #[inline]
    pub fn with_backends(
        config: &Config,
        embedder: Box<dyn Embedder>,
        llm: Box<dyn CompletionBackend>,
    ) -> Self {
        let id = Uuid::new_v4();
        info!("Starting session {}", id);

        Self {
            id,
            index: None,
            conversation: Conversation::new(
                config.retrieval.clone(),
                config.llm.generation_config(),
                config.verbose,
            ),
            chunking: config.chunking.clone(),
            clear_history_on_rebuild: config.session.clear_history_on_rebuild,
            embedder,
            llm,
            sink: Box::new(NullSink),
        }
    }

    #[inline]
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn index(&self) -> Option<&VectorIndex> {
        self.index.as_ref()
    }

    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    #[inline]
    pub fn history(&self) -> &History {
        self.conversation.history()
    }

    #[inline]
    pub fn clear_history(&mut self) {
        self.conversation.clear_history();
    }

    /// Re-ingest every stored file and replace the index.
    ///
    /// On any failure the previous index is left in place.
    #[inline]
    pub fn rebuild(&mut self, store: &FileStore) -> Result<RebuildSummary> {
        let report = ingest_store(store)?;

        let failed: Vec<String> = report.failures.iter().map(|f| f.file.clone()).collect();
        for failure in &report.failures {
            self.sink.on_event(&SessionEvent::IngestionFailed {
                file: failure.file.clone(),
                message: failure.error.to_string(),
            });
        }

        if report.is_empty() {
            warn!("Rebuild found no usable documents, keeping the current index");
            return Err(ChatError::NoDocuments);
        }

        let chunks = chunk_documents(&report.documents, &self.chunking);
        let index = VectorIndex::build(chunks, self.embedder.as_ref())?;

        let summary = RebuildSummary {
            files: report.documents.len(),
            chunks: index.len(),
            failed,
        };
        self.index = Some(index);

        if self.clear_history_on_rebuild {
            self.conversation.clear_history();
        }

        info!(
            "Session {} indexed {} file(s) into {} chunks",
            self.id, summary.files, summary.chunks
        );
        self.sink.on_event(&SessionEvent::IndexRebuilt {
            files: summary.files,
            chunks: summary.chunks,
            history_cleared: self.clear_history_on_rebuild,
        });

        Ok(summary)
    }

    /// Ask a question against the current index
    #[inline]
    pub fn ask(&mut self, question: &str) -> Result<Answer> {
        let answer = self.conversation.ask(
            question,
            self.index.as_ref(),
            self.embedder.as_ref(),
            self.llm.as_ref(),
        )?;

        for turn in self.conversation.history().recent(2) {
            self.sink.on_event(&SessionEvent::TurnAppended {
                role: turn.role,
                content: turn.content.clone(),
            });
        }
        self.sink.on_event(&SessionEvent::SourcesRetrieved {
            sources: answer.sources.clone(),
        });

        Ok(answer)
    }
}
