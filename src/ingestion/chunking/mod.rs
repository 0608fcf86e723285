
use std::collections::VecDeque;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Document;

/// Represents a contiguous slice of a document ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Sequential id, unique within one indexing run
    pub id: usize,
    /// File name of the source document
    pub source: String,
    /// The chunk text, equal to `document.text[start..end]`
    pub text: String,
    /// Byte offset of the chunk start in the document text
    pub start: usize,
    /// Byte offset one past the chunk end in the document text
    pub end: usize,
}

impl Chunk {
    /// Length of the chunk in characters
    #[inline]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Configuration for document chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Maximum number of characters shared by adjacent chunks
    pub chunk_overlap: usize,
    /// Split points in priority order. The empty separator splits anywhere.
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 50,
            separators: ["\n\n", "\n", ".", " ", ""]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Chunk a set of documents, numbering chunks sequentially across all of them
#[inline]
pub fn chunk_documents(documents: &[Document], config: &ChunkingConfig) -> Vec<Chunk> {
    let mut next_id = 0;
    let chunks: Vec<Chunk> = documents
        .iter()
        .flat_map(|document| chunk_document(document, config, &mut next_id))
        .collect();

    debug!(
        "Chunked {} document(s) into {} chunks (avg {} chars)",
        documents.len(),
        chunks.len(),
        chunks.iter().map(Chunk::char_len).sum::<usize>() / chunks.len().max(1)
    );

    chunks
}

/// Chunk a single document, taking ids from `next_id`
#[inline]
pub fn chunk_document(
    document: &Document,
    config: &ChunkingConfig,
    next_id: &mut usize,
) -> Vec<Chunk> {
    let text = document.text.as_str();
    if text.trim().is_empty() {
        return Vec::new();
    }

    split_spans(text, config)
        .into_iter()
        .filter_map(|span| {
            let chunk_text = text.get(span.clone())?.to_string();
            let chunk = Chunk {
                id: *next_id,
                source: document.source.clone(),
                text: chunk_text,
                start: span.start,
                end: span.end,
            };
            *next_id += 1;
            Some(chunk)
        })
        .collect()
}

/// Compute the byte spans of the chunks of `text`
#[inline]
pub fn split_spans(text: &str, config: &ChunkingConfig) -> Vec<Range<usize>> {
    let chunk_size = config.chunk_size.max(1);
    let mut pieces = Vec::new();
    split_pieces(text, 0..text.len(), &config.separators, chunk_size, &mut pieces);
    merge_pieces(text, &pieces, chunk_size, config.chunk_overlap)
}

/// Recursively break `range` into pieces no longer than `chunk_size`,
/// keeping each separator attached to the piece that precedes it
fn split_pieces(
    text: &str,
    range: Range<usize>,
    separators: &[String],
    chunk_size: usize,
    out: &mut Vec<Range<usize>>,
) {
    let Some(segment) = text.get(range.clone()) else {
        return;
    };
    if segment.is_empty() {
        return;
    }
    if segment.chars().count() <= chunk_size {
        out.push(range);
        return;
    }

    let chosen = separators
        .iter()
        .position(|sep| sep.is_empty() || segment.contains(sep.as_str()));

    let Some(index) = chosen else {
        split_by_chars(segment, range.start, chunk_size, out);
        return;
    };

    let separator = separators[index].as_str();
    if separator.is_empty() {
        split_by_chars(segment, range.start, chunk_size, out);
        return;
    }

    let remaining = &separators[index + 1..];
    let mut piece_start = range.start;
    for (position, _) in segment.match_indices(separator) {
        let piece_end = range.start + position + separator.len();
        split_pieces(text, piece_start..piece_end, remaining, chunk_size, out);
        piece_start = piece_end;
    }
    if piece_start < range.end {
        split_pieces(text, piece_start..range.end, remaining, chunk_size, out);
    }
}

/// Split at character boundaries into blocks of `chunk_size` characters
fn split_by_chars(segment: &str, offset: usize, chunk_size: usize, out: &mut Vec<Range<usize>>) {
    let mut block_start = 0;
    for (count, (position, _)) in segment.char_indices().enumerate() {
        if count > 0 && count % chunk_size == 0 {
            out.push(offset + block_start..offset + position);
            block_start = position;
        }
    }
    out.push(offset + block_start..offset + segment.len());
}

/// Greedily merge pieces into chunks. Each new chunk starts with trailing
/// pieces of the previous one totalling at most `overlap` characters.
fn merge_pieces(
    text: &str,
    pieces: &[Range<usize>],
    chunk_size: usize,
    overlap: usize,
) -> Vec<Range<usize>> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
    let mut window_len = 0;

    for piece in pieces {
        let piece_len = text.get(piece.clone()).map_or(0, |p| p.chars().count());

        if window_len + piece_len > chunk_size {
            if let Some(span) = window_span(&window) {
                chunks.push(span);
            }
            while window_len > overlap || (window_len > 0 && window_len + piece_len > chunk_size) {
                let Some((_, len)) = window.pop_front() else {
                    break;
                };
                window_len -= len;
            }
        }

        window.push_back((piece.clone(), piece_len));
        window_len += piece_len;
    }

    if let Some(span) = window_span(&window) {
        chunks.push(span);
    }

    chunks
}

fn window_span(window: &VecDeque<(Range<usize>, usize)>) -> Option<Range<usize>> {
    let first = window.front()?;
    let last = window.back()?;
    Some(first.0.start..last.0.end)
}
