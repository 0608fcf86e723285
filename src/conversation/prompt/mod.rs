// Prompt templates for the condense and answer steps


use std::fmt::Write as _;

use super::{Role, Turn};
use crate::index::ScoredChunk;

/// Reply used when retrieval finds nothing relevant. No model call is made.
pub const INSUFFICIENT_CONTEXT_ANSWER: &str = "I couldn't find anything in the uploaded documents that answers this question, so I don't have enough context to give a reliable answer.";

/// Ask the model to rewrite a follow-up into a self-contained question
#[inline]
pub fn condense_prompt(history: &[Turn], question: &str) -> String {
    let mut prompt = String::from(
        "Given the following conversation and a follow up question, rephrase the follow up \
         question to be a standalone question, in its original language. Reply with the \
         standalone question only.\n\nChat History:\n",
    );
    write_history(&mut prompt, history);
    let _ = write!(prompt, "\nFollow Up Input: {}\nStandalone question:", question.trim());
    prompt
}

/// Build the final answer prompt from retrieved context and recent turns
#[inline]
pub fn answer_prompt(question: &str, chunks: &[ScoredChunk<'_>], history: &[Turn]) -> String {
    let mut prompt = String::from(
        "Use only the following pieces of context to answer the question at the end. \
         Each piece is labelled with the document it came from. If the context does not \
         contain the answer, just say that you don't know; don't try to make up an answer.\n\n",
    );

    for scored in chunks {
        let _ = writeln!(
            prompt,
            "[Source: {} | chunk {}]\n{}\n",
            scored.chunk.source,
            scored.chunk.id,
            scored.chunk.text.trim()
        );
    }

    if !history.is_empty() {
        prompt.push_str("Conversation so far:\n");
        write_history(&mut prompt, history);
        prompt.push('\n');
    }

    let _ = write!(prompt, "Question: {}\nHelpful Answer:", question.trim());
    prompt
}

fn write_history(prompt: &mut String, history: &[Turn]) {
    for turn in history {
        let speaker = match turn.role {
            Role::User => "Human",
            Role::Assistant => "Assistant",
        };
        let _ = writeln!(prompt, "{}: {}", speaker, turn.content.trim());
    }
}
