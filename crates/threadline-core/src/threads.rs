//! Per-concept discussion summaries, generated in bounded concurrent batches.

use futures::future::join_all;
use threadline_schema::{ThreadDiscussion, ThreadResponse};

use crate::error::SummarizeError;
use crate::generator::Generator;
use crate::prompts::PromptSet;
use crate::response::parse_discussion;

/// Summarize one concept. A failure degrades to a placeholder discussion
/// for this concept only.
pub async fn summarize_concept(
    generator: &Generator,
    prompts: &PromptSet,
    transcript: &str,
    concept: &str,
) -> ThreadResponse {
    let discussion = match try_summarize_concept(generator, prompts, transcript, concept).await {
        Ok(discussion) => discussion,
        Err(e) => {
            tracing::error!(
                concept,
                error = %e,
                timestamp = %chrono::Utc::now().to_rfc3339(),
                "thread generation failed"
            );
            ThreadDiscussion::placeholder(concept)
        }
    };
    ThreadResponse {
        concept: concept.to_string(),
        discussion,
    }
}

pub async fn try_summarize_concept(
    generator: &Generator,
    prompts: &PromptSet,
    transcript: &str,
    concept: &str,
) -> Result<ThreadDiscussion, SummarizeError> {
    let (system, user) = prompts.thread_prompt(transcript, concept);
    let raw = generator
        .generate("summarize_concept", Some(system), user)
        .await
        .map_err(|e| SummarizeError::Backend(format!("{e:#}")))?;
    parse_discussion(&raw)
}

/// Summarize every concept, `batch_size` at a time.
///
/// Calls within a batch run concurrently; the next batch starts only once
/// the whole previous batch has resolved. Output order is input order.
pub async fn summarize_all(
    generator: &Generator,
    prompts: &PromptSet,
    transcript: &str,
    concepts: &[String],
    batch_size: usize,
) -> Vec<ThreadResponse> {
    let batch_size = batch_size.max(1);
    let mut threads = Vec::with_capacity(concepts.len());

    for (index, batch) in concepts.chunks(batch_size).enumerate() {
        tracing::debug!(batch = index, size = batch.len(), "summarizing batch");
        let results = join_all(
            batch
                .iter()
                .map(|concept| summarize_concept(generator, prompts, transcript, concept)),
        )
        .await;
        threads.extend(results);
    }

    let degraded = threads.iter().filter(|t| t.discussion.is_placeholder()).count();
    if degraded > 0 {
        tracing::warn!(degraded, total = threads.len(), "some concepts could not be summarized");
    }
    threads
}
