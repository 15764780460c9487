//! Collapse a chunked unit into one summary text.

use super::llm::CompletionModel;
use crate::error::AnkifyError;
use crate::prompts::SummaryPrompt;
use tracing::debug;

/// Text handed to card generation, with the model usage it cost.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub model_calls: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Per-chunk summary budget: `budget / max(1, chunk_count)`.
pub fn per_chunk_budget(max_tokens_per_request: usize, chunk_count: usize) -> usize {
    max_tokens_per_request / chunk_count.max(1)
}

/// Summarise `chunks` into a single text.
///
/// A single chunk is returned unchanged without calling the model. Several
/// chunks are summarised one at a time, in order, each asked to stay within
/// `per_chunk_budget` tokens, and the summaries are concatenated with no
/// separator. The first failing call aborts the whole summary; no further
/// calls are made and no partial text is returned.
pub async fn summarize(
    model: &dyn CompletionModel,
    chunks: &[&str],
    per_chunk_budget: usize,
) -> Result<Summary, AnkifyError> {
    if let [only] = chunks {
        return Ok(Summary {
            text: (*only).to_string(),
            ..Default::default()
        });
    }

    let mut summary = Summary::default();
    for (i, chunk) in chunks.iter().enumerate() {
        let prompt = SummaryPrompt {
            text: chunk,
            target_tokens: per_chunk_budget,
        }
        .render();
        let completion = model.complete(&prompt).await?;
        debug!(
            "Chunk {}/{}: {} chars → {} chars",
            i + 1,
            chunks.len(),
            chunk.len(),
            completion.text.len()
        );

        summary.text.push_str(&completion.text);
        summary.model_calls += 1;
        summary.input_tokens += completion.input_tokens;
        summary.output_tokens += completion.output_tokens;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::Completion;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replies "S<n>" to the n-th call and fails on call `fail_on`.
    struct ScriptedModel {
        calls: AtomicUsize,
        fail_on: Option<usize>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionModel for ScriptedModel {
        async fn complete(&self, prompt: &str) -> Result<Completion, AnkifyError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail_on == Some(n) {
                return Err(AnkifyError::ModelCall {
                    detail: "connection reset".into(),
                });
            }
            Ok(Completion {
                text: format!("S{n}"),
                input_tokens: 10,
                output_tokens: 2,
            })
        }
    }

    #[test]
    fn budget_divides_by_chunk_count() {
        assert_eq!(per_chunk_budget(2048, 4), 512);
        assert_eq!(per_chunk_budget(2048, 0), 2048);
        assert_eq!(per_chunk_budget(10, 3), 3);
    }

    #[tokio::test]
    async fn single_chunk_passes_through_without_model_call() {
        let model = ScriptedModel::new(None);
        let summary = summarize(&model, &["whole text"], 100).await.unwrap();
        assert_eq!(summary.text, "whole text");
        assert_eq!(summary.model_calls, 0);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn chunks_are_summarised_in_order_and_concatenated() {
        let model = ScriptedModel::new(None);
        let summary = summarize(&model, &["first", "second", "third"], 300)
            .await
            .unwrap();
        assert_eq!(summary.text, "S1S2S3");
        assert_eq!(summary.model_calls, 3);
        assert_eq!(summary.input_tokens, 30);
        assert_eq!(summary.output_tokens, 6);

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("first"));
        assert!(prompts[2].contains("third"));
        assert!(prompts.iter().all(|p| p.contains("at most 300 tokens")));
    }

    #[tokio::test]
    async fn first_failure_stops_further_calls() {
        let model = ScriptedModel::new(Some(2));
        let err = summarize(&model, &["a", "b", "c", "d"], 10)
            .await
            .unwrap_err();
        assert!(matches!(err, AnkifyError::ModelCall { .. }));
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn works_outside_an_async_test() {
        let model = ScriptedModel::new(None);
        let summary = tokio_test::block_on(summarize(&model, &["x", "y"], 5)).unwrap();
        assert_eq!(summary.text, "S1S2");
    }
}
