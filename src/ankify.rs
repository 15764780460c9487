//! The ankify pipeline and its eager entry points.
//!
//! [`Pipeline`] runs chunk → summarize → generate → parse for every text unit
//! and accumulates the cards. [`ankify`] wires it to document loading and
//! the configured LLM provider; [`ankify_to_file`] additionally writes the
//! CSV. Use [`crate::stream::ankify_stream`] to receive unit results as they
//! finish instead.

use crate::config::{AnkifyConfig, FailurePolicy, DEFAULT_MODEL};
use crate::error::{AnkifyError, UnitError};
use crate::export;
use crate::output::{AnkifyOutput, RunStats, TextUnit, UnitResult};
use crate::pipeline::chunk::split_into_chunks;
use crate::pipeline::generate::generate_cards;
use crate::pipeline::input;
use crate::pipeline::llm::{CompletionModel, LlmCompletionModel};
use crate::pipeline::parse::parse_reply;
use crate::pipeline::summarize::{per_chunk_budget, summarize};
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs text units through the model and collects their cards.
///
/// ```rust,no_run
/// use edgequake_ankify::{AnkifyConfig, CompletionModel, Pipeline, TextUnit};
/// use std::sync::Arc;
///
/// # async fn demo(model: Arc<dyn CompletionModel>) -> Result<(), edgequake_ankify::AnkifyError> {
/// let pipeline = Pipeline::new(model, AnkifyConfig::default());
/// let units = vec![TextUnit::new(1, "Paris is the capital of France.")];
/// let output = pipeline.run(&units, 3).await?;
/// for card in &output.cards {
///     println!("{} → {}", card.question, card.answer);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    model: Arc<dyn CompletionModel>,
    config: AnkifyConfig,
}

/// A unit that failed, with how long it ran.
pub(crate) struct FailedUnit {
    pub unit_id: usize,
    pub error: AnkifyError,
    pub duration_ms: u64,
}

impl Pipeline {
    pub fn new(model: Arc<dyn CompletionModel>, config: AnkifyConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &AnkifyConfig {
        &self.config
    }

    /// Process `units` in order, asking for `card_count` cards per unit.
    ///
    /// With [`FailurePolicy::FailFast`] the first failing unit aborts the
    /// run and its error is returned; cards from earlier units are dropped.
    /// With [`FailurePolicy::CollectPartial`] failures are recorded per unit
    /// and the run fails only when no unit succeeded.
    ///
    /// Up to `config.concurrency` units are in flight at once, but results
    /// are merged in unit order, so the card order never depends on timing.
    pub async fn run(
        &self,
        units: &[TextUnit],
        card_count: usize,
    ) -> Result<AnkifyOutput, AnkifyError> {
        let start = Instant::now();
        let total = units.len();
        info!(
            "Ankifying {} unit(s), {} card(s) each, concurrency {}",
            total, card_count, self.config.concurrency
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_start(total);
        }

        let mut results = stream::iter(
            units
                .iter()
                .map(|unit| self.process_unit(unit, card_count, total)),
        )
        .buffered(self.config.concurrency.max(1));

        let mut unit_results = Vec::with_capacity(total);
        while let Some(outcome) = results.next().await {
            match outcome {
                Ok(result) => unit_results.push(result),
                Err(failed) => match self.config.failure_policy {
                    FailurePolicy::FailFast => {
                        warn!("Unit {} failed; aborting run", failed.unit_id);
                        return Err(failed.error);
                    }
                    FailurePolicy::CollectPartial => {
                        let error = UnitError::from_fatal(failed.unit_id, &failed.error);
                        unit_results.push(UnitResult::failed(
                            failed.unit_id,
                            error,
                            failed.duration_ms,
                        ));
                    }
                },
            }
        }

        let stats = RunStats::from_units(&unit_results, start.elapsed().as_millis() as u64);

        if total > 0 && stats.processed_units == 0 {
            let first_error = unit_results
                .iter()
                .find_map(|u| u.error.as_ref())
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(AnkifyError::AllUnitsFailed { total, first_error });
        }

        info!(
            "Run complete: {} cards from {}/{} units, {} model calls, {}ms",
            stats.total_cards,
            stats.processed_units,
            total,
            stats.model_calls,
            stats.total_duration_ms
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_run_complete(total, stats.processed_units);
        }

        let cards = unit_results
            .iter()
            .flat_map(|u| u.cards.iter().cloned())
            .collect();

        Ok(AnkifyOutput {
            cards,
            units: unit_results,
            stats,
        })
    }

    /// Run one unit through all stages, firing progress events.
    pub(crate) async fn process_unit(
        &self,
        unit: &TextUnit,
        card_count: usize,
        total: usize,
    ) -> Result<UnitResult, FailedUnit> {
        let start = Instant::now();
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_unit_start(unit.id, total);
        }

        match self.ankify_unit(unit, card_count).await {
            Ok(mut result) => {
                result.duration_ms = start.elapsed().as_millis() as u64;
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_unit_complete(unit.id, total, result.cards.len());
                }
                Ok(result)
            }
            Err(error) => {
                warn!("Unit {}: {}", unit.id, error);
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_unit_error(unit.id, total, &error.to_string());
                }
                Err(FailedUnit {
                    unit_id: unit.id,
                    error,
                    duration_ms: start.elapsed().as_millis() as u64,
                })
            }
        }
    }

    async fn ankify_unit(
        &self,
        unit: &TextUnit,
        card_count: usize,
    ) -> Result<UnitResult, AnkifyError> {
        let budget = self.config.max_tokens_per_request;
        let chunks = split_into_chunks(&unit.text, budget);
        let chunk_budget = per_chunk_budget(budget, chunks.len());
        debug!(
            "Unit {}: {} chunk(s), {} tokens per chunk summary",
            unit.id,
            chunks.len(),
            chunk_budget
        );

        let summary = summarize(self.model.as_ref(), &chunks, chunk_budget).await?;
        if chunks.len() > 1 {
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_unit_summarized(unit.id, chunks.len());
            }
        }

        let reply = generate_cards(
            self.model.as_ref(),
            &summary.text,
            card_count,
            self.config.generation_ceiling_tokens,
        )
        .await?;

        let mut parsed = parse_reply(&reply.text);
        if parsed.skipped_blocks > 0 {
            debug!(
                "Unit {}: skipped {} malformed reply block(s)",
                unit.id, parsed.skipped_blocks
            );
        }
        if let Some(ref tag) = self.config.default_tag {
            for card in parsed.cards.iter_mut().filter(|c| c.tag.is_none()) {
                card.tag = Some(tag.clone());
            }
        }

        Ok(UnitResult {
            unit_id: unit.id,
            cards: parsed.cards,
            skipped_blocks: parsed.skipped_blocks,
            chunk_count: chunks.len(),
            model_calls: summary.model_calls + 1,
            input_tokens: summary.input_tokens + reply.input_tokens,
            output_tokens: summary.output_tokens + reply.output_tokens,
            duration_ms: 0,
            error: None,
        })
    }
}

/// Turn a text file, PDF or URL into flashcards.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Input errors, provider resolution errors, and (under the default
/// fail-fast policy) the first model failure.
pub async fn ankify(
    input_str: impl AsRef<str>,
    config: &AnkifyConfig,
) -> Result<AnkifyOutput, AnkifyError> {
    let input_str = input_str.as_ref();
    info!("Starting ankify: {}", input_str);

    let units = input::load_text_units(input_str, config).await?;
    let pipeline = build_pipeline(config).await?;
    pipeline.run(&units, config.card_count).await
}

/// Run [`ankify`] and write the cards as CSV into `output_dir` under a
/// timestamped file name. Returns the written path with the output.
///
/// Nothing is written when the run fails.
pub async fn ankify_to_file(
    input_str: impl AsRef<str>,
    output_dir: impl AsRef<Path>,
    config: &AnkifyConfig,
) -> Result<(PathBuf, AnkifyOutput), AnkifyError> {
    let output = ankify(input_str, config).await?;
    let path = export::write_csv_in_dir(&output.cards, output_dir.as_ref()).await?;
    Ok((path, output))
}

/// Synchronous wrapper around [`ankify`].
///
/// Creates a temporary tokio runtime internally.
pub fn ankify_sync(
    input_str: impl AsRef<str>,
    config: &AnkifyConfig,
) -> Result<AnkifyOutput, AnkifyError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AnkifyError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(ankify(input_str, config))
}

/// Build a [`Pipeline`] over the provider resolved from `config`.
pub async fn build_pipeline(config: &AnkifyConfig) -> Result<Pipeline, AnkifyError> {
    let provider = resolve_provider(config).await?;
    let model = LlmCompletionModel::new(provider, config);
    Ok(Pipeline::new(Arc::new(model), config.clone()))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, AnkifyError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        AnkifyError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key (`OPENAI_API_KEY`, …) from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
///
/// The environment is only read here, once per run; the resulting provider
/// owns its credentials.
pub async fn resolve_provider(config: &AnkifyConfig) -> Result<Arc<dyn LLMProvider>, AnkifyError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| AnkifyError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::CardRecord;
    use crate::pipeline::llm::Completion;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Summaries echo "sum"; card prompts get a fixed reply.
    struct FixedModel {
        reply: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionModel for FixedModel {
        async fn complete(&self, prompt: &str) -> Result<Completion, AnkifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if prompt.starts_with("Summarize") {
                Ok(Completion::text("sum "))
            } else {
                Ok(Completion::text(self.reply))
            }
        }
    }

    fn fixed(reply: &'static str) -> Arc<FixedModel> {
        Arc::new(FixedModel {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn default_tag_fills_untagged_cards_only() {
        let model = fixed("Q: a\nA: b\n\nQ: c\nA: d\nTag: own");
        let config = AnkifyConfig::builder().default_tag("deck").build().unwrap();
        let pipeline = Pipeline::new(model, config);

        let out = pipeline.run(&[TextUnit::new(1, "text")], 2).await.unwrap();
        assert_eq!(
            out.cards,
            vec![
                CardRecord::new("a", "b").with_tag("deck"),
                CardRecord::new("c", "d").with_tag("own"),
            ]
        );
    }

    #[tokio::test]
    async fn oversized_unit_is_summarised_before_generation() {
        let model = fixed("Q: q\nA: a");
        let config = AnkifyConfig::builder()
            .max_tokens_per_request(10)
            .generation_ceiling_tokens(10)
            .build()
            .unwrap();
        let pipeline = Pipeline::new(model.clone(), config);

        // 100 chars → 25 tokens → 3 chunks
        let out = pipeline
            .run(&[TextUnit::new(1, "x".repeat(100))], 1)
            .await
            .unwrap();
        assert_eq!(out.units[0].chunk_count, 3);
        assert_eq!(out.units[0].model_calls, 4);
        assert_eq!(model.calls.load(Ordering::SeqCst), 4);
        assert_eq!(out.stats.model_calls, 4);
    }

    #[tokio::test]
    async fn empty_unit_list_is_an_empty_output() {
        let pipeline = Pipeline::new(fixed("Q: q\nA: a"), AnkifyConfig::default());
        let out = pipeline.run(&[], 5).await.unwrap();
        assert!(out.cards.is_empty());
        assert_eq!(out.stats.total_units, 0);
    }
}
