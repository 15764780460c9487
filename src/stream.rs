//! Streaming API: emit unit results as they complete.
//!
//! Unlike the eager [`crate::ankify::ankify`] which returns only after every
//! unit is done, [`ankify_stream`] yields one item per text unit. Units run
//! up to `concurrency` at a time but are always emitted in unit order.
//!
//! The stream never aborts on a failing unit: the failure is yielded as
//! `Err(UnitError)` and the remaining units still run. Callers that want
//! fail-fast semantics stop polling on the first error.

use crate::ankify::{build_pipeline, Pipeline};
use crate::config::AnkifyConfig;
use crate::error::{AnkifyError, UnitError};
use crate::output::{TextUnit, UnitResult};
use crate::pipeline::input;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of unit results.
pub type UnitStream = Pin<Box<dyn Stream<Item = Result<UnitResult, UnitError>> + Send>>;

/// Load `input_str` and stream its flashcards unit by unit.
///
/// # Returns
/// - `Ok(UnitStream)`: one `Result<UnitResult, UnitError>` per text unit
/// - `Err(AnkifyError)`: fatal error before any model call (missing file,
///   no provider, …)
pub async fn ankify_stream(
    input_str: impl AsRef<str>,
    config: &AnkifyConfig,
) -> Result<UnitStream, AnkifyError> {
    let input_str = input_str.as_ref();
    info!("Starting streaming ankify: {}", input_str);

    let units = input::load_text_units(input_str, config).await?;
    let pipeline = build_pipeline(config).await?;
    Ok(stream_units(Arc::new(pipeline), units, config.card_count))
}

/// Stream already-loaded `units` through `pipeline`.
pub fn stream_units(pipeline: Arc<Pipeline>, units: Vec<TextUnit>, card_count: usize) -> UnitStream {
    let concurrency = pipeline.config().concurrency.max(1);
    let total = units.len();

    let results = stream::iter(units.into_iter().map(move |unit| {
        let pipeline = Arc::clone(&pipeline);
        async move {
            pipeline
                .process_unit(&unit, card_count, total)
                .await
                .map_err(|failed| UnitError::from_fatal(failed.unit_id, &failed.error))
        }
    }))
    .buffered(concurrency);

    Box::pin(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::{Completion, CompletionModel};
    use async_trait::async_trait;

    /// Fails every unit whose text contains "boom".
    struct Picky;

    #[async_trait]
    impl CompletionModel for Picky {
        async fn complete(&self, prompt: &str) -> Result<Completion, AnkifyError> {
            if prompt.contains("boom") {
                Err(AnkifyError::ModelCall {
                    detail: "503".into(),
                })
            } else {
                Ok(Completion::text("Q: q\nA: a"))
            }
        }
    }

    #[tokio::test]
    async fn stream_yields_every_unit_in_order() {
        let config = AnkifyConfig::builder().concurrency(3).build().unwrap();
        let pipeline = Arc::new(Pipeline::new(Arc::new(Picky), config));
        let units = vec![
            TextUnit::new(1, "fine"),
            TextUnit::new(2, "boom"),
            TextUnit::new(3, "fine again"),
        ];

        let items: Vec<_> = stream_units(pipeline, units, 1).collect().await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap().unit_id, 1);
        assert!(matches!(
            items[1],
            Err(UnitError::ModelCallFailed { unit: 2, .. })
        ));
        assert_eq!(items[2].as_ref().unwrap().cards.len(), 1);
    }
}
