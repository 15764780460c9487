//! Model interaction: one prompt in, one completion out.
//!
//! Every pipeline stage talks to the model through [`CompletionModel`], a
//! single-turn `prompt → text` seam. The production implementation,
//! [`LlmCompletionModel`], sends the prompt through an `edgequake-llm`
//! provider; tests substitute counting stubs.
//!
//! There is no retry here. A failed or timed-out call becomes
//! [`AnkifyError::ModelCall`] and the caller decides what to do with it.

use crate::config::AnkifyConfig;
use crate::error::AnkifyError;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Text returned by one model call, with its token usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl Completion {
    /// A completion without usage numbers.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Single-turn completion endpoint.
///
/// Implementations return [`AnkifyError::EmptyResponse`] when the endpoint
/// succeeds without producing any text, and [`AnkifyError::ModelCall`] for
/// every other failure.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<Completion, AnkifyError>;
}

/// [`CompletionModel`] backed by an `edgequake-llm` provider.
///
/// ## Message Layout
///
/// 1. **System message** — [`DEFAULT_SYSTEM_PROMPT`] or the configured override
/// 2. **User message** — the rendered summary or card prompt
pub struct LlmCompletionModel {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    options: CompletionOptions,
    timeout: Duration,
}

impl LlmCompletionModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AnkifyConfig) -> Self {
        Self {
            provider,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            options: build_options(config),
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }
}

#[async_trait]
impl CompletionModel for LlmCompletionModel {
    async fn complete(&self, prompt: &str) -> Result<Completion, AnkifyError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(prompt),
        ];

        let response =
            match tokio::time::timeout(self.timeout, self.provider.chat(&messages, Some(&self.options)))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    warn!("Model call failed — {}", e);
                    return Err(AnkifyError::ModelCall {
                        detail: e.to_string(),
                    });
                }
                Err(_) => {
                    warn!("Model call timed out after {}s", self.timeout.as_secs());
                    return Err(AnkifyError::ModelCall {
                        detail: format!("timed out after {}s", self.timeout.as_secs()),
                    });
                }
            };

        debug!(
            "Model call: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        if response.content.trim().is_empty() {
            return Err(AnkifyError::EmptyResponse);
        }

        Ok(Completion {
            text: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

/// Build `CompletionOptions` from the run config.
fn build_options(config: &AnkifyConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_output_tokens),
        ..Default::default()
    }
}
