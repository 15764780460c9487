//! Configuration types for document-to-flashcard runs.
//!
//! All run behaviour is controlled through [`AnkifyConfig`], built via its
//! [`AnkifyConfigBuilder`]. Every knob lives in one struct so a config can be
//! shared across concurrent unit workers and logged as a whole.
//!
//! Credentials are deliberately absent: the LLM provider reads its API key
//! from the environment when it is constructed (see
//! [`crate::ankify::resolve_provider`]), and nothing here mutates process state.

use crate::error::AnkifyError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Configuration for one ankify run.
///
/// Built via [`AnkifyConfig::builder()`] or using [`AnkifyConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_ankify::AnkifyConfig;
///
/// let config = AnkifyConfig::builder()
///     .card_count(10)
///     .max_tokens_per_request(3000)
///     .default_tag("biology")
///     .build()
///     .unwrap();
/// assert_eq!(config.card_count, 10);
/// ```
#[derive(Clone)]
pub struct AnkifyConfig {
    /// Token budget for a single request's input text. Default: 2048.
    ///
    /// A unit whose estimated size exceeds this is split into chunks and
    /// summarised chunk by chunk; each chunk summary is asked to stay within
    /// `max_tokens_per_request / chunk_count` tokens so the concatenated
    /// summary fits one generation request again.
    pub max_tokens_per_request: usize,

    /// Hard cap on the text sent to the card-generation prompt. Default: 4096.
    ///
    /// Text above this estimate is truncated before the prompt is built. The
    /// summariser normally keeps text well below it, so hitting it is logged
    /// as a warning.
    pub generation_ceiling_tokens: usize,

    /// Number of cards requested per text unit. Default: 5.
    pub card_count: usize,

    /// LLM model identifier, e.g. "gpt-4.1-nano", "claude-sonnet-4-20250514".
    /// If None, uses [`DEFAULT_MODEL`] or the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for every completion. Default: 0.5.
    pub temperature: f32,

    /// Maximum tokens the model may generate per call. Default: 2048.
    pub max_output_tokens: usize,

    /// Deadline for a single model call in seconds. Default: 60.
    ///
    /// Expiry is reported as [`AnkifyError::ModelCall`].
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Number of text units processed at once. Default: 1 (sequential).
    ///
    /// Results are always merged back in unit order, so raising this never
    /// reorders the output cards.
    pub concurrency: usize,

    /// What to do when one unit fails. Default: [`FailurePolicy::FailFast`].
    pub failure_policy: FailurePolicy,

    /// Tag applied to every card whose reply did not carry its own tag.
    pub default_tag: Option<String>,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// How to interpret the input string. Default: [`InputKind::Auto`].
    pub input_kind: InputKind,

    /// PDF page selection. Default: all pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional per-unit progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnkifyConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_request: 2048,
            generation_ceiling_tokens: 4096,
            card_count: 5,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.5,
            max_output_tokens: 2048,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            concurrency: 1,
            failure_policy: FailurePolicy::default(),
            default_tag: None,
            system_prompt: None,
            input_kind: InputKind::default(),
            pages: PageSelection::default(),
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnkifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnkifyConfig")
            .field("max_tokens_per_request", &self.max_tokens_per_request)
            .field("generation_ceiling_tokens", &self.generation_ceiling_tokens)
            .field("card_count", &self.card_count)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("failure_policy", &self.failure_policy)
            .field("default_tag", &self.default_tag)
            .field("input_kind", &self.input_kind)
            .field("pages", &self.pages)
            .finish()
    }
}

impl AnkifyConfig {
    /// Create a new builder for `AnkifyConfig`.
    pub fn builder() -> AnkifyConfigBuilder {
        AnkifyConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnkifyConfig`].
#[derive(Debug)]
pub struct AnkifyConfigBuilder {
    config: AnkifyConfig,
}

impl AnkifyConfigBuilder {
    pub fn max_tokens_per_request(mut self, n: usize) -> Self {
        self.config.max_tokens_per_request = n;
        self
    }

    pub fn generation_ceiling_tokens(mut self, n: usize) -> Self {
        self.config.generation_ceiling_tokens = n;
        self
    }

    pub fn card_count(mut self, n: usize) -> Self {
        self.config.card_count = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn default_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        self.config.default_tag = if tag.trim().is_empty() {
            None
        } else {
            Some(tag.trim().to_string())
        };
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn input_kind(mut self, kind: InputKind) -> Self {
        self.config.input_kind = kind;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnkifyConfig, AnkifyError> {
        let c = &self.config;
        if c.max_tokens_per_request == 0 {
            return Err(AnkifyError::InvalidConfig(
                "max_tokens_per_request must be ≥ 1".into(),
            ));
        }
        if c.generation_ceiling_tokens < c.max_tokens_per_request {
            return Err(AnkifyError::InvalidConfig(format!(
                "generation ceiling ({}) must be ≥ max_tokens_per_request ({})",
                c.generation_ceiling_tokens, c.max_tokens_per_request
            )));
        }
        if c.card_count == 0 {
            return Err(AnkifyError::InvalidConfig("card_count must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(AnkifyError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a failing text unit affects the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Abort on the first failing unit and return its error; cards from
    /// earlier units are discarded. (default)
    #[default]
    FailFast,
    /// Keep every unit's cards that succeeded and record per-unit errors.
    /// The run only fails when every unit failed.
    CollectPartial,
}

/// How to interpret the user-supplied input string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InputKind {
    /// URL when it has an http(s) scheme, PDF when the file starts with
    /// `%PDF` or ends in `.pdf`, plain text otherwise. (default)
    #[default]
    Auto,
    /// Plain text file; the whole file is one unit.
    Text,
    /// PDF file; one unit per selected page.
    Pdf,
    /// Web page; the body text is one unit. `http://` is assumed when the
    /// scheme is missing.
    Url,
}

/// Specifies which pages of a PDF to turn into cards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
