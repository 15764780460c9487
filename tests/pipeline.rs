//! Offline integration tests: the full pipeline against stub models.
//!
//! No network, no API key and no pdfium are needed; the model is replaced
//! through the `CompletionModel` seam.
//!
//! Run with:
//!   cargo test --test pipeline

use async_trait::async_trait;
use edgequake_ankify::{
    cards_to_csv, parse_reply, stream_units, AnkifyConfig, AnkifyError, AnkifyProgressCallback,
    CardRecord, Completion, CompletionModel, FailurePolicy, Pipeline, TextUnit, UnitError,
};
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Stub models ──────────────────────────────────────────────────────────────

/// Always returns the same reply; counts calls.
struct StubModel {
    reply: String,
    calls: AtomicUsize,
}

impl StubModel {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionModel for StubModel {
    async fn complete(&self, _prompt: &str) -> Result<Completion, AnkifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Completion::text(self.reply.clone()))
    }
}

/// Fails every call as a transport error would.
struct BrokenModel;

#[async_trait]
impl CompletionModel for BrokenModel {
    async fn complete(&self, _prompt: &str) -> Result<Completion, AnkifyError> {
        Err(AnkifyError::ModelCall {
            detail: "connection reset by peer".into(),
        })
    }
}

/// Answers with a card naming the unit text it was given. Prompts
/// containing "fail" get an error; short texts are delayed longer so that
/// concurrent units finish out of order.
struct EchoModel;

#[async_trait]
impl CompletionModel for EchoModel {
    async fn complete(&self, prompt: &str) -> Result<Completion, AnkifyError> {
        let body = prompt
            .rsplit("\"\"\"")
            .nth(1)
            .unwrap_or_default()
            .trim()
            .to_string();
        if body.contains("fail") {
            return Err(AnkifyError::ModelCall {
                detail: format!("rejected '{body}'"),
            });
        }
        let delay = 40u64.saturating_sub(body.len() as u64 * 5);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(Completion::text(format!("Q: {body}?\nA: yes")))
    }
}

// ── Reference scenarios ───────────────────────────────────────────────────────────

#[tokio::test]
async fn paris_unit_becomes_one_card() {
    let model = StubModel::new("Q: What is the capital of France?\n\nA: Paris");
    let pipeline = Pipeline::new(model.clone(), AnkifyConfig::default());
    let units = TextUnit::from_map([(1, "Paris is the capital of France.".to_string())]);

    let out = pipeline.run(&units, 1).await.unwrap();

    assert_eq!(
        out.cards,
        vec![CardRecord::new("What is the capital of France?", "Paris")]
    );
    // short unit: no summary call, one generation call
    assert_eq!(model.calls(), 1);
    assert_eq!(out.stats.total_cards, 1);
    assert_eq!(
        cards_to_csv(&out.cards),
        "What is the capital of France?,Paris,\n"
    );
}

#[tokio::test]
async fn transport_error_fails_the_run() {
    let pipeline = Pipeline::new(Arc::new(BrokenModel), AnkifyConfig::default());
    let units = vec![TextUnit::new(1, "Paris is the capital of France.")];

    let err = pipeline.run(&units, 1).await.unwrap_err();
    assert!(matches!(err, AnkifyError::ModelCall { .. }), "got {err:?}");
}

#[tokio::test]
async fn repeated_runs_give_identical_cards() {
    let model = StubModel::new("Q: a\nA: 1\n\nQ: b\nA: 2");
    let config = AnkifyConfig::builder().concurrency(4).build().unwrap();
    let pipeline = Pipeline::new(model, config);
    let units: Vec<_> = (1..=6)
        .map(|i| TextUnit::new(i, format!("unit {i}")))
        .collect();

    let first = pipeline.run(&units, 2).await.unwrap();
    let second = pipeline.run(&units, 2).await.unwrap();
    assert_eq!(first.cards, second.cards);
    assert_eq!(first.cards.len(), 12);
}

#[test]
fn parser_scenarios() {
    let one = parse_reply("Q: What is 2+2?\n\nA: 4");
    assert_eq!(one.cards, vec![CardRecord::new("What is 2+2?", "4")]);

    assert!(parse_reply("garbage with no markers").cards.is_empty());

    let two = parse_reply("Q: first\n\nA: one\n\nQ: second\n\nA: two");
    assert_eq!(
        two.cards,
        vec![
            CardRecord::new("first", "one"),
            CardRecord::new("second", "two")
        ]
    );
}

// ── Summarisation path ───────────────────────────────────────────────────────

#[tokio::test]
async fn large_unit_is_summarised_chunk_by_chunk() {
    let model = StubModel::new("Q: q\nA: a");
    let config = AnkifyConfig::builder()
        .max_tokens_per_request(50)
        .generation_ceiling_tokens(100)
        .build()
        .unwrap();
    let pipeline = Pipeline::new(model.clone(), config);

    // ~258 tokens against a 50-token budget → 6 chunks
    let text = "The mitochondria is the powerhouse of the cell. ".repeat(21);
    let out = pipeline.run(&[TextUnit::new(1, text)], 1).await.unwrap();

    assert_eq!(out.units[0].chunk_count, 6);
    assert_eq!(model.calls(), 6 + 1);
    assert_eq!(out.cards.len(), 1);
}

// ── Failure policies ─────────────────────────────────────────────────────────

#[tokio::test]
async fn fail_fast_drops_completed_units() {
    let pipeline = Pipeline::new(Arc::new(EchoModel), AnkifyConfig::default());
    let units = vec![
        TextUnit::new(1, "alpha"),
        TextUnit::new(2, "fail here"),
        TextUnit::new(3, "gamma"),
    ];
    let err = pipeline.run(&units, 1).await.unwrap_err();
    assert!(err.to_string().contains("fail here"), "got: {err}");
}

#[tokio::test]
async fn collect_partial_keeps_successful_units() {
    let config = AnkifyConfig::builder()
        .failure_policy(FailurePolicy::CollectPartial)
        .build()
        .unwrap();
    let pipeline = Pipeline::new(Arc::new(EchoModel), config);
    let units = vec![
        TextUnit::new(1, "alpha"),
        TextUnit::new(2, "fail here"),
        TextUnit::new(3, "gamma"),
    ];

    let out = pipeline.run(&units, 1).await.unwrap();
    assert_eq!(
        out.cards,
        vec![
            CardRecord::new("alpha?", "yes"),
            CardRecord::new("gamma?", "yes")
        ]
    );
    assert_eq!(out.stats.failed_units, 1);
    let errors: Vec<_> = out.unit_errors().collect();
    assert!(matches!(
        errors[..],
        [UnitError::ModelCallFailed { unit: 2, .. }]
    ));
}

#[tokio::test]
async fn collect_partial_with_no_success_is_an_error() {
    let config = AnkifyConfig::builder()
        .failure_policy(FailurePolicy::CollectPartial)
        .build()
        .unwrap();
    let pipeline = Pipeline::new(Arc::new(BrokenModel), config);
    let units = vec![TextUnit::new(1, "a"), TextUnit::new(2, "b")];

    let err = pipeline.run(&units, 1).await.unwrap_err();
    assert!(matches!(err, AnkifyError::AllUnitsFailed { total: 2, .. }));
}

// ── Concurrency ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_units_keep_unit_order() {
    let config = AnkifyConfig::builder().concurrency(8).build().unwrap();
    let pipeline = Pipeline::new(Arc::new(EchoModel), config);
    // longer texts finish first
    let units: Vec<_> = (1..=6)
        .map(|i| TextUnit::new(i, "x".repeat(i)))
        .collect();

    let out = pipeline.run(&units, 1).await.unwrap();
    let questions: Vec<_> = out.cards.iter().map(|c| c.question.as_str()).collect();
    assert_eq!(questions, ["x?", "xx?", "xxx?", "xxxx?", "xxxxx?", "xxxxxx?"]);
}

#[tokio::test]
async fn stream_emits_units_in_order() {
    let config = AnkifyConfig::builder().concurrency(3).build().unwrap();
    let pipeline = Arc::new(Pipeline::new(Arc::new(EchoModel), config));
    let units: Vec<_> = (1..=4)
        .map(|i| TextUnit::new(i, "y".repeat(i)))
        .collect();

    let ids: Vec<_> = stream_units(pipeline, units, 1)
        .map(|r| r.map(|u| u.unit_id).unwrap_or(0))
        .collect()
        .await;
    assert_eq!(ids, [1, 2, 3, 4]);
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl AnkifyProgressCallback for Recorder {
    fn on_run_start(&self, total_units: usize) {
        self.events.lock().unwrap().push(format!("start {total_units}"));
    }
    fn on_unit_complete(&self, unit_id: usize, _total: usize, card_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("unit {unit_id}: {card_count}"));
    }
    fn on_run_complete(&self, total_units: usize, success_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {success_count}/{total_units}"));
    }
}

#[tokio::test]
async fn progress_callback_sees_every_unit() {
    let recorder = Arc::new(Recorder::default());
    let config = AnkifyConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let pipeline = Pipeline::new(StubModel::new("Q: q\nA: a"), config);
    let units = vec![TextUnit::new(1, "one"), TextUnit::new(2, "two")];

    pipeline.run(&units, 1).await.unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        ["start 2", "unit 1: 1", "unit 2: 1", "done 2/2"]
    );
}
