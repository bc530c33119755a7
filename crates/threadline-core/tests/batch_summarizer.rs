use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use threadline_core::*;
use threadline_provider::{LlmProvider, LlmRequest, LlmResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Start(usize),
    End(usize),
}

/// Records call start/end order and the peak number of calls in flight.
struct Tracking {
    events: Mutex<Vec<Event>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    failing: Option<usize>,
}

impl Tracking {
    fn new(failing: Option<usize>) -> Self {
        Self {
            events: Mutex::new(vec![]),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            failing,
        }
    }
}

fn concept_number(request: &LlmRequest) -> usize {
    let user = request.last_user_text().unwrap_or_default();
    let start = user.find("\"Topic ").expect("concept in prompt") + "\"Topic ".len();
    user[start..start + 2].parse().expect("two-digit concept number")
}

#[async_trait]
impl LlmProvider for Tracking {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse> {
        let n = concept_number(&request);
        self.events.lock().unwrap().push(Event::Start(n));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        // Later concepts in a batch finish first.
        tokio::time::sleep(Duration::from_millis(100 - n as u64)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(Event::End(n));

        if Some(n) == self.failing {
            anyhow::bail!("backend rejected topic {n}");
        }
        Ok(LlmResponse::text(format!(
            r#"{{"title": "Summary {n:02}", "language": "en", "threads": [{{"timestamp": "2024-03-01", "participants": ["Dana"], "summary": "talked about {n}"}}]}}"#
        )))
    }
}

fn concepts(count: usize) -> Vec<String> {
    (1..=count).map(|n| format!("Topic {n:02}")).collect()
}

fn generator(provider: Arc<Tracking>) -> Generator {
    Generator::new(provider, "gemini-1.5-flash", 1024, RetryPolicy::default())
}

#[tokio::test(start_paused = true)]
async fn twenty_five_concepts_run_in_three_sequential_batches() {
    let provider = Arc::new(Tracking::new(Some(7)));
    let out = summarize_all(
        &generator(provider.clone()),
        &PromptSet::default(),
        "transcript",
        &concepts(25),
        10,
    )
    .await;

    assert_eq!(out.len(), 25);
    for (i, thread) in out.iter().enumerate() {
        let n = i + 1;
        assert_eq!(thread.concept, format!("Topic {n:02}"));
        if n == 7 {
            assert!(thread.discussion.is_placeholder());
            assert_eq!(thread.discussion.title, "Error Processing: Topic 07");
        } else {
            assert_eq!(thread.discussion.title, format!("Summary {n:02}"));
        }
    }

    assert_eq!(provider.peak.load(Ordering::SeqCst), 10);

    let events = provider.events.lock().unwrap().clone();
    let batch_of = |n: usize| (n - 1) / 10;
    for batch in 0..2 {
        let last_end = events
            .iter()
            .rposition(|e| matches!(e, Event::End(n) if batch_of(*n) == batch))
            .unwrap();
        let first_next_start = events
            .iter()
            .position(|e| matches!(e, Event::Start(n) if batch_of(*n) == batch + 1))
            .unwrap();
        assert!(
            last_end < first_next_start,
            "batch {} started before batch {batch} finished",
            batch + 1
        );
    }
}

#[tokio::test(start_paused = true)]
async fn batch_size_bounds_concurrency() {
    let provider = Arc::new(Tracking::new(None));
    let out = summarize_all(
        &generator(provider.clone()),
        &PromptSet::default(),
        "transcript",
        &concepts(7),
        3,
    )
    .await;
    assert_eq!(out.len(), 7);
    assert_eq!(provider.peak.load(Ordering::SeqCst), 3);
    assert!(out.iter().all(|t| !t.discussion.is_placeholder()));
}
