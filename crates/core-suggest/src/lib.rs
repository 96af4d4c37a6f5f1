//! Debounced, generation-tagged suggestion fetching.
//!
//! Two cooperating pieces feed the session loop's channel:
//! * [`DebounceScheduler`] collapses edit bursts into a single
//!   `DebounceElapsed` event after a quiet period; re-arming aborts the
//!   pending timer unconditionally and without side effects.
//! * [`spawn_fetch`] dispatches one background request per elapsed debounce,
//!   tagged with the generation reserved for it. Requests are never aborted
//!   mid-flight; staleness is resolved by the consumer comparing the event's
//!   generation against the latest issued one.
//!
//! Failures never escape this crate as errors: a failed or malformed fetch
//! completes with `FetchOutcome::NoSuggestion`.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use core_events::{
    Event, FETCH_FAILURES, FETCHES_ISSUED, FetchOutcome, SuggestionEvent,
};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

mod client;
mod debounce;

pub use client::{HttpSuggestClient, SuggestClient};
pub use debounce::DebounceScheduler;

/// One generation-tagged request. At most one request is current (the one
/// carrying the highest generation); older in-flight requests keep running
/// but their completions are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRequest {
    pub generation: u64,
    pub source_text: String,
}

/// Dispatch `request` on a background task; the completion (success, empty,
/// or failure) arrives on `tx` as an `Event::Suggestion` carrying the
/// request's generation. The task never fails the caller.
pub fn spawn_fetch(
    client: Arc<dyn SuggestClient>,
    request: SuggestionRequest,
    tx: Sender<Event>,
) -> JoinHandle<()> {
    FETCHES_ISSUED.fetch_add(1, Ordering::Relaxed);
    tokio::spawn(async move {
        let generation = request.generation;
        debug!(
            target: "suggest.fetch",
            generation,
            source_len = request.source_text.len(),
            "fetch_dispatched"
        );
        let outcome = match client.fetch(&request).await {
            Ok(text) => FetchOutcome::from_text(text),
            Err(err) => {
                FETCH_FAILURES.fetch_add(1, Ordering::Relaxed);
                debug!(target: "suggest.fetch", generation, ?err, "fetch_failed");
                FetchOutcome::NoSuggestion
            }
        };
        if tx
            .send(Event::Suggestion(SuggestionEvent { generation, outcome }))
            .await
            .is_err()
        {
            trace!(target: "suggest.fetch", generation, "consumer_gone");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct FixedClient(Result<String, ()>);

    #[async_trait::async_trait]
    impl SuggestClient for FixedClient {
        async fn fetch(&self, _request: &SuggestionRequest) -> anyhow::Result<String> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(()) => anyhow::bail!("backend unavailable"),
            }
        }
    }

    #[tokio::test]
    async fn fetch_completion_carries_generation() {
        let (tx, mut rx) = mpsc::channel::<Event>(4);
        let client = Arc::new(FixedClient(Ok("next line".to_string())));
        spawn_fetch(
            client,
            SuggestionRequest {
                generation: 7,
                source_text: "code".to_string(),
            },
            tx,
        );
        let Some(Event::Suggestion(ev)) = rx.recv().await else {
            panic!("expected suggestion event");
        };
        assert_eq!(ev.generation, 7);
        assert_eq!(ev.outcome, FetchOutcome::Suggestion("next line".to_string()));
    }

    #[tokio::test]
    async fn fetch_failure_completes_with_no_suggestion() {
        let (tx, mut rx) = mpsc::channel::<Event>(4);
        let client = Arc::new(FixedClient(Err(())));
        spawn_fetch(
            client,
            SuggestionRequest {
                generation: 3,
                source_text: "code".to_string(),
            },
            tx,
        );
        let Some(Event::Suggestion(ev)) = rx.recv().await else {
            panic!("expected suggestion event");
        };
        assert_eq!(ev.generation, 3);
        assert_eq!(ev.outcome, FetchOutcome::NoSuggestion);
    }

    #[tokio::test]
    async fn empty_reply_is_no_suggestion() {
        let (tx, mut rx) = mpsc::channel::<Event>(4);
        let client = Arc::new(FixedClient(Ok(String::new())));
        spawn_fetch(
            client,
            SuggestionRequest {
                generation: 1,
                source_text: "code".to_string(),
            },
            tx,
        );
        let Some(Event::Suggestion(ev)) = rx.recv().await else {
            panic!("expected suggestion event");
        };
        assert_eq!(ev.outcome, FetchOutcome::NoSuggestion);
    }
}
