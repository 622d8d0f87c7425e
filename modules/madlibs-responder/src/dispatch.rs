//! Turns a `word.found.*` event into a `word.picked.*` event and delivers it
//! to the caller's callback address.

use std::sync::Arc;

use cloudevents_http::{encode, CodecError, ContentMode, Event};
use madlibs_words::{route, WordCatalog};
use rand::Rng;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::sender::CallbackSender;

/// Source attribute stamped on every outbound event.
pub const SOURCE: &str = "urn:azure-microsoft-com:messaging:madlibs";

/// Extension attribute carrying the triggering event's id.
pub const RELATED_ID: &str = "relatedid";

pub type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Missing callback address")]
    MissingCallback,

    #[error("Encoding error: {0}")]
    Encode(#[from] CodecError),

    #[error("Callback delivery failed: {0:#}")]
    Delivery(#[from] anyhow::Error),
}

impl DispatchError {
    /// Caller mistakes are not faults and are not logged as errors.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DispatchError::MissingCallback)
    }
}

/// An outbound event that was handed to the callback.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Status code the callback endpoint answered with.
    pub status: u16,
    pub mode: ContentMode,
    pub event: Event,
}

#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    Delivered(Delivery),
    /// The inbound type has no response; nothing was sent.
    Ignored,
}

/// Fully-built outbound event waiting to be sent.
struct Prepared {
    callback: String,
    event: Event,
    mode: ContentMode,
}

pub struct Dispatcher {
    catalog: Arc<WordCatalog>,
    sender: Arc<dyn CallbackSender>,
}

impl Dispatcher {
    pub fn new(catalog: Arc<WordCatalog>, sender: Arc<dyn CallbackSender>) -> Self {
        Self { catalog, sender }
    }

    #[cfg(test)]
    fn catalog(&self) -> &WordCatalog {
        &self.catalog
    }

    /// Dispatch with fresh draws from the thread-local generator.
    pub async fn handle(&self, inbound: &Event, callback: Option<&str>) -> Result<DispatchOutcome> {
        // The generator is dropped here, before the delivery await.
        let prepared = self.prepare(inbound, callback, &mut rand::rng());
        self.finish(inbound, prepared).await
    }

    /// Dispatch drawing the word and the content mode from `rng`.
    pub async fn handle_with_rng<R: Rng>(
        &self,
        inbound: &Event,
        callback: Option<&str>,
        rng: &mut R,
    ) -> Result<DispatchOutcome> {
        let prepared = self.prepare(inbound, callback, rng);
        self.finish(inbound, prepared).await
    }

    fn prepare<R: Rng>(
        &self,
        inbound: &Event,
        callback: Option<&str>,
        rng: &mut R,
    ) -> Result<Option<Prepared>> {
        let Some(callback) = callback.map(str::trim).filter(|c| !c.is_empty()) else {
            info!("Didn't find callback address");
            return Err(DispatchError::MissingCallback);
        };

        info!(
            spec_version = inbound.spec_version(),
            event_type = inbound.event_type(),
            "Processing event"
        );
        info!(callback, "Callback target");

        let Some(route) = route(inbound.event_type()) else {
            debug!(event_type = inbound.event_type(), "No response for event type");
            return Ok(None);
        };

        let word = self.catalog.pick(route.category, rng);
        let event = Event::new(route.picked_type, SOURCE)
            .with_data(json!({ "word": word }))
            .with_extension(RELATED_ID, inbound.id());

        let mode = if rng.random_bool(0.5) {
            ContentMode::Binary
        } else {
            ContentMode::Structured
        };

        Ok(Some(Prepared {
            callback: callback.to_string(),
            event,
            mode,
        }))
    }

    async fn finish(
        &self,
        inbound: &Event,
        prepared: Result<Option<Prepared>>,
    ) -> Result<DispatchOutcome> {
        let result = match prepared {
            Ok(Some(prepared)) => self.deliver(prepared).await,
            Ok(None) => Ok(DispatchOutcome::Ignored),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            if !e.is_client_error() {
                error!(error = %e, event_id = inbound.id(), "Exception while processing event");
            }
        }
        result
    }

    async fn deliver(&self, prepared: Prepared) -> Result<DispatchOutcome> {
        let Prepared {
            callback,
            event,
            mode,
        } = prepared;

        let encoded = encode(&event, mode)?;
        let status = self.sender.deliver(&callback, encoded).await?;
        info!(status, mode = %mode, event_type = event.event_type(), "Callback result");

        Ok(DispatchOutcome::Delivered(Delivery {
            status,
            mode,
            event,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use cloudevents_http::{decode, EncodedEvent};
    use madlibs_words::{Category, ROUTES};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    /// Records every delivery and answers with a fixed status.
    struct RecordingSender {
        status: u16,
        calls: Mutex<Vec<(String, EncodedEvent)>>,
    }

    impl RecordingSender {
        fn new(status: u16) -> Arc<Self> {
            Arc::new(Self {
                status,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, EncodedEvent)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CallbackSender for RecordingSender {
        async fn deliver(&self, url: &str, event: EncodedEvent) -> anyhow::Result<u16> {
            self.calls.lock().unwrap().push((url.to_string(), event));
            Ok(self.status)
        }
    }

    struct FailingSender;

    #[async_trait]
    impl CallbackSender for FailingSender {
        async fn deliver(&self, _url: &str, _event: EncodedEvent) -> anyhow::Result<u16> {
            anyhow::bail!("connection refused")
        }
    }

    const CALLBACK: &str = "http://localhost:9999/?ctx=1";

    fn dispatcher(sender: Arc<dyn CallbackSender>) -> Dispatcher {
        Dispatcher::new(Arc::new(WordCatalog::bundled().unwrap()), sender)
    }

    fn inbound(event_type: &str) -> Event {
        Event::new(event_type, "http://x/madlibs").with_id("abc-123")
    }

    fn delivered(outcome: DispatchOutcome) -> Delivery {
        match outcome {
            DispatchOutcome::Delivered(d) => d,
            DispatchOutcome::Ignored => panic!("expected a delivery"),
        }
    }

    #[tokio::test]
    async fn noun_request_delivers_picked_noun() {
        let sender = RecordingSender::new(204);
        let dispatcher = dispatcher(sender.clone());

        let outcome = dispatcher
            .handle(&inbound("word.found.noun"), Some(CALLBACK))
            .await
            .unwrap();
        let delivery = delivered(outcome);

        assert_eq!(delivery.status, 204);
        assert_eq!(delivery.event.event_type(), "word.picked.noun");
        assert_eq!(
            delivery.event.source(),
            "urn:azure-microsoft-com:messaging:madlibs"
        );
        assert_eq!(delivery.event.extension(RELATED_ID), Some("abc-123"));

        let calls = sender.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, CALLBACK);
    }

    #[tokio::test]
    async fn every_route_picks_from_its_category() {
        let sender = RecordingSender::new(204);
        let dispatcher = dispatcher(sender.clone());
        let mut rng = StdRng::seed_from_u64(11);

        for r in &ROUTES {
            for _ in 0..5 {
                let outcome = dispatcher
                    .handle_with_rng(&inbound(r.found_type), Some(CALLBACK), &mut rng)
                    .await
                    .unwrap();
                let delivery = delivered(outcome);
                assert_eq!(delivery.event.event_type(), r.picked_type);
                assert_eq!(delivery.event.source(), SOURCE);
                assert_eq!(delivery.event.extension(RELATED_ID), Some("abc-123"));

                let word = delivery.event.data().unwrap()["word"]
                    .as_str()
                    .unwrap()
                    .to_string();
                assert!(
                    dispatcher.catalog().words(r.category).contains(&word),
                    "{word} is not a {}",
                    r.category
                );
            }
        }
        assert_eq!(sender.calls().len(), ROUTES.len() * 5);
    }

    #[tokio::test]
    async fn exclamation_uses_legacy_outbound_type() {
        let dispatcher = dispatcher(RecordingSender::new(204));
        let outcome = dispatcher
            .handle(&inbound("word.found.exclamation"), Some(CALLBACK))
            .await
            .unwrap();
        assert_eq!(
            delivered(outcome).event.event_type(),
            "word.picked.exlamation"
        );
    }

    #[tokio::test]
    async fn delivered_bytes_decode_to_the_outbound_event() {
        let sender = RecordingSender::new(204);
        let dispatcher = dispatcher(sender.clone());
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..10 {
            dispatcher
                .handle_with_rng(&inbound("word.found.animal"), Some(CALLBACK), &mut rng)
                .await
                .unwrap();
        }

        for (_, encoded) in sender.calls() {
            let event = decode(&encoded.headers, &encoded.body).unwrap();
            assert_eq!(event.event_type(), "word.picked.animal");
            assert_eq!(event.extension(RELATED_ID), Some("abc-123"));
            let word = event.data().unwrap()["word"].as_str().unwrap().to_string();
            assert!(dispatcher.catalog().words(Category::Animal).contains(&word));
        }
    }

    #[tokio::test]
    async fn unknown_type_is_ignored_without_delivery() {
        let sender = RecordingSender::new(204);
        let dispatcher = dispatcher(sender.clone());

        for event_type in ["word.found.unknown", "word.found.NOUN", "word.found", ""] {
            let outcome = dispatcher
                .handle(&inbound(event_type), Some(CALLBACK))
                .await
                .unwrap();
            assert!(matches!(outcome, DispatchOutcome::Ignored));
        }
        assert!(sender.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_callback_is_rejected_before_delivery() {
        let sender = RecordingSender::new(204);
        let dispatcher = dispatcher(sender.clone());

        for callback in [None, Some(""), Some("   ")] {
            let err = dispatcher
                .handle(&inbound("word.found.noun"), callback)
                .await
                .unwrap_err();
            assert!(matches!(err, DispatchError::MissingCallback));
            assert!(err.is_client_error());
        }
        assert!(sender.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_callback_wins_over_unknown_type() {
        let dispatcher = dispatcher(RecordingSender::new(204));
        let err = dispatcher
            .handle(&inbound("word.found.unknown"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::MissingCallback));
    }

    #[tokio::test]
    async fn both_content_modes_are_used() {
        let sender = RecordingSender::new(204);
        let dispatcher = dispatcher(sender.clone());

        let mut modes = HashSet::new();
        for _ in 0..40 {
            let outcome = dispatcher
                .handle(&inbound("word.found.verb"), Some(CALLBACK))
                .await
                .unwrap();
            modes.insert(delivered(outcome).mode);
        }
        assert!(modes.contains(&ContentMode::Binary));
        assert!(modes.contains(&ContentMode::Structured));

        for (_, encoded) in sender.calls() {
            let detected = ContentMode::detect(&encoded.headers);
            assert!(modes.contains(&detected));
        }
    }

    #[tokio::test]
    async fn same_seed_gives_same_word_and_mode() {
        let dispatcher = dispatcher(RecordingSender::new(204));
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);

        for _ in 0..5 {
            let first = delivered(
                dispatcher
                    .handle_with_rng(&inbound("word.found.color"), Some(CALLBACK), &mut a)
                    .await
                    .unwrap(),
            );
            let second = delivered(
                dispatcher
                    .handle_with_rng(&inbound("word.found.color"), Some(CALLBACK), &mut b)
                    .await
                    .unwrap(),
            );
            assert_eq!(first.event.data(), second.event.data());
            assert_eq!(first.mode, second.mode);
        }
    }

    #[tokio::test]
    async fn callback_status_is_passed_through() {
        let dispatcher = dispatcher(RecordingSender::new(503));
        let outcome = dispatcher
            .handle(&inbound("word.found.name"), Some(CALLBACK))
            .await
            .unwrap();
        assert_eq!(delivered(outcome).status, 503);
    }

    #[tokio::test]
    async fn delivery_failure_propagates() {
        let dispatcher = dispatcher(Arc::new(FailingSender));
        let err = dispatcher
            .handle(&inbound("word.found.adverb"), Some(CALLBACK))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Delivery(_)));
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("connection refused"));
    }
}
