//! Emit-on-save publisher.

use std::future::Future;

use helios_core::{EmittedAt, InvalidationSignal, Topic};
use tracing::{debug, info, warn};

use crate::context::NotifyContext;

/// Emits invalidation signals over both channels of a context.
///
/// Emission is fire-and-forget: a failed slot write is logged and otherwise
/// looks exactly like a delivery nobody listened to.
#[derive(Clone)]
pub struct Publisher {
    ctx: NotifyContext,
}

impl Publisher {
    pub fn new(ctx: &NotifyContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Signal that `topic` changed.
    ///
    /// Writes the new `emitted_at` into the cross-tab slot (seen by other
    /// contexts), then dispatches the same signal on the same-tab bus (seen
    /// by this one). Only call after the content store confirmed the write.
    ///
    /// The new `emitted_at` is always above the value currently in the slot,
    /// so a save from another context in the same millisecond still changes
    /// the slot.
    pub async fn emit(&self, topic: &Topic) -> InvalidationSignal {
        match self.ctx.cross_tab().pending(topic).await {
            Ok(Some(value)) => {
                if let Ok(at) = value.parse::<EmittedAt>() {
                    self.ctx.clock().witness(at);
                }
            }
            Ok(None) => {}
            Err(e) => debug!(topic = %topic, error = %e, "Could not read slot before emitting"),
        }
        let signal = InvalidationSignal::new(topic.clone(), self.ctx.clock().tick());

        if let Err(e) = self.ctx.cross_tab().publish(&signal).await {
            warn!(
                topic = %topic,
                emitted_at = signal.emitted_at.as_millis(),
                error = %e,
                "Cross-tab delivery failed"
            );
        }
        self.ctx.same_tab().dispatch(signal.clone());

        info!(
            context = %self.ctx.id(),
            topic = %topic,
            emitted_at = signal.emitted_at.as_millis(),
            "Invalidation signal emitted"
        );
        signal
    }

    /// Emit one signal per topic, in order.
    pub async fn emit_all(&self, topics: &[Topic]) -> Vec<InvalidationSignal> {
        let mut signals = Vec::with_capacity(topics.len());
        for topic in topics {
            signals.push(self.emit(topic).await);
        }
        signals
    }

    /// Run a content-store write and emit for `topics` only if it succeeds.
    ///
    /// The write's result is handed back untouched.
    pub async fn publish_on_success<T, E, W>(&self, topics: &[Topic], write: W) -> Result<T, E>
    where
        W: Future<Output = Result<T, E>>,
    {
        let result = write.await;
        match &result {
            Ok(_) => {
                self.emit_all(topics).await;
            }
            Err(_) => {
                debug!(topics = ?topics, "Write failed, no signal emitted");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helios_channel::{InMemorySlotStore, SlotStore};
    use helios_core::NotifyConfig;
    use std::sync::Arc;

    fn setup() -> (NotifyContext, Arc<InMemorySlotStore>) {
        let store = Arc::new(InMemorySlotStore::default());
        let ctx = NotifyContext::new(NotifyConfig::default(), store.clone()).expect("context");
        (ctx, store)
    }

    fn topic(name: &str) -> Topic {
        Topic::new(name).expect("valid topic")
    }

    #[tokio::test]
    async fn test_emit_writes_slot_and_dispatches_locally() {
        let (ctx, store) = setup();
        let publisher = Publisher::new(&ctx);
        let mut local = ctx.same_tab().subscribe();
        let achievements = topic("achievement_updated");

        let signal = publisher.emit(&achievements).await;

        let slot = store
            .read(&ctx.cross_tab().key_for(&achievements))
            .await
            .expect("read slot");
        assert_eq!(slot, Some(signal.emitted_at.to_slot_value()));
        assert_eq!(local.try_recv().expect("local dispatch"), signal);
    }

    #[tokio::test]
    async fn test_consecutive_emissions_increase() {
        let (ctx, _store) = setup();
        let publisher = Publisher::new(&ctx);
        let faq = topic("faq_updated");

        let first = publisher.emit(&faq).await;
        let second = publisher.emit(&faq).await;
        assert!(second.emitted_at > first.emitted_at);
    }

    #[tokio::test]
    async fn test_emission_lands_above_other_context_slot_value() {
        let (first, store) = setup();
        let second = NotifyContext::new(NotifyConfig::default(), store.clone()).expect("context");
        let timeline = topic("timeline_updated");

        // The other editor's clock runs a minute ahead of ours.
        let ahead = EmittedAt::from_millis(chrono::Utc::now().timestamp_millis() + 60_000);
        first
            .cross_tab()
            .publish(&InvalidationSignal::new(timeline.clone(), ahead))
            .await
            .expect("publish");

        let signal = Publisher::new(&second).emit(&timeline).await;
        assert!(signal.emitted_at > ahead);
        assert_eq!(
            store
                .read(&second.cross_tab().key_for(&timeline))
                .await
                .expect("read slot"),
            Some(signal.emitted_at.to_slot_value())
        );
    }

    #[tokio::test]
    async fn test_failed_write_emits_nothing() {
        let (ctx, store) = setup();
        let publisher = Publisher::new(&ctx);
        let mut local = ctx.same_tab().subscribe();
        let mut slots = store.changes();

        let result: Result<(), &str> = publisher
            .publish_on_success(&[topic("award_updated")], async { Err("HTTP 500") })
            .await;

        assert_eq!(result, Err("HTTP 500"));
        assert!(local.try_recv().is_err());
        assert!(slots.try_recv().is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_successful_write_emits_every_topic() {
        let (ctx, _store) = setup();
        let publisher = Publisher::new(&ctx);
        let mut local = ctx.same_tab().subscribe();
        let topics = [topic("award_updated"), topic("certificate_updated")];

        let result: Result<u32, String> =
            publisher.publish_on_success(&topics, async { Ok(7) }).await;

        assert_eq!(result, Ok(7));
        assert_eq!(local.try_recv().expect("first").topic, topics[0]);
        assert_eq!(local.try_recv().expect("second").topic, topics[1]);
    }
}
