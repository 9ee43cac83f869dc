//! Property-Based Tests for Cross-Tab Delivery and Idempotence
//!
//! **Property 3: Cross-tab delivery**
//!
//! For any sequence of emissions in one context, a subscriber for the same
//! topic in another context SHALL re-fetch exactly once per distinct slot
//! value change.
//!
//! **Property 4: Idempotence**
//!
//! For any sequence of signals, delivering each `emitted_at` over both
//! channels, any number of times, SHALL trigger one re-fetch per distinct
//! `emitted_at`.

use std::collections::HashSet;

use helios_channel::SlotStore;
use helios_core::{ContentKind, ContextId, EmittedAt, InvalidationSignal, NotifyConfig};
use helios_notify::{Publisher, Subscriber};
use helios_test_utils::generators::arb_topic;
use helios_test_utils::{fixtures, ScriptedFetcher};
use proptest::prelude::*;

#[path = "support/notify.rs"]
mod test_notify_support;
use test_notify_support::{quiesce, test_runtime, wait_for_fetches};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// **Property 3: Cross-tab delivery**
    #[test]
    fn prop_one_refetch_per_cross_tab_change(topic in arb_topic(), emissions in 1usize..8) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (admin, viewer) = fixtures::admin_and_viewer(NotifyConfig::default())
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let handle = Subscriber::new(&viewer, topic.clone(), ScriptedFetcher::new().with_fallback(())).mount();
            prop_assert!(wait_for_fetches(&handle, 1).await);

            let publisher = Publisher::new(&admin);
            for _ in 0..emissions {
                publisher.emit(&topic).await;
            }

            let expected = 1 + emissions as u64;
            prop_assert!(wait_for_fetches(&handle, expected).await);
            quiesce().await;
            prop_assert_eq!(handle.fetch_count(), expected);

            handle.unmount().await;
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// **Property 4: Idempotence**
    #[test]
    fn prop_duplicate_emitted_at_refetches_once(
        topic in arb_topic(),
        stamps in proptest::collection::vec(1i64..10, 1..20),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (admin, viewer) = fixtures::admin_and_viewer(NotifyConfig::default())
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let handle = Subscriber::new(&viewer, topic.clone(), ScriptedFetcher::new().with_fallback(())).mount();
            prop_assert!(wait_for_fetches(&handle, 1).await);

            for millis in &stamps {
                let signal = InvalidationSignal::new(topic.clone(), EmittedAt::from_millis(*millis));
                admin
                    .cross_tab()
                    .publish(&signal)
                    .await
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                viewer.same_tab().dispatch(signal);
            }

            let distinct = stamps.iter().collect::<HashSet<_>>().len() as u64;
            prop_assert!(wait_for_fetches(&handle, 1 + distinct).await);
            quiesce().await;
            prop_assert_eq!(handle.fetch_count(), 1 + distinct);

            handle.unmount().await;
            Ok::<(), TestCaseError>(())
        })?;
    }
}

// ============================================================================
// EDGE CASES
// ============================================================================

#[tokio::test]
async fn test_writer_sees_each_emission_once() {
    let (admin, _viewer) = fixtures::admin_and_viewer(NotifyConfig::default()).expect("contexts");
    let topic = helios_core::ContentKind::Timeline.topic();
    let handle = Subscriber::new(&admin, topic.clone(), ScriptedFetcher::new().with_fallback(())).mount();
    assert!(wait_for_fetches(&handle, 1).await);

    let publisher = Publisher::new(&admin);
    publisher.emit(&topic).await;
    publisher.emit(&topic).await;

    assert!(wait_for_fetches(&handle, 3).await);
    quiesce().await;
    assert_eq!(handle.fetch_count(), 3, "own slot writes must not add re-fetches");
    handle.unmount().await;
}

#[tokio::test]
async fn test_marker_cleared_after_receipt() {
    let (admin, viewer) = fixtures::admin_and_viewer(NotifyConfig::default()).expect("contexts");
    let topic = helios_core::ContentKind::Faq.topic();
    let handle = Subscriber::new(&viewer, topic.clone(), ScriptedFetcher::new().with_fallback(())).mount();
    assert!(wait_for_fetches(&handle, 1).await);

    Publisher::new(&admin).emit(&topic).await;
    assert!(wait_for_fetches(&handle, 2).await);
    quiesce().await;

    assert_eq!(admin.cross_tab().pending(&topic).await.expect("read"), None);
    handle.unmount().await;
}

#[tokio::test]
async fn test_marker_kept_when_clearing_disabled() {
    let config = NotifyConfig::default().with_clear_marker(false);
    let (admin, viewer) = fixtures::admin_and_viewer(config).expect("contexts");
    let topic = helios_core::ContentKind::Partner.topic();
    let handle = Subscriber::new(&viewer, topic.clone(), ScriptedFetcher::new().with_fallback(())).mount();
    assert!(wait_for_fetches(&handle, 1).await);

    let signal = Publisher::new(&admin).emit(&topic).await;
    assert!(wait_for_fetches(&handle, 2).await);

    assert_eq!(
        viewer.cross_tab().pending(&topic).await.expect("read"),
        Some(signal.emitted_at.to_slot_value())
    );
    handle.unmount().await;
}

#[tokio::test]
async fn test_unparsable_slot_value_still_triggers_refetch() {
    let store = fixtures::shared_store();
    let viewer = fixtures::context(&store, NotifyConfig::default()).expect("context");
    let topic = ContentKind::Certificate.topic();
    let handle = Subscriber::new(&viewer, topic.clone(), ScriptedFetcher::new().with_fallback(())).mount();
    assert!(wait_for_fetches(&handle, 1).await);

    // A legacy editor writing something other than a timestamp.
    store
        .write(ContextId::new(), &viewer.cross_tab().key_for(&topic), "not-a-number")
        .await
        .expect("foreign write");

    assert!(wait_for_fetches(&handle, 2).await);
    quiesce().await;
    assert_eq!(handle.fetch_count(), 2);
    handle.unmount().await;
}
