//! Property-Based Tests for Topic Isolation
//!
//! **Property 6: Topic isolation**
//!
//! For any two distinct topics A and B, signals on B, from this context or
//! another, SHALL NOT trigger a subscriber registered on A.

use helios_core::{ContentKind, NotifyConfig};
use helios_notify::{Publisher, Subscriber};
use helios_test_utils::generators::{arb_content_kind, arb_distinct_topics};
use helios_test_utils::{fixtures, ScriptedFetcher};
use proptest::prelude::*;

#[path = "support/notify.rs"]
mod test_notify_support;
use test_notify_support::{quiesce, test_runtime, wait_for_fetches};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// **Property 6: Topic isolation**
    #[test]
    fn prop_other_topics_never_trigger((watched, other) in arb_distinct_topics(), noise in 1usize..5) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (admin, viewer) = fixtures::admin_and_viewer(NotifyConfig::default())
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let handle = Subscriber::new(&viewer, watched.clone(), ScriptedFetcher::new().with_fallback(())).mount();
            prop_assert!(wait_for_fetches(&handle, 1).await);

            let remote = Publisher::new(&admin);
            let local = Publisher::new(&viewer);
            for _ in 0..noise {
                remote.emit(&other).await;
                local.emit(&other).await;
            }
            quiesce().await;
            prop_assert_eq!(handle.fetch_count(), 1);

            // A signal on the watched topic still gets through.
            local.emit(&watched).await;
            prop_assert!(wait_for_fetches(&handle, 2).await);

            handle.unmount().await;
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Kind-to-topic mapping keeps every content domain on its own topic.
    #[test]
    fn prop_content_kinds_map_to_distinct_topics(a in arb_content_kind(), b in arb_content_kind()) {
        prop_assert_eq!(a == b, a.topic() == b.topic());
        prop_assert_eq!(ContentKind::from_topic(&a.topic()), Some(a));
    }
}

#[tokio::test]
async fn test_achievement_signal_does_not_refresh_timeline() {
    let (admin, viewer) = fixtures::admin_and_viewer(NotifyConfig::default()).expect("contexts");
    let timeline = Subscriber::new(
        &viewer,
        ContentKind::Timeline.topic(),
        ScriptedFetcher::new().with_fallback(()),
    )
    .mount();
    let achievements = Subscriber::new(
        &viewer,
        ContentKind::Achievement.topic(),
        ScriptedFetcher::new().with_fallback(()),
    )
    .mount();
    assert!(wait_for_fetches(&timeline, 1).await);
    assert!(wait_for_fetches(&achievements, 1).await);

    Publisher::new(&admin).emit(&ContentKind::Achievement.topic()).await;

    assert!(wait_for_fetches(&achievements, 2).await);
    quiesce().await;
    assert_eq!(timeline.fetch_count(), 1);

    timeline.unmount().await;
    achievements.unmount().await;
}
