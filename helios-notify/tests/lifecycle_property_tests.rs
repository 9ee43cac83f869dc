//! Property-Based Tests for Subscriber Lifecycle and Ordering
//!
//! **Property 5: Unmount safety**
//!
//! A response that arrives after its subscriber was unmounted SHALL NOT
//! change the view, and signals after unmount SHALL NOT start fetches.
//!
//! **Property 7: Last-request-wins**
//!
//! For any completion order of two overlapping re-fetches, the view SHALL
//! end with the response of the request that started last.

use helios_core::{ContentError, HeliosError, NotifyConfig};
use helios_notify::{Publisher, Subscriber};
use helios_test_utils::{fixtures, ScriptedFetcher};
use proptest::prelude::*;

#[path = "support/notify.rs"]
mod test_notify_support;
use test_notify_support::{quiesce, test_runtime, wait_for_fetches};

// ============================================================================
// UNMOUNT SAFETY
// ============================================================================

#[tokio::test]
async fn test_late_response_after_unmount_is_ignored() {
    let (ctx, _viewer) = fixtures::admin_and_viewer(NotifyConfig::default()).expect("contexts");
    let topic = helios_core::ContentKind::Award.topic();
    let fetcher = ScriptedFetcher::new();
    fetcher.push_ok("initial");
    let gate = fetcher.push_gated();

    let mut handle = Subscriber::new(&ctx, topic.clone(), fetcher.clone()).mount();
    handle.wait_for(|s| s.content == Some("initial")).await;
    let state = handle.state();

    Publisher::new(&ctx).emit(&topic).await;
    fetcher.wait_for_calls(2).await;
    handle.unmount().await;

    gate.release_ok("late");
    quiesce().await;

    let view = state.borrow().clone();
    assert_eq!(view.content, Some("initial"));
    assert_eq!(view.applied_request, 1);
}

#[tokio::test]
async fn test_dropped_handle_stops_listening() {
    let (admin, viewer) = fixtures::admin_and_viewer(NotifyConfig::default()).expect("contexts");
    let topic = helios_core::ContentKind::Certificate.topic();
    let fetcher = ScriptedFetcher::new().with_fallback(0u8);

    let handle = Subscriber::new(&viewer, topic.clone(), fetcher.clone()).mount();
    assert!(wait_for_fetches(&handle, 1).await);
    drop(handle);
    quiesce().await;

    Publisher::new(&admin).emit(&topic).await;
    Publisher::new(&viewer).emit(&topic).await;
    quiesce().await;

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(viewer.same_tab().listener_count(), 0);
}

// ============================================================================
// LAST-REQUEST-WINS
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// **Property 7: Last-request-wins**
    #[test]
    fn prop_newest_request_wins(newest_first in any::<bool>()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let (admin, viewer) = fixtures::admin_and_viewer(NotifyConfig::default())
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let topic = helios_core::ContentKind::Statistic.topic();
            let fetcher = ScriptedFetcher::new();
            fetcher.push_ok("v0");
            let older = fetcher.push_gated();
            let newer = fetcher.push_gated();

            let mut handle = Subscriber::new(&viewer, topic.clone(), fetcher.clone()).mount();
            handle.wait_for(|s| s.content == Some("v0")).await;

            let publisher = Publisher::new(&admin);
            publisher.emit(&topic).await;
            fetcher.wait_for_calls(2).await;
            publisher.emit(&topic).await;
            fetcher.wait_for_calls(3).await;

            if newest_first {
                newer.release_ok("v2");
                handle.wait_for(|s| s.content == Some("v2")).await;
                older.release_ok("v1");
            } else {
                older.release_ok("v1");
                quiesce().await;
                prop_assert_eq!(handle.snapshot().content, Some("v0"));
                prop_assert!(handle.snapshot().loading);
                newer.release_ok("v2");
            }

            handle.wait_for(|s| s.content == Some("v2")).await;
            quiesce().await;
            let view = handle.snapshot();
            prop_assert_eq!(view.content, Some("v2"));
            prop_assert_eq!(view.applied_request, 3);
            prop_assert!(!view.loading);

            handle.unmount().await;
            Ok::<(), TestCaseError>(())
        })?;
    }
}

// ============================================================================
// RE-FETCH FAILURE
// ============================================================================

#[tokio::test]
async fn test_failed_refetch_keeps_last_good_content() {
    let (admin, viewer) = fixtures::admin_and_viewer(NotifyConfig::default()).expect("contexts");
    let topic = helios_core::ContentKind::TeamMember.topic();
    let fetcher = ScriptedFetcher::new().with_fallback(vec!["Lead Engineer", "Installer"]);
    fetcher.push_ok(vec!["Lead Engineer"]);
    fetcher.push_err(HeliosError::from(ContentError::RequestFailed {
        endpoint: "team-members".to_string(),
        status: 502,
        message: "Bad Gateway".to_string(),
    }));

    let mut handle = Subscriber::new(&viewer, topic.clone(), fetcher.clone()).mount();
    handle.wait_for(|s| s.is_loaded()).await;

    let publisher = Publisher::new(&admin);
    publisher.emit(&topic).await;
    let failed = handle.wait_for(|s| s.has_error()).await;
    assert_eq!(failed.content, Some(vec!["Lead Engineer"]));
    assert!(failed.error.as_deref().is_some_and(|e| e.contains("502")));

    // No automatic retry.
    quiesce().await;
    assert_eq!(fetcher.calls(), 2);

    publisher.emit(&topic).await;
    let recovered = handle.wait_for(|s| !s.has_error()).await;
    assert_eq!(recovered.content, Some(vec!["Lead Engineer", "Installer"]));
    handle.unmount().await;
}
