#![allow(dead_code)]

use helios_notify::SubscriptionHandle;
use tokio::time::{sleep, timeout, Duration};

/// Upper bound for any single delivery in these tests.
pub const DELIVERY_BOUND: Duration = Duration::from_secs(2);

/// Wait until `handle` has started at least `n` fetches.
pub async fn wait_for_fetches<T>(handle: &SubscriptionHandle<T>, n: u64) -> bool {
    timeout(DELIVERY_BOUND, async {
        while handle.fetch_count() < n {
            sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .is_ok()
}

/// Give stray deliveries a chance to show up.
pub async fn quiesce() {
    sleep(Duration::from_millis(50)).await;
}

pub fn test_runtime() -> Result<tokio::runtime::Runtime, proptest::test_runner::TestCaseError> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|e| {
            proptest::test_runner::TestCaseError::fail(format!("Failed to create runtime: {}", e))
        })
}
