//! Data-fetch seam used by subscribers.

use std::future::Future;

use async_trait::async_trait;
use helios_core::HeliosResult;

/// Loads the content a subscriber renders.
#[async_trait]
pub trait ContentFetcher: Send + Sync + 'static {
    type Content: Clone + Send + Sync + 'static;

    async fn fetch(&self) -> HeliosResult<Self::Content>;
}

/// Adapts an async closure into a [`ContentFetcher`].
pub struct FnFetcher<F> {
    f: F,
}

impl<F> FnFetcher<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut, T> ContentFetcher for FnFetcher<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HeliosResult<T>> + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    type Content = T;

    async fn fetch(&self) -> HeliosResult<T> {
        (self.f)().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helios_core::{ContentError, HeliosError};

    #[tokio::test]
    async fn test_fn_fetcher_forwards_result() {
        let ok = FnFetcher::new(|| async { Ok::<_, HeliosError>(vec![1u32, 2]) });
        assert_eq!(ok.fetch().await.expect("fetch"), vec![1, 2]);

        let failing = FnFetcher::new(|| async {
            Err::<u32, _>(HeliosError::from(ContentError::Transport {
                endpoint: "faqs".to_string(),
                reason: "connection refused".to_string(),
            }))
        });
        assert!(failing.fetch().await.is_err());
    }
}
