//! Viewer binding: a subscriber that re-lists one content kind.

use std::sync::Arc;

use async_trait::async_trait;
use helios_core::{ContentItem, ContentKind, ContentStore, HeliosResult};
use helios_notify::{ContentFetcher, NotifyContext, Subscriber, SubscriptionHandle};

/// Fetches the full list of one content kind.
pub struct StoreFetcher {
    store: Arc<dyn ContentStore>,
    kind: ContentKind,
}

impl StoreFetcher {
    pub fn new(store: Arc<dyn ContentStore>, kind: ContentKind) -> Self {
        Self { store, kind }
    }
}

#[async_trait]
impl ContentFetcher for StoreFetcher {
    type Content = Vec<ContentItem>;

    async fn fetch(&self) -> HeliosResult<Vec<ContentItem>> {
        self.store.list(self.kind).await
    }
}

/// Mount a viewer for `kind` on the kind's topic.
pub fn mount_viewer(
    ctx: &NotifyContext,
    store: Arc<dyn ContentStore>,
    kind: ContentKind,
) -> SubscriptionHandle<Vec<ContentItem>> {
    Subscriber::new(ctx, kind.topic(), StoreFetcher::new(store, kind)).mount()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::AdminEditor;
    use helios_core::NotifyConfig;
    use helios_test_utils::{fixtures, MockContentStore};

    #[tokio::test]
    async fn test_viewer_sees_admin_save_from_other_context() {
        let store = Arc::new(
            MockContentStore::new()
                .with_items(ContentKind::Achievement, vec![fixtures::achievement("a1", "Solar 100")]),
        );
        let (admin, viewer) = fixtures::admin_and_viewer(NotifyConfig::default()).expect("contexts");

        let mut handle = mount_viewer(&viewer, store.clone(), ContentKind::Achievement);
        let initial = handle.wait_for(|s| s.is_loaded()).await;
        assert_eq!(initial.content.map(|items| items.len()), Some(1));

        AdminEditor::new(store.clone(), &admin)
            .create(ContentKind::Achievement, &fixtures::fields(&[("title", "Solar 200")]))
            .await
            .expect("create");

        let refreshed = handle
            .wait_for(|s| s.content.as_ref().is_some_and(|items| items.len() == 2))
            .await;
        assert!(refreshed.last_signal.is_some());
        assert_eq!(store.list_calls(), 2);
        handle.unmount().await;
    }
}
