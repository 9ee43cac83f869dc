//! Admin-side save handlers: write to the content store, then signal.

use std::sync::Arc;

use helios_core::{ContentFields, ContentItem, ContentKind, ContentStore, HeliosResult};
use helios_notify::{NotifyContext, Publisher};
use tracing::info;

/// Mutates content and emits the kind's topic after each confirmed write.
///
/// A failed write returns its error and emits nothing.
#[derive(Clone)]
pub struct AdminEditor {
    store: Arc<dyn ContentStore>,
    publisher: Publisher,
}

impl AdminEditor {
    pub fn new(store: Arc<dyn ContentStore>, ctx: &NotifyContext) -> Self {
        Self {
            store,
            publisher: Publisher::new(ctx),
        }
    }

    pub async fn create(&self, kind: ContentKind, fields: &ContentFields) -> HeliosResult<ContentItem> {
        let item = self
            .publisher
            .publish_on_success(&[kind.topic()], self.store.create(kind, fields))
            .await?;
        info!(kind = %kind, id = %item.id, "Content created");
        Ok(item)
    }

    pub async fn update(
        &self,
        kind: ContentKind,
        id: &str,
        fields: &ContentFields,
    ) -> HeliosResult<ContentItem> {
        let item = self
            .publisher
            .publish_on_success(&[kind.topic()], self.store.update(kind, id, fields))
            .await?;
        info!(kind = %kind, id, "Content updated");
        Ok(item)
    }

    pub async fn delete(&self, kind: ContentKind, id: &str) -> HeliosResult<()> {
        self.publisher
            .publish_on_success(&[kind.topic()], self.store.delete(kind, id))
            .await?;
        info!(kind = %kind, id, "Content deleted");
        Ok(())
    }
}
