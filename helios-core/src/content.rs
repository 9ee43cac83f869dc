//! Content records and the external content store seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HeliosResult;
use crate::topic::ContentKind;

/// Free-form field set of a CMS record (title, image URL, year, ...).
pub type ContentFields = Map<String, Value>;

/// One record as returned by the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub fields: ContentFields,
}

impl ContentItem {
    pub fn new(id: impl Into<String>, fields: ContentFields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// REST-backed CRUD collaborator holding the CMS data.
///
/// A successful return from a mutating method is the only precondition for
/// emitting an invalidation signal.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Current content for a kind.
    async fn list(&self, kind: ContentKind) -> HeliosResult<Vec<ContentItem>>;

    async fn create(&self, kind: ContentKind, fields: &ContentFields) -> HeliosResult<ContentItem>;

    async fn update(
        &self,
        kind: ContentKind,
        id: &str,
        fields: &ContentFields,
    ) -> HeliosResult<ContentItem>;

    async fn delete(&self, kind: ContentKind, id: &str) -> HeliosResult<()>;
}
