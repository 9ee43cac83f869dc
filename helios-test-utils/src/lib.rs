//! HELIOS Test Utilities
//!
//! Shared test infrastructure for the HELIOS workspace:
//! - A mock content store with failure injection and call counts
//! - Scripted fetchers whose responses tests release one by one
//! - Proptest generators and fixtures

pub use helios_core::{
    ContentError, ContentFields, ContentItem, ContentKind, ContentStore, EmittedAt, HeliosError,
    HeliosResult, InvalidationSignal, NotifyConfig, Topic,
};

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use helios_notify::ContentFetcher;
use tokio::sync::{oneshot, Notify};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// MOCK CONTENT STORE
// ============================================================================

/// In-memory [`ContentStore`] with injectable failures.
#[derive(Debug, Default)]
pub struct MockContentStore {
    records: Mutex<HashMap<ContentKind, Vec<ContentItem>>>,
    failures: Mutex<VecDeque<ContentError>>,
    next_id: AtomicU64,
    list_calls: AtomicUsize,
    write_calls: AtomicUsize,
}

impl MockContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a kind's records.
    pub fn with_items(self, kind: ContentKind, items: Vec<ContentItem>) -> Self {
        lock(&self.records).insert(kind, items);
        self
    }

    /// Make the next call (of any kind) fail with `error`.
    pub fn fail_next(&self, error: ContentError) {
        lock(&self.failures).push_back(error);
    }

    pub fn items(&self, kind: ContentKind) -> Vec<ContentItem> {
        lock(&self.records).get(&kind).cloned().unwrap_or_default()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Create, update and delete calls, failed ones included.
    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> HeliosResult<()> {
        match lock(&self.failures).pop_front() {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }

    fn not_found(kind: ContentKind, id: &str) -> HeliosError {
        ContentError::NotFound {
            endpoint: kind.endpoint().to_string(),
            id: id.to_string(),
        }
        .into()
    }
}

#[async_trait]
impl ContentStore for MockContentStore {
    async fn list(&self, kind: ContentKind) -> HeliosResult<Vec<ContentItem>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        Ok(self.items(kind))
    }

    async fn create(&self, kind: ContentKind, fields: &ContentFields) -> HeliosResult<ContentItem> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        let id = format!("{}-{}", kind.endpoint(), self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let item = ContentItem::new(id, fields.clone());
        lock(&self.records).entry(kind).or_default().push(item.clone());
        Ok(item)
    }

    async fn update(
        &self,
        kind: ContentKind,
        id: &str,
        fields: &ContentFields,
    ) -> HeliosResult<ContentItem> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        let mut records = lock(&self.records);
        let item = records
            .get_mut(&kind)
            .and_then(|items| items.iter_mut().find(|item| item.id == id))
            .ok_or_else(|| Self::not_found(kind, id))?;
        item.fields = fields.clone();
        Ok(item.clone())
    }

    async fn delete(&self, kind: ContentKind, id: &str) -> HeliosResult<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        let mut records = lock(&self.records);
        let items = records.entry(kind).or_default();
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            return Err(Self::not_found(kind, id));
        }
        Ok(())
    }
}

// ============================================================================
// SCRIPTED FETCHER
// ============================================================================

enum Step<T> {
    Ready(HeliosResult<T>),
    Gated(oneshot::Receiver<HeliosResult<T>>),
}

struct Script<T> {
    steps: Mutex<VecDeque<Step<T>>>,
    fallback: Mutex<Option<HeliosResult<T>>>,
    calls: AtomicUsize,
    started: Notify,
}

/// A [`ContentFetcher`] that answers from a queue of scripted responses.
///
/// Gated responses stay pending until the test releases them, which lets a
/// test control the order in which concurrent fetches complete. Clones
/// share the script.
pub struct ScriptedFetcher<T> {
    script: Arc<Script<T>>,
}

impl<T> Clone for ScriptedFetcher<T> {
    fn clone(&self) -> Self {
        Self {
            script: Arc::clone(&self.script),
        }
    }
}

/// Releases one gated response of a [`ScriptedFetcher`].
pub struct FetchGate<T> {
    tx: oneshot::Sender<HeliosResult<T>>,
}

impl<T> FetchGate<T> {
    pub fn release(self, result: HeliosResult<T>) {
        // The fetch may already be gone with its subscriber.
        let _ = self.tx.send(result);
    }

    pub fn release_ok(self, content: T) {
        self.release(Ok(content));
    }
}

impl<T: Clone + Send + Sync + 'static> ScriptedFetcher<T> {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Script {
                steps: Mutex::new(VecDeque::new()),
                fallback: Mutex::new(None),
                calls: AtomicUsize::new(0),
                started: Notify::new(),
            }),
        }
    }

    /// Answer every fetch beyond the script with `content`.
    pub fn with_fallback(self, content: T) -> Self {
        *lock(&self.script.fallback) = Some(Ok(content));
        self
    }

    pub fn push_ok(&self, content: T) -> &Self {
        lock(&self.script.steps).push_back(Step::Ready(Ok(content)));
        self
    }

    pub fn push_err(&self, error: HeliosError) -> &Self {
        lock(&self.script.steps).push_back(Step::Ready(Err(error)));
        self
    }

    /// Queue a response that stays pending until the returned gate fires.
    pub fn push_gated(&self) -> FetchGate<T> {
        let (tx, rx) = oneshot::channel();
        lock(&self.script.steps).push_back(Step::Gated(rx));
        FetchGate { tx }
    }

    /// Fetches started so far.
    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` fetches have started.
    pub async fn wait_for_calls(&self, n: usize) {
        loop {
            let started = self.script.started.notified();
            if self.calls() >= n {
                return;
            }
            started.await;
        }
    }

    fn next_step(&self) -> Step<T> {
        if let Some(step) = lock(&self.script.steps).pop_front() {
            return step;
        }
        let fallback = lock(&self.script.fallback).clone();
        Step::Ready(fallback.unwrap_or_else(|| {
            Err(ContentError::Transport {
                endpoint: "scripted".to_string(),
                reason: "script exhausted".to_string(),
            }
            .into())
        }))
    }
}

impl<T: Clone + Send + Sync + 'static> Default for ScriptedFetcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> ContentFetcher for ScriptedFetcher<T> {
    type Content = T;

    async fn fetch(&self) -> HeliosResult<T> {
        let step = self.next_step();
        self.script.calls.fetch_add(1, Ordering::SeqCst);
        self.script.started.notify_waiters();

        match step {
            Step::Ready(result) => result,
            Step::Gated(rx) => rx.await.unwrap_or_else(|_| {
                Err(ContentError::Transport {
                    endpoint: "scripted".to_string(),
                    reason: "gate dropped".to_string(),
                }
                .into())
            }),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for HELIOS types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a valid topic name.
    pub fn arb_topic() -> impl Strategy<Value = Topic> {
        "[a-z][a-z0-9_]{0,23}".prop_filter_map("valid topic", |name| Topic::new(name).ok())
    }

    /// Generate two topics that differ.
    pub fn arb_distinct_topics() -> impl Strategy<Value = (Topic, Topic)> {
        (arb_topic(), arb_topic()).prop_filter("topics must differ", |(a, b)| a != b)
    }

    pub fn arb_content_kind() -> impl Strategy<Value = ContentKind> {
        proptest::sample::select(ContentKind::ALL.to_vec())
    }

    /// Generate a millisecond timestamp between 2020 and 2033.
    pub fn arb_emitted_at() -> impl Strategy<Value = EmittedAt> {
        (1_577_836_800_000i64..2_000_000_000_000i64).prop_map(EmittedAt::from_millis)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built contexts and content for common scenarios.

    use super::*;
    use helios_channel::{InMemorySlotStore, SlotStore};
    use helios_notify::NotifyContext;

    /// A shared slot store standing in for origin-scoped storage.
    pub fn shared_store() -> Arc<dyn SlotStore> {
        Arc::new(InMemorySlotStore::default())
    }

    /// A context on `store` with the given configuration.
    pub fn context(store: &Arc<dyn SlotStore>, config: NotifyConfig) -> HeliosResult<NotifyContext> {
        NotifyContext::new(config, Arc::clone(store))
    }

    /// Two contexts sharing one slot store: an admin tab and a viewer tab.
    pub fn admin_and_viewer(config: NotifyConfig) -> HeliosResult<(NotifyContext, NotifyContext)> {
        let store = shared_store();
        Ok((context(&store, config.clone())?, context(&store, config)?))
    }

    pub fn fields(pairs: &[(&str, &str)]) -> ContentFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect()
    }

    pub fn achievement(id: &str, title: &str) -> ContentItem {
        ContentItem::new(id, fields(&[("title", title), ("year", "2024")]))
    }

    pub fn timeline_item(id: &str, year: &str, event: &str) -> ContentItem {
        ContentItem::new(id, fields(&[("year", year), ("event", event)]))
    }
}
