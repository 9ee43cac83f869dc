//! Listen-and-refetch subscriber.
//!
//! A mounted subscriber owns one listener task. The task waits on the
//! cross-tab observer, the same-tab bus, an optional poll ticker and an
//! optional settle deadline, and starts a re-fetch for every distinct signal
//! on its topic. Each re-fetch runs as its own task; its response is applied
//! only if the subscriber is still mounted and no newer request has started.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use helios_channel::{CrossTabObserver, Observed};
use helios_core::{ContentError, EmittedAt, HeliosResult, InvalidationSignal, Topic};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::{Id as TaskId, JoinError, JoinHandle, JoinSet};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::context::NotifyContext;
use crate::dedupe::SignalDeduper;
use crate::fetcher::ContentFetcher;
use crate::sequencer::{RequestSequencer, RequestTicket};
use crate::view::ViewState;

// ============================================================================
// VIEW CELL
// ============================================================================

/// State shared by the handle, the listener and in-flight fetches.
///
/// `alive` is only flipped inside `send_if_modified`, so the liveness check
/// and the state update of a response happen under the same lock.
struct ViewCell<T> {
    topic: Topic,
    state: watch::Sender<ViewState<T>>,
    alive: AtomicBool,
    sequencer: RequestSequencer,
    fetches: AtomicU64,
}

impl<T> ViewCell<T> {
    fn new(topic: Topic) -> Self {
        let (state, _rx) = watch::channel(ViewState::default());
        Self {
            topic,
            state,
            alive: AtomicBool::new(true),
            sequencer: RequestSequencer::new(),
            fetches: AtomicU64::new(0),
        }
    }

    /// Issue a ticket for a new fetch, or `None` once unmounted.
    fn begin(&self) -> Option<RequestTicket> {
        let mut ticket = None;
        self.state.send_if_modified(|state| {
            if !self.alive.load(Ordering::Acquire) {
                return false;
            }
            ticket = Some(self.sequencer.begin());
            self.fetches.fetch_add(1, Ordering::AcqRel);
            let was_loading = state.loading;
            state.loading = true;
            !was_loading
        });
        ticket
    }

    /// Apply a response. Returns whether it reached the view.
    fn apply(&self, ticket: RequestTicket, result: HeliosResult<T>, trigger: Option<EmittedAt>) -> bool {
        self.state.send_if_modified(|state| {
            if !self.alive.load(Ordering::Acquire) {
                debug!(topic = %self.topic, request = ticket.sequence(), "Response after unmount discarded");
                return false;
            }
            if !self.sequencer.is_current(ticket) {
                debug!(
                    topic = %self.topic,
                    request = ticket.sequence(),
                    latest = self.sequencer.issued(),
                    "Superseded response discarded"
                );
                return false;
            }
            match result {
                Ok(content) => state.apply_success(ticket, content, trigger),
                Err(e) => {
                    warn!(topic = %self.topic, request = ticket.sequence(), error = %e, "Re-fetch failed");
                    state.apply_failure(ticket, e.to_string(), trigger);
                }
            }
            true
        })
    }

    /// Stop accepting responses. Returns whether the cell was still live.
    fn retire(&self) -> bool {
        let mut was_alive = false;
        self.state.send_if_modified(|_| {
            was_alive = self.alive.swap(false, Ordering::AcqRel);
            false
        });
        was_alive
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

// ============================================================================
// SUBSCRIBER
// ============================================================================

/// A viewer's registration for one topic, ready to be mounted.
pub struct Subscriber<F> {
    ctx: NotifyContext,
    topic: Topic,
    fetcher: F,
}

impl<F: ContentFetcher> Subscriber<F> {
    pub fn new(ctx: &NotifyContext, topic: Topic, fetcher: F) -> Self {
        Self {
            ctx: ctx.clone(),
            topic,
            fetcher,
        }
    }

    /// Attach to both channels, start the initial fetch and return the
    /// handle that owns the subscription.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(self) -> SubscriptionHandle<F::Content> {
        // Register before the initial fetch so no signal can slip between.
        let cross = self.ctx.cross_tab().observe();
        let same = self.ctx.same_tab().subscribe();

        let config = self.ctx.config().clone();
        let cell = Arc::new(ViewCell::new(self.topic.clone()));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let poll = config.poll_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        info!(
            context = %self.ctx.id(),
            topic = %self.topic,
            polling = ?config.poll_interval,
            "Subscriber mounted"
        );

        let listener = Listener {
            cell: Arc::clone(&cell),
            fetcher: Arc::new(self.fetcher),
            settle: config.settle_delay(),
            deduper: SignalDeduper::new(config.dedupe_window),
            clear_marker: config.clear_marker_on_receipt,
            ctx: self.ctx,
            cross,
            same,
            commands: command_rx,
            shutdown: shutdown_rx,
            poll,
            deadline: None,
            pending_trigger: None,
            inflight: JoinSet::new(),
            requests: HashMap::new(),
        };
        let task = tokio::spawn(listener.run());

        SubscriptionHandle {
            state: cell.state.subscribe(),
            cell,
            commands: command_tx,
            shutdown: Some(shutdown_tx),
            listener: Some(task),
        }
    }
}

// ============================================================================
// LISTENER TASK
// ============================================================================

enum Command {
    Refresh,
}

#[derive(Debug, Clone, Copy)]
enum Via {
    CrossTab,
    SameTab,
}

struct Listener<F: ContentFetcher> {
    cell: Arc<ViewCell<F::Content>>,
    fetcher: Arc<F>,
    ctx: NotifyContext,
    cross: CrossTabObserver,
    same: broadcast::Receiver<InvalidationSignal>,
    commands: mpsc::UnboundedReceiver<Command>,
    shutdown: oneshot::Receiver<()>,
    poll: Option<Interval>,
    settle: Duration,
    deduper: SignalDeduper,
    clear_marker: bool,
    deadline: Option<Instant>,
    pending_trigger: Option<EmittedAt>,
    inflight: JoinSet<()>,
    /// Ticket and trigger of each in-flight fetch, by task.
    requests: HashMap<TaskId, (RequestTicket, Option<EmittedAt>)>,
}

impl<F: ContentFetcher> Listener<F> {
    async fn run(mut self) {
        self.start_fetch(None);

        let mut cross_open = true;
        let mut same_open = true;
        loop {
            tokio::select! {
                _ = &mut self.shutdown => break,
                observed = self.cross.recv(), if cross_open => match observed {
                    Some(Observed::Signal(signal)) => self.on_signal(signal, Via::CrossTab).await,
                    Some(Observed::Lagged { .. }) => self.trigger(None),
                    None => cross_open = false,
                },
                received = self.same.recv(), if same_open => match received {
                    Ok(signal) => self.on_signal(signal, Via::SameTab).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(topic = %self.cell.topic, skipped, "Same-tab listener lagged");
                        self.trigger(None);
                    }
                    Err(RecvError::Closed) => same_open = false,
                },
                Some(command) = self.commands.recv() => match command {
                    Command::Refresh => self.start_fetch(None),
                },
                _ = next_tick(&mut self.poll) => {
                    debug!(topic = %self.cell.topic, "Poll tick");
                    self.start_fetch(None);
                }
                _ = tokio::time::sleep_until(self.deadline.unwrap_or_else(Instant::now)), if self.deadline.is_some() => {
                    self.deadline = None;
                    let trigger = self.pending_trigger.take();
                    self.start_fetch(trigger);
                }
                Some(joined) = self.inflight.join_next_with_id(), if !self.inflight.is_empty() => match joined {
                    Ok((id, ())) => {
                        self.requests.remove(&id);
                    }
                    Err(e) => self.on_fetch_task_failed(e),
                },
            }
        }

        debug!(
            topic = %self.cell.topic,
            inflight = self.inflight.len(),
            "Listener stopped"
        );
        self.inflight.abort_all();
    }

    async fn on_signal(&mut self, signal: InvalidationSignal, via: Via) {
        self.ctx.clock().witness(signal.emitted_at);
        if !signal.is_for(&self.cell.topic) {
            return;
        }
        if !self.deduper.observe(signal.emitted_at) {
            debug!(
                topic = %signal.topic,
                emitted_at = signal.emitted_at.as_millis(),
                via = ?via,
                "Duplicate signal ignored"
            );
            return;
        }
        debug!(
            topic = %signal.topic,
            emitted_at = signal.emitted_at.as_millis(),
            via = ?via,
            "Signal received"
        );

        if self.clear_marker {
            if let Err(e) = self.ctx.cross_tab().clear(&signal.topic).await {
                debug!(topic = %signal.topic, error = %e, "Could not clear slot marker");
            }
        }
        self.trigger(Some(signal.emitted_at));
    }

    /// Re-fetch now, or open (or join) the settle window.
    fn trigger(&mut self, emitted_at: Option<EmittedAt>) {
        if self.settle.is_zero() {
            self.start_fetch(emitted_at);
            return;
        }
        self.pending_trigger = self.pending_trigger.max(emitted_at);
        if self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.settle);
        }
    }

    fn start_fetch(&mut self, trigger: Option<EmittedAt>) {
        let Some(ticket) = self.cell.begin() else {
            return;
        };
        debug!(
            topic = %self.cell.topic,
            request = ticket.sequence(),
            trigger = ?trigger.map(|t| t.as_millis()),
            "Re-fetch started"
        );

        let cell = Arc::clone(&self.cell);
        let fetcher = Arc::clone(&self.fetcher);
        let task = self.inflight.spawn(async move {
            let result = fetcher.fetch().await;
            cell.apply(ticket, result, trigger);
        });
        self.requests.insert(task.id(), (ticket, trigger));
    }

    /// A fetch task panicked or was cancelled before applying its result.
    fn on_fetch_task_failed(&mut self, e: JoinError) {
        warn!(topic = %self.cell.topic, error = %e, "Re-fetch task failed");
        let Some((ticket, trigger)) = self.requests.remove(&e.id()) else {
            return;
        };
        let failure = ContentError::FetchAborted {
            topic: self.cell.topic.to_string(),
            reason: e.to_string(),
        };
        self.cell.apply(ticket, Err(failure.into()), trigger);
    }
}

async fn next_tick(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

// ============================================================================
// HANDLE
// ============================================================================

/// Owns a mounted subscription. Dropping it unmounts without waiting.
pub struct SubscriptionHandle<T> {
    cell: Arc<ViewCell<T>>,
    state: watch::Receiver<ViewState<T>>,
    commands: mpsc::UnboundedSender<Command>,
    shutdown: Option<oneshot::Sender<()>>,
    listener: Option<JoinHandle<()>>,
}

impl<T> SubscriptionHandle<T> {
    pub fn topic(&self) -> &Topic {
        &self.cell.topic
    }

    /// A receiver that observes every applied state change.
    pub fn state(&self) -> watch::Receiver<ViewState<T>> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> ViewState<T>
    where
        T: Clone,
    {
        self.state.borrow().clone()
    }

    /// Wait until the view satisfies `predicate` and return that state.
    pub async fn wait_for<P>(&mut self, predicate: P) -> ViewState<T>
    where
        P: FnMut(&ViewState<T>) -> bool,
        T: Clone,
    {
        // The sender lives in `cell`, which this handle keeps alive.
        if let Ok(state) = self.state.wait_for(predicate).await {
            return state.clone();
        }
        self.state.borrow().clone()
    }

    /// Ask for an immediate re-fetch outside of any signal.
    pub fn refresh(&self) {
        if self.commands.send(Command::Refresh).is_err() {
            debug!(topic = %self.cell.topic, "Refresh requested after unmount");
        }
    }

    /// Number of fetches started, the initial one included.
    pub fn fetch_count(&self) -> u64 {
        self.cell.fetches.load(Ordering::Acquire)
    }

    pub fn is_mounted(&self) -> bool {
        self.cell.is_alive()
    }

    /// Detach from both channels and wait for the listener to stop.
    ///
    /// Responses still in flight are dropped without touching the view.
    pub async fn unmount(mut self) {
        self.retire();
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(listener) = self.listener.take() {
            if let Err(e) = listener.await {
                warn!(topic = %self.cell.topic, error = %e, "Listener ended abnormally");
            }
        }
    }

    fn retire(&self) {
        if self.cell.retire() {
            info!(topic = %self.cell.topic, "Subscriber unmounted");
        }
    }
}

impl<T> Drop for SubscriptionHandle<T> {
    fn drop(&mut self) {
        self.retire();
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
