//! helios-watch: keeps viewers of the CMS content fresh and logs each refresh.
//!
//! Usage: `helios-watch --config helios.toml [KIND...]`. Kinds are endpoint
//! names (`faqs`) or topics (`faq_updated`); all kinds when none are given.

use std::sync::Arc;

use helios_channel::LmdbSlotStore;
use helios_client::{mount_viewer, ClientConfig, ContentClient, WatchError};
use helios_core::{ContentItem, ContentKind, ContentStore, HeliosError};
use helios_notify::{NotifyContext, ViewState};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), WatchError> {
    init_tracing()?;

    let config = ClientConfig::load()?;
    let kinds = kinds_from_args()?;

    let rest = ContentClient::new(&config)?;
    let content_base_url = rest.base_url().to_string();
    let client: Arc<dyn ContentStore> = Arc::new(rest);
    let slots = Arc::new(
        LmdbSlotStore::open(
            &config.slot_store_path,
            config.slot_store_max_size_mb,
            config.notify.bus_capacity,
        )
        .map_err(HeliosError::from)?,
    );
    let poller = slots.spawn_poller(config.slot_poll_interval());
    let ctx = NotifyContext::new(config.notify_config(), slots.clone())?;

    info!(
        context = %ctx.id(),
        content_base_url = %content_base_url,
        slot_store = %config.slot_store_path.display(),
        kinds = kinds.len(),
        "Starting helios-watch"
    );

    let mut handles = Vec::with_capacity(kinds.len());
    let mut loggers = JoinSet::new();
    for kind in kinds {
        let handle = mount_viewer(&ctx, Arc::clone(&client), kind);
        loggers.spawn(log_refreshes(kind, handle.state()));
        handles.push(handle);
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    for handle in handles {
        handle.unmount().await;
    }
    loggers.abort_all();
    poller.abort();
    Ok(())
}

fn init_tracing() -> Result<(), WatchError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .map_err(|e| WatchError::Tracing(e.to_string()))
}

fn kinds_from_args() -> Result<Vec<ContentKind>, WatchError> {
    let mut kinds = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            args.next();
            continue;
        }
        let kind = arg
            .parse::<ContentKind>()
            .map_err(|_| WatchError::UnknownKind(arg.clone()))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    if kinds.is_empty() {
        kinds.extend(ContentKind::ALL);
    }
    Ok(kinds)
}

async fn log_refreshes(kind: ContentKind, mut state: watch::Receiver<ViewState<Vec<ContentItem>>>) {
    while state.changed().await.is_ok() {
        let view = state.borrow_and_update().clone();
        if view.loading {
            continue;
        }
        match (&view.error, &view.content) {
            (Some(error), content) => warn!(
                kind = %kind,
                error = %error,
                showing = content.as_ref().map_or(0, Vec::len),
                "Refresh failed, keeping last content"
            ),
            (None, Some(items)) => info!(
                kind = %kind,
                items = items.len(),
                request = view.applied_request,
                signal = ?view.last_signal.and_then(|at| at.to_datetime()),
                "Content refreshed"
            ),
            (None, None) => {}
        }
    }
}
