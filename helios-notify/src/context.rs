//! Per-context wiring shared by publishers and subscribers.

use std::sync::Arc;

use helios_channel::{CrossTabChannel, SameTabBus, SlotStore};
use helios_core::{ContextId, HeliosResult, LogicalClock, NotifyConfig};

/// Everything one execution context needs to publish and subscribe: its id,
/// its endpoint on the shared slot store, its own same-tab bus and clock.
///
/// Cheap to clone; clones share the same bus and clock.
#[derive(Clone)]
pub struct NotifyContext {
    id: ContextId,
    config: Arc<NotifyConfig>,
    cross_tab: CrossTabChannel,
    same_tab: SameTabBus,
    clock: Arc<LogicalClock>,
}

impl NotifyContext {
    /// Create a new context attached to `store`.
    pub fn new(config: NotifyConfig, store: Arc<dyn SlotStore>) -> HeliosResult<Self> {
        Self::with_id(ContextId::new(), config, store)
    }

    pub fn with_id(
        id: ContextId,
        config: NotifyConfig,
        store: Arc<dyn SlotStore>,
    ) -> HeliosResult<Self> {
        config.validate()?;
        let cross_tab = CrossTabChannel::new(id, config.slot_prefix.clone(), store);
        let same_tab = SameTabBus::new(id, config.bus_capacity);
        Ok(Self {
            id,
            config: Arc::new(config),
            cross_tab,
            same_tab,
            clock: Arc::new(LogicalClock::new()),
        })
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn config(&self) -> &NotifyConfig {
        &self.config
    }

    pub fn cross_tab(&self) -> &CrossTabChannel {
        &self.cross_tab
    }

    pub fn same_tab(&self) -> &SameTabBus {
        &self.same_tab
    }

    pub fn clock(&self) -> &LogicalClock {
        &self.clock
    }
}
