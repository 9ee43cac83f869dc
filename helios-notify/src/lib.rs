//! HELIOS Notify - emit-on-save publishing and listen-and-refetch subscribing
//!
//! A [`Publisher`] signals that a topic changed once the content store has
//! confirmed a write. A mounted [`Subscriber`] re-fetches its content for
//! every distinct signal on its topic, whichever channel delivers it.

pub mod context;
pub mod dedupe;
pub mod fetcher;
pub mod publisher;
pub mod sequencer;
pub mod subscriber;
pub mod view;

pub use context::NotifyContext;
pub use dedupe::SignalDeduper;
pub use fetcher::{ContentFetcher, FnFetcher};
pub use publisher::Publisher;
pub use sequencer::{RequestSequencer, RequestTicket};
pub use subscriber::{Subscriber, SubscriptionHandle};
pub use view::ViewState;
