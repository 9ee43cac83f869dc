//! The invalidation signal carried over both notification channels.

use serde::{Deserialize, Serialize};

use crate::identity::EmittedAt;
use crate::topic::Topic;

/// Transient "content changed" event for one topic.
///
/// A signal never represents stored state. Receivers react to its arrival,
/// not its payload; `emitted_at` only serves de-duplication and logging.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvalidationSignal {
    pub topic: Topic,
    pub emitted_at: EmittedAt,
}

impl InvalidationSignal {
    pub fn new(topic: Topic, emitted_at: EmittedAt) -> Self {
        Self { topic, emitted_at }
    }

    pub fn is_for(&self, topic: &Topic) -> bool {
        &self.topic == topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_for_matches_exact_topic_only() {
        let achievements = Topic::new("achievement_updated").expect("valid topic");
        let timeline = Topic::new("timeline_updated").expect("valid topic");
        let signal = InvalidationSignal::new(achievements.clone(), EmittedAt::from_millis(1));

        assert!(signal.is_for(&achievements));
        assert!(!signal.is_for(&timeline));
    }

    #[test]
    fn test_signal_json_shape() {
        let signal = InvalidationSignal::new(
            Topic::new("faq_updated").expect("valid topic"),
            EmittedAt::from_millis(42),
        );
        let json = serde_json::to_value(&signal).expect("serialize");
        assert_eq!(json["topic"], "faq_updated");
        assert_eq!(json["emitted_at"], 42);
    }
}
