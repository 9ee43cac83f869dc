//! Topics and the closed catalog of CMS content kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Logical content domain that scopes which publishers and subscribers
/// interact. Topics match by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    /// Create a validated topic.
    ///
    /// Topics must be non-empty ASCII graphic strings without `:`, which is
    /// reserved as the slot key separator.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::InvalidTopic {
                topic: name,
                reason: "must not be empty".to_string(),
            });
        }
        if let Some(bad) = name.chars().find(|c| !c.is_ascii_graphic() || *c == ':') {
            return Err(ValidationError::InvalidTopic {
                reason: format!("contains disallowed character {bad:?}"),
                topic: name,
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Topic {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Topic {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.0
    }
}

/// Content domains managed through the admin panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    HeroSlide,
    Timeline,
    TeamMember,
    Faq,
    Award,
    Certificate,
    Partner,
    Statistic,
    Achievement,
}

impl ContentKind {
    pub const ALL: [ContentKind; 9] = [
        ContentKind::HeroSlide,
        ContentKind::Timeline,
        ContentKind::TeamMember,
        ContentKind::Faq,
        ContentKind::Award,
        ContentKind::Certificate,
        ContentKind::Partner,
        ContentKind::Statistic,
        ContentKind::Achievement,
    ];

    /// Topic name published after a successful save of this kind.
    pub fn topic_name(&self) -> &'static str {
        match self {
            ContentKind::HeroSlide => "hero_slide_updated",
            ContentKind::Timeline => "timeline_updated",
            ContentKind::TeamMember => "team_member_updated",
            ContentKind::Faq => "faq_updated",
            ContentKind::Award => "award_updated",
            ContentKind::Certificate => "certificate_updated",
            ContentKind::Partner => "partner_updated",
            ContentKind::Statistic => "statistic_updated",
            ContentKind::Achievement => "achievement_updated",
        }
    }

    pub fn topic(&self) -> Topic {
        // Catalog names are static and valid.
        Topic(self.topic_name().to_string())
    }

    /// REST collection path on the content store, relative to the base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ContentKind::HeroSlide => "hero-slides",
            ContentKind::Timeline => "timeline",
            ContentKind::TeamMember => "team-members",
            ContentKind::Faq => "faqs",
            ContentKind::Award => "awards",
            ContentKind::Certificate => "certificates",
            ContentKind::Partner => "partners",
            ContentKind::Statistic => "statistics",
            ContentKind::Achievement => "achievements",
        }
    }

    /// Inverse of [`ContentKind::topic`].
    pub fn from_topic(topic: &Topic) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.topic_name() == topic.as_str())
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

impl FromStr for ContentKind {
    type Err = ValidationError;

    /// Accepts either the endpoint name (`"team-members"`) or the topic name
    /// (`"team_member_updated"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.endpoint() == s || kind.topic_name() == s)
            .ok_or_else(|| ValidationError::UnknownTopic {
                topic: s.to_string(),
            })
    }
}
