//! Content-tree types emitted by the chef.
//!
//! A run produces one [`ChannelNode`] that exclusively owns a forest of
//! [`TopicNode`]s; topics own further topics or [`DocumentNode`]s. Every
//! `add_child` rejects a source id already used by a sibling.

use serde::{Deserialize, Serialize};

use crate::error::{ChefError, Result};

/// License applied to every imported document.
pub const LICENSE_CC_BY: &str = "CC BY";

/// Copyright holder used when a curriculum carries no attribution.
pub const COPYRIGHT_DEFAULT: &str = "Illustrative Mathematics";

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Resource-type label attached to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Guide,
    LessonPlan,
    Exercise,
    Activity,
    Lesson,
}

/// Intended audience of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Learner,
    Coach,
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Fixed metadata of the root channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub source_domain: String,
    pub source_id: String,
    pub title: String,
    pub language: String,
    pub description: String,
    pub tagline: String,
}

/// Root of the emitted tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelNode {
    #[serde(flatten)]
    pub info: ChannelInfo,
    #[serde(default)]
    pub children: Vec<TopicNode>,
}

impl ChannelNode {
    pub fn new(info: ChannelInfo) -> Self {
        Self {
            info,
            children: Vec::new(),
        }
    }

    /// Attach a fully built topic as the last child.
    pub fn add_child(&mut self, topic: TopicNode) -> Result<()> {
        if self.children.iter().any(|c| c.source_id == topic.source_id) {
            return Err(duplicate(&topic.source_id, &self.info.source_id));
        }
        self.children.push(topic);
        Ok(())
    }

    /// Count `(topics, documents)` in the whole tree.
    pub fn counts(&self) -> (usize, usize) {
        self.children
            .iter()
            .map(TopicNode::counts)
            .fold((0, 0), |(t, d), (ct, cd)| (t + ct, d + cd))
    }
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// A folder-like node (grade band, curriculum, course, unit, section, lesson).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicNode {
    pub source_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TopicChild>,
}

/// A child of a topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TopicChild {
    Topic(TopicNode),
    Document(DocumentNode),
}

impl TopicChild {
    pub fn source_id(&self) -> &str {
        match self {
            TopicChild::Topic(t) => &t.source_id,
            TopicChild::Document(d) => &d.source_id,
        }
    }
}

impl From<TopicNode> for TopicChild {
    fn from(t: TopicNode) -> Self {
        TopicChild::Topic(t)
    }
}

impl From<DocumentNode> for TopicChild {
    fn from(d: DocumentNode) -> Self {
        TopicChild::Document(d)
    }
}

impl TopicNode {
    pub fn new(
        source_id: impl Into<String>,
        title: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            title: title.into(),
            description,
            children: Vec::new(),
        }
    }

    /// Attach a fully built topic or document as the last child.
    pub fn add_child(&mut self, child: impl Into<TopicChild>) -> Result<()> {
        let child = child.into();
        if self
            .children
            .iter()
            .any(|c| c.source_id() == child.source_id())
        {
            return Err(duplicate(child.source_id(), &self.source_id));
        }
        self.children.push(child);
        Ok(())
    }

    /// Documents directly under this topic.
    pub fn documents(&self) -> impl Iterator<Item = &DocumentNode> {
        self.children.iter().filter_map(|c| match c {
            TopicChild::Document(d) => Some(d),
            TopicChild::Topic(_) => None,
        })
    }

    /// Topics directly under this topic.
    pub fn topics(&self) -> impl Iterator<Item = &TopicNode> {
        self.children.iter().filter_map(|c| match c {
            TopicChild::Topic(t) => Some(t),
            TopicChild::Document(_) => None,
        })
    }

    /// Count `(topics, documents)` including this topic.
    pub fn counts(&self) -> (usize, usize) {
        self.children
            .iter()
            .fold((1, 0), |(t, d), child| match child {
                TopicChild::Topic(topic) => {
                    let (ct, cd) = topic.counts();
                    (t + ct, d + cd)
                }
                TopicChild::Document(_) => (t, d + 1),
            })
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A file reference attached to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentFile {
    /// Download URL of the PDF.
    pub path: String,
    pub language: String,
}

/// Terminal importable unit: one file plus licensing and labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub source_id: String,
    pub title: String,
    pub files: Vec<DocumentFile>,
    #[serde(default)]
    pub resource_types: Vec<ResourceType>,
    pub license: String,
    pub copyright_holder: String,
    #[serde(default)]
    pub role: Role,
}

fn duplicate(source_id: &str, parent: &str) -> ChefError {
    ChefError::validation(format!(
        "duplicate source_id '{source_id}' under '{parent}'"
    ))
}
