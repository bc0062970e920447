//! Working copy state.
//!
//! Compares each indexed topic's working body (`new/`) against the last
//! synchronized one (`old/`), and notes which topics the configured change
//! detector would push.

use serde::Serialize;

use crate::detect::ChangeDetector;
use crate::index::TopicIndex;
use crate::mirror::Mirror;

/// How a topic's working copy relates to its synchronized copy.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TopicStatus {
    /// Working copy matches the last synchronized copy.
    Clean,
    /// Working copy differs from the last synchronized copy.
    Modified,
    /// No working copy file exists.
    Missing,
    /// The working copy cannot be read as text; push will refuse it.
    Unreadable,
}

/// A single topic's state.
#[derive(Debug, Clone, Serialize)]
pub struct TopicState {
    pub name: String,
    pub status: TopicStatus,
    /// Whether the next push would send this topic.
    pub pending: bool,
}

/// State of every indexed topic plus unindexed files in `new/`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkingState {
    /// One entry per indexed topic, in index order.
    pub topics: Vec<TopicState>,
    /// `.md` files in `new/` with no index record.
    pub stray: Vec<String>,
}

impl WorkingState {
    /// True if every topic matches its synchronized copy.
    pub fn is_clean(&self) -> bool {
        self.topics.iter().all(|t| t.status == TopicStatus::Clean)
    }

    pub fn pending_count(&self) -> usize {
        self.topics.iter().filter(|t| t.pending).count()
    }

    /// One-line summary.
    pub fn brief(&self) -> String {
        let count = |status: TopicStatus| self.topics.iter().filter(|t| t.status == status).count();
        let modified = count(TopicStatus::Modified);
        let missing = count(TopicStatus::Missing);
        let unreadable = count(TopicStatus::Unreadable);

        let mut parts = vec![format!("topics:{}", self.topics.len())];
        if modified > 0 {
            parts.push(format!("{modified}-modified"));
        }
        if missing > 0 {
            parts.push(format!("{missing}-missing"));
        }
        if unreadable > 0 {
            parts.push(format!("{unreadable}-unreadable"));
        }
        if !self.stray.is_empty() {
            parts.push(format!("{}-stray", self.stray.len()));
        }
        parts.push(format!("pending:{}", self.pending_count()));
        parts.join(" ")
    }
}

/// Compute the state of every topic in `index`.
pub fn compute_state(
    index: &TopicIndex,
    old: &Mirror,
    new: &Mirror,
    detector: &dyn ChangeDetector,
    unindexed: Vec<String>,
) -> WorkingState {
    let topics = index
        .topics()
        .iter()
        .map(|topic| {
            let (status, pending) = match new.read_text(&topic.name) {
                Ok(working) => {
                    let status = if old.read_bytes(&topic.name) == working.as_bytes() {
                        TopicStatus::Clean
                    } else {
                        TopicStatus::Modified
                    };
                    (status, detector.is_dirty(&topic.name, &working))
                }
                Err(_) if !new.path(&topic.name).exists() => (TopicStatus::Missing, false),
                Err(_) => (TopicStatus::Unreadable, false),
            };
            TopicState {
                name: topic.name.clone(),
                status,
                pending,
            }
        })
        .collect();

    let stray = unindexed
        .into_iter()
        .filter(|name| !index.contains(name))
        .collect();

    WorkingState { topics, stray }
}
