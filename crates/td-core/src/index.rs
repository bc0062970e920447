//! Topic metadata index.
//!
//! The index lists every known topic in display order and is stored as
//! `.td/topics.json`. It never holds document bodies: those live only in
//! the mirror directories.

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::TdResult;
use crate::fsutil::atomic_write;
use crate::topic::Topic;

/// Ordered collection of topic records.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TopicIndex {
    topics: Vec<Topic>,
}

impl TopicIndex {
    pub fn new(topics: Vec<Topic>) -> Self {
        Self { topics }
    }

    /// Load the index from a JSON file.
    ///
    /// A missing file means no topics are known yet. A malformed file is
    /// logged and also treated as empty, so this never fails.
    pub fn load(path: &Path) -> Self {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "cannot read topic index");
                }
                return Self::default();
            }
        };
        match serde_json::from_slice::<Option<Vec<Topic>>>(&data) {
            Ok(topics) => Self::new(topics.unwrap_or_default()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed topic index, ignoring");
                Self::default()
            }
        }
    }

    /// Save the index to a JSON file (atomic: temp + fsync + rename).
    ///
    /// Bodies are stripped from every record before serializing.
    pub fn save(&self, path: &Path) -> TdResult<()> {
        let stripped: Vec<Topic> = self.topics.iter().map(Topic::metadata).collect();
        let json = serde_json::to_string_pretty(&stripped)?;
        atomic_write(path, json.as_bytes())?;
        Ok(())
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn into_topics(self) -> Vec<Topic> {
        self.topics
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Topic names in index order.
    pub fn names(&self) -> Vec<String> {
        self.topics.iter().map(|t| t.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Append a topic at the end of the display order.
    pub fn push(&mut self, topic: Topic) {
        self.topics.push(topic);
    }

    /// Remove a topic by name, returning it if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Topic> {
        let pos = self.topics.iter().position(|t| t.name == name)?;
        Some(self.topics.remove(pos))
    }

    /// Rename a topic in place, keeping its position.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        match self.topics.iter_mut().find(|t| t.name == from) {
            Some(topic) => {
                topic.name = to.to_string();
                true
            }
            None => false,
        }
    }
}
