//! Store — the main entry point for td operations.
//!
//! A Store ties together the topic index and the three mirror
//! directories under the root sync directory:
//!
//! ```text
//! .td/
//!   topics.json   topic metadata, never bodies
//!   config.json   settings
//!   td.lock       advisory lock for mutating operations
//!   old/          last synchronized bodies
//!   new/          working bodies (what the user edits)
//!   tmp/          scratch area for a full refresh
//! ```
//!
//! Every operation that mutates the index or a mirror holds the store
//! lock for its whole duration.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::detect::DetectorKind;
use crate::diff::TopicDiff;
use crate::error::{TdError, TdResult};
use crate::index::TopicIndex;
use crate::lock::StoreLock;
use crate::mirror::Mirror;
use crate::remote::{Remote, RemoteError};
use crate::state::{self, WorkingState};
use crate::suggest;
use crate::sync::{Progress, PushReport, Reconciler};
use crate::topic::{is_valid_name, Topic};

/// Name of the metadata index file.
pub const INDEX_FILE: &str = "topics.json";
const OLD_DIR: &str = "old";
const NEW_DIR: &str = "new";
const TMP_DIR: &str = "tmp";

/// Context lines around each diff hunk.
const DIFF_CONTEXT: usize = 3;

/// How a push should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushOptions {
    pub detector: DetectorKind,
    pub workers: usize,
}

impl From<&Config> for PushOptions {
    fn from(config: &Config) -> Self {
        Self {
            detector: config.settings.detector,
            workers: config.workers(),
        }
    }
}

/// Outcome of a full refresh from the remote.
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub topics: usize,
}

/// The local topic store.
pub struct Store {
    config: Config,
    old: Mirror,
    new: Mirror,
    tmp: Mirror,
}

impl Store {
    /// Open the store described by `config`, creating its directories if
    /// this is the first run.
    pub fn open(config: Config) -> TdResult<Self> {
        let root = config.root.clone();
        let store = Self {
            old: Mirror::new(root.join(OLD_DIR)),
            new: Mirror::new(root.join(NEW_DIR)),
            tmp: Mirror::new(root.join(TMP_DIR)),
            config,
        };
        fs::create_dir_all(&root)?;
        store.old.ensure()?;
        store.new.ensure()?;
        store.tmp.ensure()?;
        Ok(store)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.config.root.join(INDEX_FILE)
    }

    /// Last synchronized bodies.
    pub fn old(&self) -> &Mirror {
        &self.old
    }

    /// Working bodies.
    pub fn new_mirror(&self) -> &Mirror {
        &self.new
    }

    /// The topic index; empty if it does not exist yet.
    pub fn load_index(&self) -> TopicIndex {
        TopicIndex::load(&self.index_path())
    }

    /// Topic names in display order.
    pub fn list(&self) -> Vec<String> {
        self.load_index().names()
    }

    fn lock(&self) -> TdResult<StoreLock> {
        StoreLock::acquire(&self.config.root, self.config.lock_timeout())
    }

    /// Find `name` in `index`, or fail with suggestions.
    pub fn resolve(index: &TopicIndex, name: &str) -> TdResult<Topic> {
        match index.get(name) {
            Some(topic) => Ok(topic.clone()),
            None => Err(TdError::UnknownTopic {
                name: name.to_string(),
                suggestions: suggest::similar(&index.names(), name),
            }),
        }
    }

    /// Like [`Store::resolve`], for operations that address the topic on
    /// the remote: a record without an id is refused before any call.
    fn resolve_remote(index: &TopicIndex, name: &str) -> TdResult<Topic> {
        let topic = Self::resolve(index, name)?;
        if topic.id.is_empty() {
            return Err(TdError::NoRemoteId(topic.name));
        }
        Ok(topic)
    }

    /// Create a topic on the remote and add it locally with empty bodies.
    pub fn create(&self, remote: &dyn Remote, name: &str) -> TdResult<Topic> {
        let _lock = self.lock()?;
        if !is_valid_name(name) {
            return Err(TdError::InvalidName(name.to_string()));
        }
        let mut index = self.load_index();
        if index.contains(name) {
            return Err(TdError::TopicExists(name.to_string()));
        }

        let mut topic = remote.create_topic(name)?;
        if topic.id.is_empty() {
            return Err(RemoteError::Decode("created topic has no id".into()).into());
        }
        if topic.name.is_empty() {
            topic.name = name.to_string();
        }

        index.push(topic.metadata());
        index.save(&self.index_path())?;
        self.old.write_body(&topic.name, "")?;
        self.new.write_body(&topic.name, "")?;

        info!(topic = %topic.name, id = %topic.id, "topic created");
        Ok(topic.metadata())
    }

    /// Delete a topic on the remote, then drop its record and both bodies.
    ///
    /// If the remote call fails nothing local is touched.
    pub fn delete(&self, remote: &dyn Remote, name: &str) -> TdResult<Topic> {
        let _lock = self.lock()?;
        let mut index = self.load_index();
        let topic = Self::resolve_remote(&index, name)?;

        remote.delete_topic(&topic.id)?;

        index.remove(name);
        index.save(&self.index_path())?;
        self.old.remove(name)?;
        self.new.remove(name)?;

        info!(topic = %name, id = %topic.id, "topic deleted");
        Ok(topic)
    }

    /// Rename a topic on the remote, then in the index and both mirrors.
    ///
    /// If the remote call fails nothing local is renamed. Both mirror
    /// renames are attempted even if the first one fails; the first
    /// failure is returned.
    pub fn rename(&self, remote: &dyn Remote, from: &str, to: &str) -> TdResult<()> {
        let _lock = self.lock()?;
        let mut index = self.load_index();
        let topic = Self::resolve_remote(&index, from)?;
        if from == to {
            return Ok(());
        }
        if !is_valid_name(to) {
            return Err(TdError::InvalidName(to.to_string()));
        }
        if index.contains(to) {
            return Err(TdError::TopicExists(to.to_string()));
        }

        remote.update_topic_name(&topic.id, to)?;

        index.rename(from, to);
        index.save(&self.index_path())?;
        let old_result = self.old.rename(from, to);
        let new_result = self.new.rename(from, to);
        if let Err(e) = &old_result {
            warn!(topic = %from, error = %e, "cannot rename synchronized copy");
        }
        if let Err(e) = &new_result {
            warn!(topic = %from, error = %e, "cannot rename working copy");
        }
        old_result.and(new_result)?;

        info!(from = %from, to = %to, "topic renamed");
        Ok(())
    }

    /// Replace all local state with `topics`, taken as authoritative.
    ///
    /// Fills `tmp/`, mirrors it into `old/` and `new/`, then rewrites the
    /// index. Local edits are overwritten.
    pub fn refresh(&self, topics: &[Topic]) -> TdResult<()> {
        let _lock = self.lock()?;

        let mut seen = BTreeSet::new();
        for topic in topics {
            if !is_valid_name(&topic.name) {
                return Err(TdError::InvalidName(topic.name.clone()));
            }
            if !seen.insert(topic.name.as_str()) {
                return Err(TdError::TopicExists(topic.name.clone()));
            }
        }

        self.tmp.clear()?;
        for topic in topics {
            self.tmp.write_body(&topic.name, &topic.body)?;
        }
        self.tmp.copy_tree(&self.old)?;
        self.tmp.copy_tree(&self.new)?;
        TopicIndex::new(topics.to_vec()).save(&self.index_path())?;

        info!(topics = topics.len(), "local store refreshed");
        Ok(())
    }

    /// Download every topic and refresh the local store with it.
    pub fn fetch(&self, remote: &dyn Remote) -> TdResult<FetchResult> {
        let topics = remote.list_topics()?;
        self.refresh(&topics)?;
        Ok(FetchResult {
            topics: topics.len(),
        })
    }

    /// Push pending working copies and reconcile the mirrors.
    ///
    /// Remote failures are reported per topic in the result, never as an
    /// error; only failing to lock the store is.
    pub fn push(
        &self,
        remote: &dyn Remote,
        options: PushOptions,
        progress: &mut dyn FnMut(&Progress),
    ) -> TdResult<PushReport> {
        let _lock = self.lock()?;
        let index = self.load_index();
        let detector = options.detector.build(&self.old);
        let report = Reconciler::new(remote, detector.as_ref(), &self.old, &self.new)
            .workers(options.workers)
            .push(index.topics(), progress);
        Ok(report)
    }

    /// Per-topic working copy state.
    pub fn state(&self) -> TdResult<WorkingState> {
        let index = self.load_index();
        let detector = self.config.settings.detector.build(&self.old);
        Ok(state::compute_state(
            &index,
            &self.old,
            &self.new,
            detector.as_ref(),
            self.new.names()?,
        ))
    }

    /// Pending changes of one topic, or of every topic in index order.
    pub fn diff(&self, name: Option<&str>) -> TdResult<Vec<TopicDiff>> {
        let index = self.load_index();
        let names = match name {
            Some(name) => vec![Self::resolve(&index, name)?.name],
            None => index.names(),
        };
        Ok(names
            .iter()
            .filter_map(|name| {
                TopicDiff::compute(
                    name,
                    &self.old.read_bytes(name),
                    &self.new.read_bytes(name),
                    DIFF_CONTEXT,
                )
            })
            .collect())
    }

    /// What an editor should open: the working copy of `name`, or the
    /// whole working directory.
    pub fn edit_target(&self, name: Option<&str>) -> TdResult<PathBuf> {
        match name {
            Some(name) => {
                let topic = Self::resolve(&self.load_index(), name)?;
                Ok(self.new.path(&topic.name))
            }
            None => Ok(self.new.dir().to_path_buf()),
        }
    }
}
