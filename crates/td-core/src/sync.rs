//! Push reconciliation.
//!
//! A push reads each topic's working body once, sends it if the detector
//! says it changed, then promotes each successfully handled topic by
//! writing that same body over `old/<name>.md`. A working copy that is
//! missing or not UTF-8 fails its topic before any remote call. Failed
//! topics keep their working copy untouched and are retried by the next
//! push.

use std::collections::{BTreeMap, BTreeSet};
use std::thread;

use crossbeam_channel::unbounded;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::detect::ChangeDetector;
use crate::mirror::Mirror;
use crate::remote::Remote;
use crate::topic::Topic;

/// Outcome of a push.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PushReport {
    /// Topics whose working copy is now the synchronized copy.
    pub succeeded: BTreeSet<String>,
    /// Topics still pending, with the reason they failed.
    pub failed: BTreeMap<String, String>,
    /// Number of bodies sent to the remote.
    pub sent: usize,
}

impl PushReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_names(&self) -> Vec<String> {
        self.failed.keys().cloned().collect()
    }
}

/// Emitted once per processed topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Topics processed so far, including this one.
    pub done: usize,
    pub total: usize,
    pub name: String,
}

/// What happened to one topic before promotion. Successful outcomes carry
/// the body that was read, which is what gets promoted.
#[derive(Debug)]
enum Attempt {
    /// Nothing to send.
    Unchanged(String),
    Sent(String),
    Failed(String),
}

/// Pushes working copies and reconciles the mirrors.
pub struct Reconciler<'a> {
    remote: &'a dyn Remote,
    detector: &'a dyn ChangeDetector,
    old: &'a Mirror,
    new: &'a Mirror,
    workers: usize,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        remote: &'a dyn Remote,
        detector: &'a dyn ChangeDetector,
        old: &'a Mirror,
        new: &'a Mirror,
    ) -> Self {
        Self {
            remote,
            detector,
            old,
            new,
            workers: 1,
        }
    }

    /// Number of concurrent remote updates. Values below 1 mean 1.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Push `topics` in index order and promote the successes.
    ///
    /// `progress` is called once per topic from the calling thread, with a
    /// strictly increasing `done` count.
    pub fn push(&self, topics: &[Topic], progress: &mut dyn FnMut(&Progress)) -> PushReport {
        let attempts = if self.workers <= 1 || topics.len() <= 1 {
            self.attempt_sequential(topics, progress)
        } else {
            self.attempt_concurrent(topics, progress)
        };

        let mut report = PushReport::default();
        let mut handled = Vec::new();
        for (name, attempt) in attempts {
            match attempt {
                Attempt::Unchanged(body) => handled.push((name, body)),
                Attempt::Sent(body) => {
                    report.sent += 1;
                    handled.push((name, body));
                }
                Attempt::Failed(reason) => {
                    warn!(topic = %name, %reason, "push failed");
                    report.failed.insert(name, reason);
                }
            }
        }

        self.promote(handled, &mut report);
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            sent = report.sent,
            "push finished"
        );
        report
    }

    fn attempt_sequential(
        &self,
        topics: &[Topic],
        progress: &mut dyn FnMut(&Progress),
    ) -> BTreeMap<String, Attempt> {
        let total = topics.len();
        let mut attempts = BTreeMap::new();
        for (i, topic) in topics.iter().enumerate() {
            let attempt = self.attempt(topic);
            progress(&Progress {
                done: i + 1,
                total,
                name: topic.name.clone(),
            });
            attempts.insert(topic.name.clone(), attempt);
        }
        attempts
    }

    fn attempt_concurrent(
        &self,
        topics: &[Topic],
        progress: &mut dyn FnMut(&Progress),
    ) -> BTreeMap<String, Attempt> {
        let total = topics.len();
        let (job_tx, job_rx) = unbounded::<&Topic>();
        let (result_tx, result_rx) = unbounded::<(String, Attempt)>();
        for topic in topics {
            let _ = job_tx.send(topic);
        }
        drop(job_tx);

        let mut attempts = BTreeMap::new();
        thread::scope(|scope| {
            for _ in 0..self.workers.min(total) {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for topic in job_rx.iter() {
                        let attempt = self.attempt(topic);
                        if result_tx.send((topic.name.clone(), attempt)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            for (done, (name, attempt)) in result_rx.iter().enumerate() {
                progress(&Progress {
                    done: done + 1,
                    total,
                    name: name.clone(),
                });
                attempts.insert(name, attempt);
            }
        });
        attempts
    }

    fn attempt(&self, topic: &Topic) -> Attempt {
        let body = match self.new.read_text(&topic.name) {
            Ok(body) => body,
            Err(e) => return Attempt::Failed(format!("cannot read working copy: {e}")),
        };
        if !self.detector.is_dirty(&topic.name, &body) {
            debug!(topic = %topic.name, "unchanged, skipping");
            return Attempt::Unchanged(body);
        }
        if topic.id.is_empty() {
            return Attempt::Failed("topic has no remote id".to_string());
        }
        match self.remote.update_topic_body(&topic.id, &body) {
            Ok(()) => {
                debug!(topic = %topic.name, bytes = body.len(), "pushed");
                Attempt::Sent(body)
            }
            Err(e) => Attempt::Failed(e.to_string()),
        }
    }

    /// Write each handled body over its synchronized copy. A topic whose
    /// write fails moves to `failed`; the rest continue.
    fn promote(&self, handled: Vec<(String, String)>, report: &mut PushReport) {
        for (name, body) in handled {
            match self.old.write_body(&name, &body) {
                Ok(()) => {
                    report.succeeded.insert(name);
                }
                Err(e) => {
                    warn!(topic = %name, error = %e, "cannot promote working copy");
                    report.failed.insert(name, e.to_string());
                }
            }
        }
    }
}
