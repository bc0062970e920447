//! In-memory remote used by the unit tests.

use std::collections::BTreeSet;
use std::sync::Mutex;

use chrono::{TimeZone, Utc};

use crate::remote::{Remote, RemoteError, RemoteResult};
use crate::topic::Topic;

/// A recorded call against [`FakeRemote`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List,
    Create(String),
    UpdateBody(String, String),
    UpdateName(String, String),
    Delete(String),
}

/// Remote double: keeps topics in memory, records every call and fails
/// on demand.
#[derive(Default)]
pub struct FakeRemote {
    pub topics: Mutex<Vec<Topic>>,
    pub calls: Mutex<Vec<Call>>,
    /// Topic ids whose calls fail.
    pub failing_ids: Mutex<BTreeSet<String>>,
    /// When set, every call fails.
    pub offline: Mutex<bool>,
    next_id: Mutex<u32>,
}

impl FakeRemote {
    pub fn with_topics(topics: Vec<Topic>) -> Self {
        let next = topics.len() as u32 + 1;
        Self {
            topics: Mutex::new(topics),
            next_id: Mutex::new(next),
            ..Self::default()
        }
    }

    pub fn set_next_id(&self, id: u32) {
        *self.next_id.lock().unwrap() = id;
    }

    pub fn fail_id(&self, id: &str) {
        self.failing_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn body_of(&self, id: &str) -> Option<String> {
        self.topics
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.body.clone())
    }

    fn check(&self, id: Option<&str>) -> RemoteResult<()> {
        if *self.offline.lock().unwrap() {
            return Err(RemoteError::Transport("connection refused".into()));
        }
        if let Some(id) = id {
            if self.failing_ids.lock().unwrap().contains(id) {
                return Err(RemoteError::Status {
                    code: 500,
                    message: "internal error".into(),
                });
            }
        }
        Ok(())
    }

    fn with_topic(&self, id: &str, f: impl FnOnce(&mut Topic)) -> RemoteResult<()> {
        let mut topics = self.topics.lock().unwrap();
        match topics.iter_mut().find(|t| t.id == id) {
            Some(topic) => {
                f(topic);
                Ok(())
            }
            None => Err(RemoteError::Status {
                code: 404,
                message: "not found".into(),
            }),
        }
    }
}

impl Remote for FakeRemote {
    fn list_topics(&self) -> RemoteResult<Vec<Topic>> {
        self.calls.lock().unwrap().push(Call::List);
        self.check(None)?;
        Ok(self.topics.lock().unwrap().clone())
    }

    fn create_topic(&self, name: &str) -> RemoteResult<Topic> {
        self.calls.lock().unwrap().push(Call::Create(name.to_string()));
        self.check(None)?;
        let mut next = self.next_id.lock().unwrap();
        let topic = Topic {
            created_at: Some(Utc.with_ymd_and_hms(2014, 5, 1, 12, 0, 0).unwrap()),
            ..Topic::new(next.to_string(), name)
        };
        *next += 1;
        self.topics.lock().unwrap().push(topic.clone());
        Ok(topic)
    }

    fn update_topic_body(&self, id: &str, body: &str) -> RemoteResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::UpdateBody(id.to_string(), body.to_string()));
        self.check(Some(id))?;
        self.with_topic(id, |t| t.body = body.to_string())
    }

    fn update_topic_name(&self, id: &str, name: &str) -> RemoteResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::UpdateName(id.to_string(), name.to_string()));
        self.check(Some(id))?;
        self.with_topic(id, |t| t.name = name.to_string())
    }

    fn delete_topic(&self, id: &str) -> RemoteResult<()> {
        self.calls.lock().unwrap().push(Call::Delete(id.to_string()));
        self.check(Some(id))?;
        let mut topics = self.topics.lock().unwrap();
        let before = topics.len();
        topics.retain(|t| t.id != id);
        if topics.len() == before {
            return Err(RemoteError::Status {
                code: 404,
                message: "not found".into(),
            });
        }
        Ok(())
    }
}
