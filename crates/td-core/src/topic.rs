//! Topics — the named documents td keeps in sync.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File extension of every mirror file.
pub const EXTENSION: &str = "md";

/// A named document synchronized with the remote store.
///
/// The same shape is used on the wire and in `topics.json`; the index
/// never holds body text (see [`Topic::metadata`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// Remote-assigned identifier. Empty until the remote confirms creation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Local-unique name, also the mirror file stem.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Document text.
    #[serde(rename = "contents", default, skip_serializing_if = "String::is_empty")]
    pub body: String,
    /// Set by the remote on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Rendered form some servers send along with the body.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub markdown: String,
}

impl Topic {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Copy of this topic with all text content cleared.
    pub fn metadata(&self) -> Topic {
        Topic {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            body: String::new(),
            markdown: String::new(),
        }
    }

    /// Mirror file name for this topic.
    pub fn file_name(&self) -> String {
        file_name(&self.name)
    }
}

/// Mirror file name for a topic name.
pub fn file_name(name: &str) -> String {
    format!("{name}.{EXTENSION}")
}

/// Whether `name` can be used as a topic name.
///
/// Names become file names inside the mirror directories, so they must be
/// a single non-empty path component.
pub fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_wire_field_names() {
        let created = Utc.with_ymd_and_hms(2014, 5, 1, 12, 0, 0).unwrap();
        let topic = Topic {
            created_at: Some(created),
            ..Topic::new("9", "todo").with_body("buy milk")
        };
        let json = serde_json::to_value(&topic).unwrap();
        assert_eq!(json["id"], "9");
        assert_eq!(json["name"], "todo");
        assert_eq!(json["contents"], "buy milk");
        assert!(json.get("body").is_none());
        assert!(json.get("markdown").is_none());
        assert_eq!(json["created_at"], "2014-05-01T12:00:00Z");
    }

    #[test]
    fn test_metadata_strips_text() {
        let mut topic = Topic::new("1", "groceries").with_body("milk, eggs");
        topic.markdown = "<p>milk, eggs</p>".to_string();
        let meta = topic.metadata();
        assert_eq!(meta.id, "1");
        assert_eq!(meta.name, "groceries");
        assert!(meta.body.is_empty());
        assert!(meta.markdown.is_empty());
    }

    #[test]
    fn test_deserialize_partial_record() {
        let topic: Topic = serde_json::from_str(r#"{"name":"draft"}"#).unwrap();
        assert_eq!(topic.name, "draft");
        assert!(topic.id.is_empty());
        assert!(topic.created_at.is_none());
    }

    #[test]
    fn test_name_validation() {
        assert!(is_valid_name("groceries"));
        assert!(is_valid_name("week 12"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("   "));
        assert!(!is_valid_name(".."));
        assert!(!is_valid_name("a/b"));
        assert!(!is_valid_name("a\\b"));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("todo"), "todo.md");
        assert_eq!(Topic::new("", "notes").file_name(), "notes.md");
    }
}
