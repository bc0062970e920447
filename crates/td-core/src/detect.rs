//! Change detection: does a topic need pushing?

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::mirror::Mirror;

/// Decides whether a topic's working copy must be sent to the remote.
///
/// `working` is the body already read from `new/`, so the decision and
/// the upload always see the same text.
pub trait ChangeDetector: Send + Sync {
    fn is_dirty(&self, name: &str, working: &str) -> bool;
}

/// Any non-empty working body counts as a pending change.
///
/// A pushed topic keeps its body in `new/`, so it stays dirty and is
/// re-sent on every push. An intentionally emptied topic is never sent.
pub struct NonEmpty;

impl ChangeDetector for NonEmpty {
    fn is_dirty(&self, _name: &str, working: &str) -> bool {
        !working.is_empty()
    }
}

/// A topic is dirty when its working body differs from the last
/// synchronized one. A missing synchronized copy counts as empty.
pub struct Divergent<'a> {
    pub old: &'a Mirror,
}

impl ChangeDetector for Divergent<'_> {
    fn is_dirty(&self, name: &str, working: &str) -> bool {
        self.old.read_bytes(name) != working.as_bytes()
    }
}

/// Configurable choice of [`ChangeDetector`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorKind {
    #[default]
    NonEmpty,
    Divergent,
}

impl DetectorKind {
    /// Build the detector against the synchronized mirror.
    pub fn build(self, old: &Mirror) -> Box<dyn ChangeDetector + '_> {
        match self {
            DetectorKind::NonEmpty => Box::new(NonEmpty),
            DetectorKind::Divergent => Box::new(Divergent { old }),
        }
    }
}

impl FromStr for DetectorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "non-empty" | "nonempty" | "non_empty" => Ok(DetectorKind::NonEmpty),
            "divergent" | "diff" => Ok(DetectorKind::Divergent),
            other => Err(format!("unknown change detector: '{other}'")),
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorKind::NonEmpty => write!(f, "non-empty"),
            DetectorKind::Divergent => write!(f, "divergent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn synchronized(root: &std::path::Path) -> Mirror {
        let old = Mirror::new(root.join("old"));
        old.ensure().unwrap();
        old
    }

    #[test]
    fn test_non_empty_rule() {
        let dir = tempdir().unwrap();
        let old = synchronized(dir.path());
        old.write_body("full", "milk").unwrap();
        let detector = DetectorKind::NonEmpty.build(&old);

        assert!(!detector.is_dirty("empty", ""));
        // Identical to old, but still dirty under this rule.
        assert!(detector.is_dirty("full", "milk"));
    }

    #[test]
    fn test_divergent_rule() {
        let dir = tempdir().unwrap();
        let old = synchronized(dir.path());
        old.write_body("same", "milk").unwrap();
        old.write_body("edited", "milk").unwrap();
        old.write_body("emptied", "milk").unwrap();
        let detector = DetectorKind::Divergent.build(&old);

        assert!(!detector.is_dirty("same", "milk"));
        assert!(detector.is_dirty("edited", "milk, eggs"));
        assert!(detector.is_dirty("emptied", ""));
        // Never synchronized: only a non-empty body is a change.
        assert!(!detector.is_dirty("fresh", ""));
        assert!(detector.is_dirty("fresh", "first line"));
    }

    #[test]
    fn test_kind_parse_and_display() {
        assert_eq!("divergent".parse::<DetectorKind>().unwrap(), DetectorKind::Divergent);
        assert_eq!("Non-Empty".parse::<DetectorKind>().unwrap(), DetectorKind::NonEmpty);
        assert!("sometimes".parse::<DetectorKind>().is_err());
        assert_eq!(DetectorKind::NonEmpty.to_string(), "non-empty");
        assert_eq!(DetectorKind::default(), DetectorKind::NonEmpty);
    }
}
