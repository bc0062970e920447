//! What `td diff` shows: a topic's synchronized copy against its working
//! copy, line by line.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LineOp {
    /// Only in the working copy.
    Add,
    /// Only in the synchronized copy.
    Remove,
    Context,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffLine {
    pub op: LineOp,
    pub content: String,
}

/// A run of changes with surrounding context. Starts are 1-based; a side
/// with no lines starts at the line before the hunk, as in unified diffs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

/// Pending changes of one topic: `old/<name>.md` against `new/<name>.md`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicDiff {
    pub name: String,
    pub hunks: Vec<DiffHunk>,
    /// Either copy is not text. No hunks are computed then.
    pub is_binary: bool,
    pub additions: usize,
    pub deletions: usize,
}

impl TopicDiff {
    /// Diff two copies of a topic. `None` when the bytes are identical.
    pub fn compute(name: &str, old: &[u8], new: &[u8], context: usize) -> Option<Self> {
        if old == new {
            return None;
        }
        let mut diff = TopicDiff {
            name: name.to_string(),
            hunks: Vec::new(),
            is_binary: false,
            additions: 0,
            deletions: 0,
        };
        match (as_text(old), as_text(new)) {
            (Some(old), Some(new)) => {
                let old: Vec<&str> = old.lines().collect();
                let new: Vec<&str> = new.lines().collect();
                let script = edit_script(&old, &new);
                diff.additions = script.iter().filter(|(op, _)| *op == LineOp::Add).count();
                diff.deletions = script.iter().filter(|(op, _)| *op == LineOp::Remove).count();
                diff.hunks = hunks(&script, context);
            }
            _ => diff.is_binary = true,
        }
        Some(diff)
    }
}

/// A body as text, or `None` if push would refuse it or a terminal would
/// garble it.
fn as_text(bytes: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(bytes).ok()?;
    (!text.contains('\0')).then_some(text)
}

/// Line edits turning `old` into `new`. Lines shared at both ends are
/// matched directly and only the middle goes through the LCS table, since
/// a topic edit usually touches a few adjacent lines.
fn edit_script<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<(LineOp, &'a str)> {
    let head = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let tail = old[head..]
        .iter()
        .rev()
        .zip(new[head..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let a = &old[head..old.len() - tail];
    let b = &new[head..new.len() - tail];

    // lcs[i][j] is the LCS length of a[i..] and b[j..].
    let mut lcs = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut script: Vec<(LineOp, &str)> =
        old[..head].iter().map(|l| (LineOp::Context, *l)).collect();
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        if i < a.len() && j < b.len() && a[i] == b[j] {
            script.push((LineOp::Context, a[i]));
            i += 1;
            j += 1;
        } else if j == b.len() || (i < a.len() && lcs[i + 1][j] >= lcs[i][j + 1]) {
            script.push((LineOp::Remove, a[i]));
            i += 1;
        } else {
            script.push((LineOp::Add, b[j]));
            j += 1;
        }
    }
    script.extend(old[old.len() - tail..].iter().map(|l| (LineOp::Context, *l)));
    script
}

/// Cut the script into hunks of changes plus `context` lines either side.
/// Hunks whose context would touch are merged.
fn hunks(script: &[(LineOp, &str)], context: usize) -> Vec<DiffHunk> {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for (i, (op, _)) in script.iter().enumerate() {
        if *op == LineOp::Context {
            continue;
        }
        let lo = i.saturating_sub(context);
        let hi = (i + context + 1).min(script.len());
        match spans.last_mut() {
            Some(span) if lo <= span.1 => span.1 = hi,
            _ => spans.push((lo, hi)),
        }
    }

    // Line number in each copy at every script position.
    let mut at = Vec::with_capacity(script.len());
    let (mut old_line, mut new_line) = (1, 1);
    for (op, _) in script {
        at.push((old_line, new_line));
        match op {
            LineOp::Context => {
                old_line += 1;
                new_line += 1;
            }
            LineOp::Remove => old_line += 1,
            LineOp::Add => new_line += 1,
        }
    }

    let start = |line: usize, count: usize| if count == 0 { line - 1 } else { line };
    spans
        .into_iter()
        .map(|(lo, hi)| {
            let slice = &script[lo..hi];
            let old_count = slice.iter().filter(|(op, _)| *op != LineOp::Add).count();
            let new_count = slice.iter().filter(|(op, _)| *op != LineOp::Remove).count();
            DiffHunk {
                old_start: start(at[lo].0, old_count),
                old_count,
                new_start: start(at[lo].1, new_count),
                new_count,
                lines: slice
                    .iter()
                    .map(|(op, line)| DiffLine {
                        op: *op,
                        content: line.to_string(),
                    })
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(hunk: &DiffHunk) -> String {
        hunk.lines
            .iter()
            .map(|l| match l.op {
                LineOp::Add => '+',
                LineOp::Remove => '-',
                LineOp::Context => ' ',
            })
            .collect()
    }

    fn numbered(lines: std::ops::RangeInclusive<u32>) -> String {
        lines.map(|n| format!("item {n}\n")).collect()
    }

    #[test]
    fn test_identical_copies_have_no_diff() {
        assert!(TopicDiff::compute("todo", b"milk\n", b"milk\n", 3).is_none());
        assert!(TopicDiff::compute("todo", b"", b"", 3).is_none());
    }

    #[test]
    fn test_appended_item() {
        let diff = TopicDiff::compute("groceries", b"milk\n", b"milk\neggs\nbread\n", 3).unwrap();
        assert_eq!((diff.additions, diff.deletions), (2, 0));
        assert_eq!(diff.hunks.len(), 1);
        let hunk = &diff.hunks[0];
        assert_eq!(ops(hunk), " ++");
        assert_eq!((hunk.old_start, hunk.old_count), (1, 1));
        assert_eq!((hunk.new_start, hunk.new_count), (1, 3));
        assert_eq!(hunk.lines[2].content, "bread");
    }

    #[test]
    fn test_replaced_line_removes_then_adds() {
        let diff = TopicDiff::compute("t", b"a\nb\nc\n", b"a\nB\nc\n", 3).unwrap();
        assert_eq!(ops(&diff.hunks[0]), " -+ ");
        assert_eq!(diff.hunks[0].lines[1].content, "b");
        assert_eq!(diff.hunks[0].lines[2].content, "B");
    }

    #[test]
    fn test_distant_edits_split_and_near_edits_merge() {
        let old = numbered(1..=10);
        let new = old.replace("item 2\n", "item two\n").replace("item 9\n", "item nine\n");

        let split = TopicDiff::compute("list", old.as_bytes(), new.as_bytes(), 1).unwrap();
        assert_eq!(split.hunks.len(), 2);
        assert_eq!(ops(&split.hunks[0]), " -+ ");
        assert_eq!((split.hunks[1].old_start, split.hunks[1].new_start), (8, 8));
        assert_eq!((split.additions, split.deletions), (2, 2));

        let merged = TopicDiff::compute("list", old.as_bytes(), new.as_bytes(), 3).unwrap();
        assert_eq!(merged.hunks.len(), 1);
        assert_eq!(merged.hunks[0].old_count, 10);
    }

    #[test]
    fn test_emptied_and_new_topics() {
        let emptied = TopicDiff::compute("old", b"one\ntwo\n", b"", 3).unwrap();
        let hunk = &emptied.hunks[0];
        assert_eq!(ops(hunk), "--");
        assert_eq!((hunk.old_start, hunk.old_count), (1, 2));
        assert_eq!((hunk.new_start, hunk.new_count), (0, 0));

        let fresh = TopicDiff::compute("new", b"", b"first\n", 3).unwrap();
        assert_eq!((fresh.hunks[0].old_start, fresh.hunks[0].old_count), (0, 0));
        assert_eq!(fresh.additions, 1);
    }

    #[test]
    fn test_non_text_copies_are_binary() {
        let latin1 = TopicDiff::compute("menu", b"", b"caf\xe9", 3).unwrap();
        assert!(latin1.is_binary);
        assert!(latin1.hunks.is_empty());

        let nul = TopicDiff::compute("blob", b"a\x00b", b"a", 3).unwrap();
        assert!(nul.is_binary);
    }

    #[test]
    fn test_trailing_newline_only_has_no_hunks() {
        let diff = TopicDiff::compute("t", b"a", b"a\n", 3).unwrap();
        assert!(!diff.is_binary);
        assert!(diff.hunks.is_empty());
    }
}
