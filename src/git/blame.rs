//! Line-level blame.
//!
//! Walks first-parent history backward from the target revision carrying a
//! mutable position map {output line → line index in the commit currently
//! inspected}. At each commit the parent→commit line diff decides each
//! still-unresolved line's fate: lines inside inserted or replaced regions
//! resolve to that commit, lines inside equal regions remap to the parent's
//! numbering and stay open. A store failure mid-walk yields what was
//! gathered so far with `complete` unset, since partial attribution is
//! still useful to a caller inspecting a file.

use std::collections::HashMap;

use similar::{DiffOp, TextDiff};

use crate::error::{ApiError, Result};
use crate::git::history::HistoryWalk;
use crate::git::store::{Commit, ObjectId, ObjectStore};
use crate::git::tree::blob_at_path;

#[derive(Debug, Clone)]
pub struct BlameLine {
    /// 1-based line number in the file at the target revision.
    pub line_number: usize,
    /// Attributing commit; `None` only when the walk ended incomplete.
    pub commit: Option<ObjectId>,
    pub text: String,
}

#[derive(Debug)]
pub struct BlameOutcome {
    pub lines: Vec<BlameLine>,
    /// Metadata for every commit referenced by `lines`, deduplicated.
    pub commits: HashMap<ObjectId, Commit>,
    pub complete: bool,
}

/// Attribute each line of `path` at the commit `target` to the commit that
/// introduced it. `first_line`/`last_line` bound the output, 1-based and
/// inclusive, each defaulting to the file's edge; `oldest` bounds the walk,
/// absorbing attribution for anything older.
pub fn blame(
    store: &dyn ObjectStore,
    target: &ObjectId,
    path: &str,
    first_line: Option<usize>,
    last_line: Option<usize>,
    oldest: Option<ObjectId>,
) -> Result<BlameOutcome> {
    let target_commit = store.commit(target)?;
    let blob = blob_at_path(store, &target_commit.tree, path)?
        .ok_or_else(|| ApiError::NotFound(format!("path {} at {}", path, target)))?;
    let text = String::from_utf8_lossy(&blob.content).into_owned();
    let lines = split_lines(&text);

    let first = first_line.unwrap_or(1);
    let last = last_line.unwrap_or(lines.len());
    if first_line.is_some() || last_line.is_some() {
        if first < 1 || last < first {
            return Err(ApiError::InvalidArgument(format!("line range {}-{}", first, last)));
        }
        if last > lines.len() {
            return Err(ApiError::InvalidArgument(format!(
                "line range {}-{} exceeds {} lines",
                first,
                last,
                lines.len()
            )));
        }
    }
    let count = if last < first { 0 } else { last + 1 - first };

    let mut attribution: Vec<Option<ObjectId>> = vec![None; count];
    // Output line → 0-based position in the version currently inspected.
    let mut positions: HashMap<usize, usize> = (0..count).map(|i| (i, first - 1 + i)).collect();
    let mut commits: HashMap<ObjectId, Commit> = HashMap::new();
    let mut complete = true;

    let mut current_text = text;
    let mut walk = HistoryWalk::new(store, &target_commit.id)?
        .first_parent(true)
        .stop_at(oldest.clone());

    while !positions.is_empty() {
        let commit = match walk.next() {
            None => break,
            Some(Ok(c)) => c,
            Some(Err(_)) => {
                complete = false;
                break;
            }
        };

        let parent_version: Option<String> = match commit.parents.first() {
            None => None,
            Some(parent_id) => {
                let parent = match store.commit(parent_id) {
                    Ok(p) => p,
                    Err(_) => {
                        complete = false;
                        break;
                    }
                };
                match blob_at_path(store, &parent.tree, path) {
                    Ok(Some(b)) => Some(String::from_utf8_lossy(&b.content).into_owned()),
                    Ok(None) => None,
                    Err(_) => {
                        complete = false;
                        break;
                    }
                }
            }
        };

        match parent_version {
            None => {
                // The file begins at this commit, which therefore owns every
                // line still unresolved.
                for (out_idx, _) in positions.drain() {
                    attribution[out_idx] = Some(commit.id.clone());
                }
                commits.insert(commit.id.clone(), commit);
                break;
            }
            Some(parent_text) => {
                let diff = TextDiff::from_lines(&parent_text, &current_text);
                let ops = diff.ops().to_vec();
                let mut remaining = HashMap::with_capacity(positions.len());
                let mut resolved_any = false;
                for (out_idx, pos) in positions.drain() {
                    match parent_position(&ops, pos) {
                        Some(parent_pos) => {
                            remaining.insert(out_idx, parent_pos);
                        }
                        None => {
                            attribution[out_idx] = Some(commit.id.clone());
                            resolved_any = true;
                        }
                    }
                }
                positions = remaining;
                if resolved_any {
                    commits.insert(commit.id.clone(), commit);
                }
                current_text = parent_text;
            }
        }
    }

    if !positions.is_empty() && complete {
        match &oldest {
            Some(bound) => {
                // The walk stopped at the lower bound; the bound owns
                // whatever is left.
                for (out_idx, _) in positions.drain() {
                    attribution[out_idx] = Some(bound.clone());
                }
                if !commits.contains_key(bound) {
                    commits.insert(bound.clone(), store.commit(bound)?);
                }
            }
            None => complete = false,
        }
    }

    let lines = attribution
        .into_iter()
        .enumerate()
        .map(|(i, commit)| BlameLine {
            line_number: first + i,
            commit,
            text: lines[first - 1 + i].clone(),
        })
        .collect();
    Ok(BlameOutcome {
        lines,
        commits,
        complete,
    })
}

/// Where line `pos` of the new side sits in the old side, or `None` when
/// the commit being inspected introduced or rewrote it.
fn parent_position(ops: &[DiffOp], pos: usize) -> Option<usize> {
    for op in ops {
        match *op {
            DiffOp::Equal {
                old_index,
                new_index,
                len,
            } => {
                if pos >= new_index && pos < new_index + len {
                    return Some(old_index + (pos - new_index));
                }
            }
            DiffOp::Insert {
                new_index, new_len, ..
            }
            | DiffOp::Replace {
                new_index, new_len, ..
            } => {
                if pos >= new_index && pos < new_index + new_len {
                    return None;
                }
            }
            DiffOp::Delete { .. } => {}
        }
    }
    None
}

fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<String> = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
        .collect();
    if text.ends_with('\n') {
        lines.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::memory::MemoryStore;

    fn attributed(outcome: &BlameOutcome) -> Vec<(usize, ObjectId)> {
        outcome
            .lines
            .iter()
            .map(|l| (l.line_number, l.commit.clone().expect("attributed")))
            .collect()
    }

    #[test]
    fn modified_middle_line_blames_to_child() {
        let mut store = MemoryStore::new();
        let t1 = store.tree_of(&[("f.txt", "one\ntwo\nthree\n")]);
        let t2 = store.tree_of(&[("f.txt", "one\ntwo changed\nthree\n")]);
        let k1 = store.add_commit(t1, vec![], ("ann", "ann@example.com"), 100, "k1");
        let k2 = store.add_commit(t2, vec![k1.clone()], ("ben", "ben@example.com"), 200, "k2");

        let outcome = blame(&store, &k2, "f.txt", None, None, None).unwrap();
        assert!(outcome.complete);
        assert_eq!(
            attributed(&outcome),
            vec![(1, k1.clone()), (2, k2.clone()), (3, k1.clone())]
        );
        assert_eq!(outcome.lines[1].text, "two changed");
        assert_eq!(outcome.commits.len(), 2);
    }

    #[test]
    fn growing_file_blames_each_line_to_its_introducer() {
        let mut store = MemoryStore::new();
        let ta = store.tree_of(&[("f.txt", "a\n")]);
        let tb = store.tree_of(&[("f.txt", "a\nb\n")]);
        let tc = store.tree_of(&[("f.txt", "a\nb\nc\n")]);
        let a = store.add_commit(ta, vec![], ("ann", "ann@example.com"), 100, "a");
        let b = store.add_commit(tb, vec![a.clone()], ("ann", "ann@example.com"), 200, "b");
        let c = store.add_commit(tc, vec![b.clone()], ("ann", "ann@example.com"), 300, "c");

        let outcome = blame(&store, &c, "f.txt", None, None, None).unwrap();
        assert_eq!(attributed(&outcome), vec![(1, a), (2, b), (3, c)]);
    }

    #[test]
    fn range_restricts_output_to_requested_lines() {
        let mut store = MemoryStore::new();
        let ta = store.tree_of(&[("f.txt", "a\n")]);
        let tb = store.tree_of(&[("f.txt", "a\nb\n")]);
        let tc = store.tree_of(&[("f.txt", "a\nb\nc\n")]);
        let a = store.add_commit(ta, vec![], ("ann", "ann@example.com"), 100, "a");
        let b = store.add_commit(tb, vec![a], ("ann", "ann@example.com"), 200, "b");
        let c = store.add_commit(tc, vec![b.clone()], ("ann", "ann@example.com"), 300, "c");

        let outcome = blame(&store, &c, "f.txt", Some(2), Some(2), None).unwrap();
        assert_eq!(attributed(&outcome), vec![(2, b)]);
    }

    #[test]
    fn oldest_bound_absorbs_older_attribution() {
        let mut store = MemoryStore::new();
        let ta = store.tree_of(&[("f.txt", "a\n")]);
        let tb = store.tree_of(&[("f.txt", "a\nb\n")]);
        let tc = store.tree_of(&[("f.txt", "a\nb\nc\n")]);
        let a = store.add_commit(ta, vec![], ("ann", "ann@example.com"), 100, "a");
        let b = store.add_commit(tb, vec![a], ("ann", "ann@example.com"), 200, "b");
        let c = store.add_commit(tc, vec![b.clone()], ("ann", "ann@example.com"), 300, "c");

        let outcome = blame(&store, &c, "f.txt", None, None, Some(b.clone())).unwrap();
        // Line 1 predates the bound, so the bound claims it.
        assert_eq!(attributed(&outcome), vec![(1, b.clone()), (2, b), (3, c)]);
        assert!(outcome.complete);
    }

    #[test]
    fn file_created_mid_history_stops_the_walk() {
        let mut store = MemoryStore::new();
        let t1 = store.tree_of(&[("other.txt", "x\n")]);
        let t2 = store.tree_of(&[("other.txt", "x\n"), ("f.txt", "new\n")]);
        let c1 = store.add_commit(t1, vec![], ("ann", "ann@example.com"), 100, "one");
        let c2 = store.add_commit(t2, vec![c1], ("ann", "ann@example.com"), 200, "two");

        let outcome = blame(&store, &c2, "f.txt", None, None, None).unwrap();
        assert_eq!(attributed(&outcome), vec![(1, c2)]);
    }

    #[test]
    fn missing_path_is_not_found() {
        let mut store = MemoryStore::new();
        let tree = store.tree_of(&[("f.txt", "a\n")]);
        let c = store.add_commit(tree, vec![], ("ann", "ann@example.com"), 100, "c");
        assert!(matches!(
            blame(&store, &c, "nope.txt", None, None, None),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn bad_ranges_are_rejected() {
        let mut store = MemoryStore::new();
        let tree = store.tree_of(&[("f.txt", "a\nb\n")]);
        let c = store.add_commit(tree, vec![], ("ann", "ann@example.com"), 100, "c");
        for (first, last) in [(0, 1), (2, 1), (1, 3)] {
            assert!(matches!(
                blame(&store, &c, "f.txt", Some(first), Some(last), None),
                Err(ApiError::InvalidArgument(_))
            ));
        }
    }
}
