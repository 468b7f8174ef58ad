//! Tree and line diffing.
//!
//! Two trees are walked in lock-step: a merge-join over each level's
//! name-sorted entry lists (git's tree order, directory names compared with
//! a trailing slash), descending only into sub-trees whose ids differ.
//! Content-identical blobs moving between paths are reported as renames;
//! partial-similarity rename scoring is deliberately not attempted. Line
//! diffs are Myers via `similar`, with git-style unified hunks.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use similar::{ChangeTag, TextDiff};

use crate::error::Result;
use crate::git::store::{Commit, EntryKind, ObjectId, ObjectStore, TreeEntry};
use crate::git::tree::project;

/// How many unchanged lines surround each hunk.
#[derive(Debug, Clone, Copy)]
pub struct DiffOptions {
    pub context: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self { context: 3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Removed,
    Modified,
    Renamed,
}

impl ChangeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeStatus::Added => "added",
            ChangeStatus::Removed => "removed",
            ChangeStatus::Modified => "modified",
            ChangeStatus::Renamed => "renamed",
        }
    }
}

/// One changed path between two tree snapshots.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub status: ChangeStatus,
    /// Current path; for removals, the path that went away.
    pub path: String,
    pub previous_path: Option<String>,
    pub old_id: Option<ObjectId>,
    pub new_id: Option<ObjectId>,
    pub old_mode: Option<u32>,
    pub new_mode: Option<u32>,
    pub additions: usize,
    pub deletions: usize,
    pub binary: bool,
    pub patch: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffTotals {
    pub additions: usize,
    pub deletions: usize,
}

pub fn totals(changes: &[FileChange]) -> DiffTotals {
    let mut t = DiffTotals::default();
    for change in changes {
        t.additions += change.additions;
        t.deletions += change.deletions;
    }
    t
}

/// Diff a commit against its first parent, or against the empty tree for a
/// root commit.
pub fn diff_commit(
    store: &dyn ObjectStore,
    commit: &Commit,
    opts: &DiffOptions,
) -> Result<Vec<FileChange>> {
    let parent_tree = match commit.parents.first() {
        Some(parent) => Some(store.commit(parent)?.tree),
        None => None,
    };
    diff_trees(store, parent_tree.as_ref(), Some(&commit.tree), opts)
}

/// Diff two tree snapshots; `None` stands for the empty tree.
pub fn diff_trees(
    store: &dyn ObjectStore,
    old: Option<&ObjectId>,
    new: Option<&ObjectId>,
    opts: &DiffOptions,
) -> Result<Vec<FileChange>> {
    let raw = collect_changes(store, old, new)?;
    let raw = pair_renames(raw);
    let mut changes = Vec::with_capacity(raw.len());
    for change in raw {
        changes.push(build_change(store, change, opts)?);
    }
    changes.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(changes)
}

#[derive(Debug, Clone)]
struct ChangeSide {
    id: ObjectId,
    mode: u32,
    kind: EntryKind,
}

impl From<&TreeEntry> for ChangeSide {
    fn from(entry: &TreeEntry) -> Self {
        Self {
            id: entry.id.clone(),
            mode: entry.mode,
            kind: entry.kind,
        }
    }
}

#[derive(Debug)]
struct RawChange {
    path: String,
    previous_path: Option<String>,
    old: Option<ChangeSide>,
    new: Option<ChangeSide>,
}

/// git sorts tree entries as if directory names ended in `/`; both inputs
/// come sorted that way, so the merge-join compares with the same key.
fn tree_order(a: &TreeEntry, b: &TreeEntry) -> Ordering {
    let key = |e: &TreeEntry| {
        let mut k = e.name.clone().into_bytes();
        if e.kind == EntryKind::Tree {
            k.push(b'/');
        }
        k
    };
    key(a).cmp(&key(b))
}

fn collect_changes(
    store: &dyn ObjectStore,
    old: Option<&ObjectId>,
    new: Option<&ObjectId>,
) -> Result<Vec<RawChange>> {
    if old == new {
        return Ok(Vec::new());
    }
    let old_entries = match old {
        Some(id) => store.tree(id)?.entries,
        None => Vec::new(),
    };
    let new_entries = match new {
        Some(id) => store.tree(id)?.entries,
        None => Vec::new(),
    };

    enum Step {
        OldOnly(String, TreeEntry),
        NewOnly(String, TreeEntry),
        Pair(String, TreeEntry, TreeEntry),
    }

    let mut out = Vec::new();
    let mut stack: Vec<(String, VecDeque<TreeEntry>, VecDeque<TreeEntry>)> = vec![(
        String::new(),
        VecDeque::from(old_entries),
        VecDeque::from(new_entries),
    )];
    loop {
        let step = {
            let Some((prefix, olds, news)) = stack.last_mut() else {
                break;
            };
            // Read-only peek first so the pops below don't fight the borrow
            // held by the front references.
            let order = match (olds.front(), news.front()) {
                (None, None) => None,
                (Some(_), None) => Some(Ordering::Less),
                (None, Some(_)) => Some(Ordering::Greater),
                (Some(o), Some(n)) => Some(tree_order(o, n)),
            };
            let joined = |prefix: &str, name: &str| {
                if prefix.is_empty() {
                    name.to_string()
                } else {
                    format!("{}/{}", prefix, name)
                }
            };
            match order {
                None => {
                    stack.pop();
                    continue;
                }
                Some(Ordering::Less) => {
                    let e = olds.pop_front().expect("front checked");
                    Step::OldOnly(joined(prefix, &e.name), e)
                }
                Some(Ordering::Greater) => {
                    let e = news.pop_front().expect("front checked");
                    Step::NewOnly(joined(prefix, &e.name), e)
                }
                Some(Ordering::Equal) => {
                    let o = olds.pop_front().expect("front checked");
                    let n = news.pop_front().expect("front checked");
                    let path = joined(prefix, &o.name);
                    Step::Pair(path, o, n)
                }
            }
        };
        match step {
            Step::OldOnly(path, entry) => expand_side(store, &mut out, path, entry, true)?,
            Step::NewOnly(path, entry) => expand_side(store, &mut out, path, entry, false)?,
            Step::Pair(path, o, n) => {
                if o.id == n.id && o.mode == n.mode {
                    continue;
                }
                match (o.kind, n.kind) {
                    (EntryKind::Tree, EntryKind::Tree) => {
                        if o.id != n.id {
                            let old_sub = store.tree(&o.id)?.entries;
                            let new_sub = store.tree(&n.id)?.entries;
                            stack.push((path, VecDeque::from(old_sub), VecDeque::from(new_sub)));
                        }
                    }
                    (EntryKind::Tree, _) => {
                        expand_side(store, &mut out, path.clone(), o, true)?;
                        expand_side(store, &mut out, path, n, false)?;
                    }
                    (_, EntryKind::Tree) => {
                        expand_side(store, &mut out, path.clone(), o, true)?;
                        expand_side(store, &mut out, path, n, false)?;
                    }
                    _ => out.push(RawChange {
                        path,
                        previous_path: None,
                        old: Some(ChangeSide::from(&o)),
                        new: Some(ChangeSide::from(&n)),
                    }),
                }
            }
        }
    }
    Ok(out)
}

/// Record a one-sided entry; sub-trees expand to their leaf contents.
fn expand_side(
    store: &dyn ObjectStore,
    out: &mut Vec<RawChange>,
    path: String,
    entry: TreeEntry,
    removed: bool,
) -> Result<()> {
    let mut push = |path: String, side: ChangeSide| {
        out.push(if removed {
            RawChange {
                path,
                previous_path: None,
                old: Some(side),
                new: None,
            }
        } else {
            RawChange {
                path,
                previous_path: None,
                old: None,
                new: Some(side),
            }
        });
    };
    match entry.kind {
        EntryKind::Tree => {
            for leaf in project(store, &entry.id, true)? {
                if leaf.kind == EntryKind::Tree {
                    continue;
                }
                let leaf_side = ChangeSide {
                    id: leaf.id,
                    mode: leaf.mode,
                    kind: leaf.kind,
                };
                push(format!("{}/{}", path, leaf.path), leaf_side);
            }
        }
        _ => push(path, ChangeSide::from(&entry)),
    }
    Ok(())
}

/// Pair content-identical removed and added blobs into renames. Additions
/// claim candidates in path order, so the pairing is deterministic.
fn pair_renames(raw: Vec<RawChange>) -> Vec<RawChange> {
    let mut removed_by_id: HashMap<ObjectId, VecDeque<usize>> = HashMap::new();
    for (idx, change) in raw.iter().enumerate() {
        if change.new.is_none() {
            if let Some(old) = &change.old {
                if old.kind == EntryKind::Blob {
                    removed_by_id.entry(old.id.clone()).or_default().push_back(idx);
                }
            }
        }
    }

    let mut consumed: Vec<bool> = vec![false; raw.len()];
    let mut renames: HashMap<usize, String> = HashMap::new();
    for (idx, change) in raw.iter().enumerate() {
        if change.old.is_some() {
            continue;
        }
        let Some(new) = &change.new else { continue };
        if new.kind != EntryKind::Blob {
            continue;
        }
        if let Some(candidates) = removed_by_id.get_mut(&new.id) {
            if let Some(removed_idx) = candidates.pop_front() {
                consumed[removed_idx] = true;
                renames.insert(idx, raw[removed_idx].path.clone());
            }
        }
    }

    raw.into_iter()
        .enumerate()
        .filter(|(idx, _)| !consumed[*idx])
        .map(|(idx, mut change)| {
            if let Some(from) = renames.remove(&idx) {
                change.previous_path = Some(from);
            }
            change
        })
        .collect()
}

fn build_change(
    store: &dyn ObjectStore,
    raw: RawChange,
    opts: &DiffOptions,
) -> Result<FileChange> {
    let status = if raw.previous_path.is_some() {
        ChangeStatus::Renamed
    } else {
        match (&raw.old, &raw.new) {
            (None, Some(_)) => ChangeStatus::Added,
            (Some(_), None) => ChangeStatus::Removed,
            _ => ChangeStatus::Modified,
        }
    };

    let mut change = FileChange {
        status,
        path: raw.path,
        previous_path: raw.previous_path,
        old_id: raw.old.as_ref().map(|s| s.id.clone()),
        new_id: raw.new.as_ref().map(|s| s.id.clone()),
        old_mode: raw.old.as_ref().map(|s| s.mode),
        new_mode: raw.new.as_ref().map(|s| s.mode),
        additions: 0,
        deletions: 0,
        binary: false,
        patch: None,
    };

    // Renames pair identical content; submodules have no line content.
    let blob_sides = raw.old.iter().chain(raw.new.iter()).all(|s| s.kind == EntryKind::Blob);
    if status == ChangeStatus::Renamed || !blob_sides {
        return Ok(change);
    }

    let old_content = match &raw.old {
        Some(side) => store.blob(&side.id)?.content,
        None => Vec::new(),
    };
    let new_content = match &raw.new {
        Some(side) => store.blob(&side.id)?.content,
        None => Vec::new(),
    };
    if is_binary(&old_content) || is_binary(&new_content) {
        change.binary = true;
        return Ok(change);
    }

    let old_text = String::from_utf8_lossy(&old_content);
    let new_text = String::from_utf8_lossy(&new_content);
    let line_diff = diff_lines(&old_text, &new_text, opts.context);
    change.additions = line_diff.additions;
    change.deletions = line_diff.deletions;
    change.patch = line_diff.patch;
    Ok(change)
}

/// NUL byte in the leading window, git's binary-detection heuristic.
pub fn is_binary(data: &[u8]) -> bool {
    data.iter().take(8000).any(|&b| b == 0)
}

pub struct LineDiff {
    pub patch: Option<String>,
    pub additions: usize,
    pub deletions: usize,
}

/// Myers alignment of two texts into git-style unified hunks. `patch` is
/// `None` when the texts are identical.
pub fn diff_lines(old: &str, new: &str, context: usize) -> LineDiff {
    let diff = TextDiff::from_lines(old, new);

    let mut additions = 0;
    let mut deletions = 0;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => additions += 1,
            ChangeTag::Delete => deletions += 1,
            ChangeTag::Equal => {}
        }
    }

    let groups = diff.grouped_ops(context);
    if groups.is_empty() {
        return LineDiff {
            patch: None,
            additions,
            deletions,
        };
    }

    let mut patch = String::new();
    for group in &groups {
        let old_start = group.first().map(|op| op.old_range().start).unwrap_or(0);
        let old_end = group.last().map(|op| op.old_range().end).unwrap_or(0);
        let new_start = group.first().map(|op| op.new_range().start).unwrap_or(0);
        let new_end = group.last().map(|op| op.new_range().end).unwrap_or(0);
        patch.push_str(&format!(
            "@@ -{} +{} @@\n",
            hunk_range(old_start, old_end - old_start),
            hunk_range(new_start, new_end - new_start),
        ));
        for op in group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Equal => ' ',
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                };
                patch.push(sign);
                let value = change.value();
                patch.push_str(value);
                if !value.ends_with('\n') {
                    patch.push_str("\n\\ No newline at end of file\n");
                }
            }
        }
    }
    LineDiff {
        patch: Some(patch),
        additions,
        deletions,
    }
}

/// One side of a `@@` header: 1-based start, length elided when 1, start
/// left 0-based when the range is empty (git's convention).
fn hunk_range(start: usize, len: usize) -> String {
    let display_start = if len == 0 { start } else { start + 1 };
    if len == 1 {
        display_start.to_string()
    } else {
        format!("{},{}", display_start, len)
    }
}

/// Full multi-file patch text for the `.diff` endpoints.
pub fn render_patch_document(changes: &[FileChange]) -> String {
    let mut out = String::new();
    for change in changes {
        let old_path = change.previous_path.as_deref().unwrap_or(&change.path);
        let new_path = &change.path;
        out.push_str(&format!("diff --git a/{} b/{}\n", old_path, new_path));
        match change.status {
            ChangeStatus::Added => {
                out.push_str(&format!("new file mode {:06o}\n", change.new_mode.unwrap_or(0o100644)));
            }
            ChangeStatus::Removed => {
                out.push_str(&format!(
                    "deleted file mode {:06o}\n",
                    change.old_mode.unwrap_or(0o100644)
                ));
            }
            ChangeStatus::Renamed => {
                out.push_str("similarity index 100%\n");
                out.push_str(&format!("rename from {}\n", old_path));
                out.push_str(&format!("rename to {}\n", new_path));
            }
            ChangeStatus::Modified => {}
        }
        let old_short = change.old_id.as_ref().map(|id| id.short()).unwrap_or("0000000");
        let new_short = change.new_id.as_ref().map(|id| id.short()).unwrap_or("0000000");
        if change.status == ChangeStatus::Modified && change.old_mode == change.new_mode {
            out.push_str(&format!(
                "index {}..{} {:06o}\n",
                old_short,
                new_short,
                change.new_mode.unwrap_or(0o100644)
            ));
        } else if change.status != ChangeStatus::Renamed {
            out.push_str(&format!("index {}..{}\n", old_short, new_short));
        }
        if change.binary {
            out.push_str(&format!("Binary files a/{} and b/{} differ\n", old_path, new_path));
            continue;
        }
        if let Some(patch) = &change.patch {
            let a = if change.old_id.is_some() {
                format!("a/{}", old_path)
            } else {
                "/dev/null".to_string()
            };
            let b = if change.new_id.is_some() {
                format!("b/{}", new_path)
            } else {
                "/dev/null".to_string()
            };
            out.push_str(&format!("--- {}\n+++ {}\n", a, b));
            out.push_str(patch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::memory::MemoryStore;

    fn opts() -> DiffOptions {
        DiffOptions::default()
    }

    #[test]
    fn identical_revisions_have_no_changes() {
        let mut store = MemoryStore::new();
        let tree = store.tree_of(&[("f.txt", "a\n"), ("dir/g.txt", "b\n")]);
        let changes = diff_trees(&store, Some(&tree), Some(&tree), &opts()).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn root_commit_diffs_against_empty_tree() {
        let mut store = MemoryStore::new();
        let tree = store.tree_of(&[("f.txt", "a\n")]);
        let commit = store.add_commit(tree, vec![], ("ann", "ann@example.com"), 100, "init");
        let commit = store.commit_obj(&commit);

        let changes = diff_commit(&store, &commit, &opts()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].status, ChangeStatus::Added);
        assert_eq!(changes[0].path, "f.txt");
        assert_eq!(changes[0].additions, 1);
        assert_eq!(changes[0].patch.as_deref(), Some("@@ -0,0 +1 @@\n+a\n"));
    }

    #[test]
    fn modified_file_diffs_against_first_parent() {
        let mut store = MemoryStore::new();
        let t1 = store.tree_of(&[("f.txt", "a\n")]);
        let t2 = store.tree_of(&[("f.txt", "a\nb\n")]);
        let c1 = store.add_commit(t1, vec![], ("ann", "ann@example.com"), 100, "one");
        let c2 = store.add_commit(t2, vec![c1], ("ann", "ann@example.com"), 200, "two");
        let c2 = store.commit_obj(&c2);

        let changes = diff_commit(&store, &c2, &opts()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].status, ChangeStatus::Modified);
        assert_eq!((changes[0].additions, changes[0].deletions), (1, 0));
        assert_eq!(changes[0].patch.as_deref(), Some("@@ -1 +1,2 @@\n a\n+b\n"));
    }

    #[test]
    fn added_and_removed_paths_are_classified() {
        let mut store = MemoryStore::new();
        let old = store.tree_of(&[("gone.txt", "x\n"), ("kept.txt", "k\n")]);
        let new = store.tree_of(&[("kept.txt", "k\n"), ("new.txt", "y\n")]);

        let changes = diff_trees(&store, Some(&old), Some(&new), &opts()).unwrap();
        let summary: Vec<(&str, ChangeStatus)> = changes
            .iter()
            .map(|c| (c.path.as_str(), c.status))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("gone.txt", ChangeStatus::Removed),
                ("new.txt", ChangeStatus::Added),
            ]
        );
    }

    #[test]
    fn content_identical_move_is_a_rename() {
        let mut store = MemoryStore::new();
        let old = store.tree_of(&[("old/name.txt", "same content\n")]);
        let new = store.tree_of(&[("new/name.txt", "same content\n")]);

        let changes = diff_trees(&store, Some(&old), Some(&new), &opts()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].status, ChangeStatus::Renamed);
        assert_eq!(changes[0].path, "new/name.txt");
        assert_eq!(changes[0].previous_path.as_deref(), Some("old/name.txt"));
        assert_eq!((changes[0].additions, changes[0].deletions), (0, 0));
        assert!(changes[0].patch.is_none());
    }

    #[test]
    fn edited_move_stays_a_remove_add_pair() {
        let mut store = MemoryStore::new();
        let old = store.tree_of(&[("old.txt", "one\n")]);
        let new = store.tree_of(&[("new.txt", "one changed\n")]);

        let changes = diff_trees(&store, Some(&old), Some(&new), &opts()).unwrap();
        let statuses: Vec<ChangeStatus> = changes.iter().map(|c| c.status).collect();
        assert_eq!(statuses, vec![ChangeStatus::Added, ChangeStatus::Removed]);
    }

    #[test]
    fn binary_blobs_have_no_patch_body() {
        let mut store = MemoryStore::new();
        let old = store.tree_of_bytes(&[("blob.bin", b"\x00\x01\x02".as_slice())]);
        let new = store.tree_of_bytes(&[("blob.bin", b"\x00\x01\x03".as_slice())]);

        let changes = diff_trees(&store, Some(&old), Some(&new), &opts()).unwrap();
        assert_eq!(changes.len(), 1);
        assert!(changes[0].binary);
        assert!(changes[0].patch.is_none());
        assert_eq!((changes[0].additions, changes[0].deletions), (0, 0));
    }

    #[test]
    fn zero_context_compare_shows_only_changed_lines() {
        let mut store = MemoryStore::new();
        let old = store.tree_of(&[("f.txt", "a\n")]);
        let new = store.tree_of(&[("f.txt", "a\nb\nc\n")]);

        let changes =
            diff_trees(&store, Some(&old), Some(&new), &DiffOptions { context: 0 }).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].additions, 2);
        assert_eq!(changes[0].patch.as_deref(), Some("@@ -1,0 +2,2 @@\n+b\n+c\n"));
    }

    #[test]
    fn missing_trailing_newline_is_marked_on_both_sides() {
        let diff = diff_lines("a", "a\nb\n", 3);
        let patch = diff.patch.unwrap();
        assert!(patch.contains("\\ No newline at end of file"));
        assert!(patch.ends_with("+b\n"));
    }

    #[test]
    fn patch_document_carries_file_headers() {
        let mut store = MemoryStore::new();
        let old = store.tree_of(&[("f.txt", "a\n")]);
        let new = store.tree_of(&[("f.txt", "b\n")]);

        let changes = diff_trees(&store, Some(&old), Some(&new), &opts()).unwrap();
        let doc = render_patch_document(&changes);
        assert!(doc.starts_with("diff --git a/f.txt b/f.txt\n"));
        assert!(doc.contains("--- a/f.txt\n+++ b/f.txt\n"));
        assert!(doc.contains("@@ -1 +1 @@\n-a\n+b\n"));
    }
}
