//! Commit history traversal.
//!
//! `HistoryWalk` is a lazy reverse-chronological walk over the commit DAG:
//! an explicit frontier heap ordered by commit time (ties broken by id)
//! plus a seen-set, so merge fan-in is visited exactly once and stack depth
//! stays flat no matter how deep the history is. Contributor aggregation
//! and merge-base lookup ride on top of the walk.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::error::Result;
use crate::git::store::{Commit, ObjectId, ObjectStore};

struct FrontierEntry {
    commit: Commit,
}

impl FrontierEntry {
    fn key(&self) -> (i64, &ObjectId) {
        (self.commit.committer.time, &self.commit.id)
    }
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Lazy walk from a start commit toward the roots.
pub struct HistoryWalk<'a> {
    store: &'a dyn ObjectStore,
    frontier: BinaryHeap<FrontierEntry>,
    seen: HashSet<ObjectId>,
    stop_at: Option<ObjectId>,
    first_parent: bool,
}

impl<'a> HistoryWalk<'a> {
    pub fn new(store: &'a dyn ObjectStore, start: &ObjectId) -> Result<Self> {
        let commit = store.commit(start)?;
        let mut seen = HashSet::new();
        seen.insert(commit.id.clone());
        let mut frontier = BinaryHeap::new();
        frontier.push(FrontierEntry { commit });
        Ok(Self {
            store,
            frontier,
            seen,
            stop_at: None,
            first_parent: false,
        })
    }

    /// Lower bound: the walk never traverses past this commit, and the
    /// commit itself is not emitted.
    pub fn stop_at(mut self, bound: Option<ObjectId>) -> Self {
        self.stop_at = bound;
        self
    }

    /// Follow only each merge commit's first parent.
    pub fn first_parent(mut self, yes: bool) -> Self {
        self.first_parent = yes;
        self
    }
}

impl Iterator for HistoryWalk<'_> {
    type Item = Result<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let commit = self.frontier.pop()?.commit;
            if self.stop_at.as_ref() == Some(&commit.id) {
                continue;
            }
            let parents: &[ObjectId] = if self.first_parent {
                commit.parents.get(..1).unwrap_or(&[])
            } else {
                &commit.parents
            };
            for parent in parents {
                if self.seen.insert(parent.clone()) {
                    match self.store.commit(parent) {
                        Ok(c) => self.frontier.push(FrontierEntry { commit: c }),
                        Err(e) => return Some(Err(e)),
                    }
                }
            }
            return Some(Ok(commit));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    pub name: String,
    pub email: String,
    pub commits: usize,
}

/// Count commits per author identity over the whole history reachable from
/// `head`. Identity is the author e-mail, compared case-sensitively; output
/// is descending by count, ties in first-seen order. O(history), no caching.
pub fn contributors(store: &dyn ObjectStore, head: &ObjectId) -> Result<Vec<Contributor>> {
    let mut order: Vec<String> = Vec::new();
    let mut by_email: HashMap<String, (String, usize)> = HashMap::new();
    for commit in HistoryWalk::new(store, head)? {
        let commit = commit?;
        let author = commit.author;
        match by_email.get_mut(&author.email) {
            Some((_, count)) => *count += 1,
            None => {
                order.push(author.email.clone());
                by_email.insert(author.email, (author.name, 1));
            }
        }
    }
    let mut result: Vec<Contributor> = order
        .into_iter()
        .map(|email| {
            let (name, commits) = by_email.remove(&email).expect("seen email");
            Contributor { name, email, commits }
        })
        .collect();
    result.sort_by(|a, b| b.commits.cmp(&a.commits));
    Ok(result)
}

/// Nearest common ancestor of two commits, or `None` when the histories are
/// unrelated. Walk order decides between equally-near candidates.
pub fn merge_base(
    store: &dyn ObjectStore,
    left: &ObjectId,
    right: &ObjectId,
) -> Result<Option<ObjectId>> {
    let mut left_ancestors = HashSet::new();
    for commit in HistoryWalk::new(store, left)? {
        left_ancestors.insert(commit?.id);
    }
    for commit in HistoryWalk::new(store, right)? {
        let commit = commit?;
        if left_ancestors.contains(&commit.id) {
            return Ok(Some(commit.id));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::memory::MemoryStore;

    fn ids(walk: HistoryWalk<'_>) -> Vec<ObjectId> {
        walk.map(|c| c.unwrap().id).collect()
    }

    /// Three-commit chain used by several tests: a <- b <- c.
    fn linear_store() -> (MemoryStore, ObjectId, ObjectId, ObjectId) {
        let mut store = MemoryStore::new();
        let tree = store.tree_of(&[("f.txt", "a\n")]);
        let a = store.add_commit(tree.clone(), vec![], ("ann", "ann@example.com"), 100, "a");
        let b = store.add_commit(tree.clone(), vec![a.clone()], ("ben", "ben@example.com"), 200, "b");
        let c = store.add_commit(tree, vec![b.clone()], ("ann", "ann@example.com"), 300, "c");
        (store, a, b, c)
    }

    #[test]
    fn walk_is_reverse_chronological() {
        let (store, a, b, c) = linear_store();
        let got = ids(HistoryWalk::new(&store, &c).unwrap());
        assert_eq!(got, vec![c, b, a]);
    }

    #[test]
    fn limit_truncates_without_visiting_further() {
        let (store, _, b, c) = linear_store();
        let got: Vec<ObjectId> = HistoryWalk::new(&store, &c)
            .unwrap()
            .take(2)
            .map(|r| r.unwrap().id)
            .collect();
        assert_eq!(got, vec![c, b]);
    }

    #[test]
    fn walk_from_ancestor_is_a_suffix_of_walk_from_descendant() {
        let (store, _, b, c) = linear_store();
        let from_c = ids(HistoryWalk::new(&store, &c).unwrap());
        let from_b = ids(HistoryWalk::new(&store, &b).unwrap());
        assert_eq!(from_c[1..].to_vec(), from_b);
    }

    #[test]
    fn merge_parents_are_visited_exactly_once() {
        let mut store = MemoryStore::new();
        let tree = store.tree_of(&[("f.txt", "a\n")]);
        let root = store.add_commit(tree.clone(), vec![], ("ann", "ann@example.com"), 100, "root");
        let left = store.add_commit(
            tree.clone(),
            vec![root.clone()],
            ("ann", "ann@example.com"),
            200,
            "left",
        );
        let right = store.add_commit(
            tree.clone(),
            vec![root.clone()],
            ("ben", "ben@example.com"),
            250,
            "right",
        );
        let merge = store.add_commit(
            tree,
            vec![left.clone(), right.clone()],
            ("ann", "ann@example.com"),
            300,
            "merge",
        );

        let got = ids(HistoryWalk::new(&store, &merge).unwrap());
        assert_eq!(got, vec![merge, right, left, root]);
    }

    #[test]
    fn stop_at_excludes_bound_and_everything_past_it() {
        let (store, a, b, c) = linear_store();
        let got = ids(HistoryWalk::new(&store, &c).unwrap().stop_at(Some(b)));
        assert_eq!(got, vec![c]);
        let _ = a;
    }

    #[test]
    fn first_parent_skips_merged_in_branches() {
        let mut store = MemoryStore::new();
        let tree = store.tree_of(&[("f.txt", "a\n")]);
        let root = store.add_commit(tree.clone(), vec![], ("ann", "ann@example.com"), 100, "root");
        let side = store.add_commit(
            tree.clone(),
            vec![root.clone()],
            ("ben", "ben@example.com"),
            200,
            "side",
        );
        let merge = store.add_commit(
            tree,
            vec![root.clone(), side],
            ("ann", "ann@example.com"),
            300,
            "merge",
        );

        let got = ids(HistoryWalk::new(&store, &merge).unwrap().first_parent(true));
        assert_eq!(got, vec![merge, root]);
    }

    #[test]
    fn contributor_counts_sum_to_reachable_commits() {
        let (store, _, _, c) = linear_store();
        let contributors = contributors(&store, &c).unwrap();
        let total: usize = contributors.iter().map(|c| c.commits).sum();
        assert_eq!(total, 3);
        assert_eq!(contributors[0].email, "ann@example.com");
        assert_eq!(contributors[0].commits, 2);
    }

    #[test]
    fn contributor_ties_keep_first_seen_order() {
        let mut store = MemoryStore::new();
        let tree = store.tree_of(&[("f.txt", "a\n")]);
        let one = store.add_commit(tree.clone(), vec![], ("ben", "ben@example.com"), 100, "one");
        let two = store.add_commit(tree, vec![one], ("ann", "ann@example.com"), 200, "two");
        let contributors = contributors(&store, &two).unwrap();
        // Walk order is newest-first, so ann is seen before ben.
        assert_eq!(contributors[0].email, "ann@example.com");
        assert_eq!(contributors[1].email, "ben@example.com");
    }

    #[test]
    fn merge_base_of_diverged_branches() {
        let mut store = MemoryStore::new();
        let tree = store.tree_of(&[("f.txt", "a\n")]);
        let root = store.add_commit(tree.clone(), vec![], ("ann", "ann@example.com"), 100, "root");
        let left = store.add_commit(
            tree.clone(),
            vec![root.clone()],
            ("ann", "ann@example.com"),
            200,
            "left",
        );
        let right = store.add_commit(
            tree,
            vec![root.clone()],
            ("ben", "ben@example.com"),
            250,
            "right",
        );

        assert_eq!(merge_base(&store, &left, &right).unwrap(), Some(root));
    }

    #[test]
    fn merge_base_of_unrelated_roots_is_none() {
        let mut store = MemoryStore::new();
        let tree = store.tree_of(&[("f.txt", "a\n")]);
        let one = store.add_commit(tree.clone(), vec![], ("ann", "ann@example.com"), 100, "one");
        let two = store.add_commit(tree, vec![], ("ben", "ben@example.com"), 200, "two");
        assert_eq!(merge_base(&store, &one, &two).unwrap(), None);
    }
}
