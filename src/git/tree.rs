//! Tree projection: direct listings, recursive flattening, path lookup.
//!
//! Recursive mode is pre-order: a sub-tree entry is emitted, then its
//! children with `parent/`-prefixed paths, before the next sibling. The
//! expansion runs over an explicit work-stack so nesting depth never grows
//! the call stack.

use std::collections::VecDeque;

use crate::error::{ApiError, Result};
use crate::git::store::{Blob, EntryKind, ObjectId, ObjectStore, TreeEntry};

/// One projected entry with its path relative to the projection root.
#[derive(Debug, Clone)]
pub struct FlatEntry {
    pub path: String,
    pub name: String,
    pub mode: u32,
    pub kind: EntryKind,
    pub id: ObjectId,
    pub size: Option<u64>,
}

fn flat(entry: TreeEntry, path: String) -> FlatEntry {
    FlatEntry {
        path,
        name: entry.name,
        mode: entry.mode,
        kind: entry.kind,
        id: entry.id,
        size: entry.size,
    }
}

/// Flatten the tree at `root`. Non-recursive mode returns the direct
/// entries unchanged; recursive mode expands every sub-tree in place.
pub fn project(store: &dyn ObjectStore, root: &ObjectId, recursive: bool) -> Result<Vec<FlatEntry>> {
    let tree = store.tree(root)?;
    if !recursive {
        return Ok(tree
            .entries
            .into_iter()
            .map(|e| {
                let path = e.name.clone();
                flat(e, path)
            })
            .collect());
    }

    let mut out = Vec::new();
    let mut stack: Vec<(String, VecDeque<TreeEntry>)> =
        vec![(String::new(), VecDeque::from(tree.entries))];
    loop {
        let (path, entry) = {
            let Some(top) = stack.last_mut() else { break };
            match top.1.pop_front() {
                None => {
                    stack.pop();
                    continue;
                }
                Some(entry) => {
                    let path = if top.0.is_empty() {
                        entry.name.clone()
                    } else {
                        format!("{}/{}", top.0, entry.name)
                    };
                    (path, entry)
                }
            }
        };
        let is_tree = entry.kind == EntryKind::Tree;
        let id = entry.id.clone();
        out.push(flat(entry, path.clone()));
        if is_tree {
            let sub = store.tree(&id)?;
            stack.push((path, VecDeque::from(sub.entries)));
        }
    }
    Ok(out)
}

/// Look up the entry at a slash-separated `path` below the tree at `root`.
/// An empty path (or bare slashes) names the root tree itself, returned as
/// `None`. Trailing slashes on directory paths are tolerated.
pub fn lookup_path(
    store: &dyn ObjectStore,
    root: &ObjectId,
    path: &str,
) -> Result<Option<TreeEntry>> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Ok(None);
    }
    let mut tree = store.tree(root)?;
    for (i, segment) in segments.iter().enumerate() {
        let entry = tree
            .entries
            .iter()
            .find(|e| e.name == *segment)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("path {}", path)))?;
        if i == segments.len() - 1 {
            return Ok(Some(entry));
        }
        if entry.kind != EntryKind::Tree {
            return Err(ApiError::NotFound(format!("path {}", path)));
        }
        tree = store.tree(&entry.id)?;
    }
    unreachable!("loop returns on the last segment")
}

/// Blob content at `path` under the tree at `root`. `Ok(None)` when the
/// path is missing or names a non-blob.
pub fn blob_at_path(
    store: &dyn ObjectStore,
    root: &ObjectId,
    path: &str,
) -> Result<Option<Blob>> {
    match lookup_path(store, root, path) {
        Ok(Some(entry)) if entry.kind == EntryKind::Blob => Ok(Some(store.blob(&entry.id)?)),
        Ok(_) => Ok(None),
        Err(ApiError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::memory::MemoryStore;

    fn sample_tree(store: &mut MemoryStore) -> ObjectId {
        store.tree_of(&[
            ("README.md", "hi\n"),
            ("src/lib.rs", "pub fn x() {}\n"),
            ("src/nested/deep.rs", "// deep\n"),
            ("zz.txt", "tail\n"),
        ])
    }

    #[test]
    fn non_recursive_lists_direct_entries_only() {
        let mut store = MemoryStore::new();
        let root = sample_tree(&mut store);
        let entries = project(&store, &root, false).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(names, vec!["README.md", "src", "zz.txt"]);
    }

    #[test]
    fn recursive_expands_subtrees_in_place() {
        let mut store = MemoryStore::new();
        let root = sample_tree(&mut store);
        let entries = project(&store, &root, true).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "README.md",
                "src",
                "src/lib.rs",
                "src/nested",
                "src/nested/deep.rs",
                "zz.txt",
            ]
        );
    }

    #[test]
    fn recursive_leaves_match_per_subtree_flattening() {
        let mut store = MemoryStore::new();
        let root = sample_tree(&mut store);

        let mut recursive_blobs: Vec<ObjectId> = project(&store, &root, true)
            .unwrap()
            .into_iter()
            .filter(|e| e.kind == EntryKind::Blob)
            .map(|e| e.id)
            .collect();

        // Union of flattening each sub-tree one level at a time.
        let mut collected = Vec::new();
        let mut pending = vec![root];
        while let Some(tree_id) = pending.pop() {
            for entry in project(&store, &tree_id, false).unwrap() {
                match entry.kind {
                    EntryKind::Blob => collected.push(entry.id),
                    EntryKind::Tree => pending.push(entry.id),
                    EntryKind::Submodule => {}
                }
            }
        }

        recursive_blobs.sort();
        collected.sort();
        assert_eq!(recursive_blobs, collected);
    }

    #[test]
    fn lookup_path_descends_nested_trees() {
        let mut store = MemoryStore::new();
        let root = sample_tree(&mut store);
        let entry = lookup_path(&store, &root, "src/nested/deep.rs").unwrap().unwrap();
        assert_eq!(entry.name, "deep.rs");
        assert_eq!(entry.kind, EntryKind::Blob);

        // Trailing slash on a directory is fine.
        let dir = lookup_path(&store, &root, "src/nested/").unwrap().unwrap();
        assert_eq!(dir.kind, EntryKind::Tree);
    }

    #[test]
    fn lookup_of_missing_path_is_not_found() {
        let mut store = MemoryStore::new();
        let root = sample_tree(&mut store);
        assert!(matches!(
            lookup_path(&store, &root, "src/none.rs"),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            lookup_path(&store, &root, "README.md/inside"),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn blob_at_path_reads_content() {
        let mut store = MemoryStore::new();
        let root = sample_tree(&mut store);
        let blob = blob_at_path(&store, &root, "src/lib.rs").unwrap().unwrap();
        assert_eq!(blob.content, b"pub fn x() {}\n");
        assert!(blob_at_path(&store, &root, "src").unwrap().is_none());
    }
}
