//! Revision resolution: branch name, tag name, or (abbreviated) hash to a
//! concrete commit id.
//!
//! Ref matches win over hash interpretation, and branches shadow tags,
//! matching the lookup order GitHub uses.

use crate::error::{ApiError, Result};
use crate::git::store::{ObjectId, ObjectKind, ObjectStore};

/// Resolve a revision specifier to the commit it names. Annotated tags are
/// peeled transitively.
pub fn resolve(store: &dyn ObjectStore, spec: &str) -> Result<ObjectId> {
    if let Some(id) = resolve_ref(store, spec)? {
        return peel_to_commit(store, &id);
    }
    if is_hex_prefix(spec) {
        if let Some(id) = store.resolve_prefix(&spec.to_ascii_lowercase())? {
            return peel_to_commit(store, &id);
        }
    }
    Err(ApiError::NotFound(format!(
        "no such branch, tag, or commit SHA: {}",
        spec
    )))
}

/// Exact ref lookup with the usual shorthand expansions, branches first.
pub fn resolve_ref(store: &dyn ObjectStore, spec: &str) -> Result<Option<ObjectId>> {
    let candidates = [
        spec.to_string(),
        format!("refs/{}", spec),
        format!("refs/heads/{}", spec),
        format!("refs/tags/{}", spec),
    ];
    for name in candidates {
        if let Some(r) = store.find_ref(&name)? {
            return Ok(Some(r.target));
        }
    }
    Ok(None)
}

/// Follow tag chains until a commit is reached.
pub fn peel_to_commit(store: &dyn ObjectStore, id: &ObjectId) -> Result<ObjectId> {
    let mut current = id.clone();
    loop {
        match store.kind(&current)? {
            ObjectKind::Commit => return Ok(current),
            ObjectKind::Tag => current = store.tag(&current)?.target,
            other => {
                return Err(ApiError::NotFound(format!(
                    "{} names a {}, not a commit",
                    current,
                    other.as_str()
                )));
            }
        }
    }
}

/// Resolve any object id down to the tree it describes: commits yield their
/// root tree, tags peel first.
pub fn peel_to_tree(store: &dyn ObjectStore, id: &ObjectId) -> Result<ObjectId> {
    let mut current = id.clone();
    loop {
        match store.kind(&current)? {
            ObjectKind::Tree => return Ok(current),
            ObjectKind::Commit => return Ok(store.commit(&current)?.tree),
            ObjectKind::Tag => current = store.tag(&current)?.target,
            ObjectKind::Blob => {
                return Err(ApiError::NotFound(format!("{} names a blob, not a tree", current)));
            }
        }
    }
}

/// Hash-only lookup used by the plumbing object endpoints; ref names are
/// not consulted.
pub fn resolve_object(store: &dyn ObjectStore, sha: &str) -> Result<ObjectId> {
    if !is_hex_prefix(sha) {
        return Err(ApiError::NotFound(format!("object {}", sha)));
    }
    store
        .resolve_prefix(&sha.to_ascii_lowercase())?
        .ok_or_else(|| ApiError::NotFound(format!("object {}", sha)))
}

fn is_hex_prefix(spec: &str) -> bool {
    !spec.is_empty() && spec.len() <= 40 && spec.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::memory::MemoryStore;

    #[test]
    fn branch_name_resolves_to_head_commit() {
        let mut store = MemoryStore::new();
        let tree = store.tree_of(&[("f.txt", "a\n")]);
        let commit = store.add_commit(tree, vec![], ("ann", "ann@example.com"), 100, "init");
        store.set_ref("refs/heads/main", commit.clone());

        assert_eq!(resolve(&store, "main").unwrap(), commit);
        assert_eq!(resolve(&store, "refs/heads/main").unwrap(), commit);
    }

    #[test]
    fn annotated_tag_peels_to_commit() {
        let mut store = MemoryStore::new();
        let tree = store.tree_of(&[("f.txt", "a\n")]);
        let commit = store.add_commit(tree, vec![], ("ann", "ann@example.com"), 100, "init");
        let tag = store.add_tag("v1.0", commit.clone(), "release");
        store.set_ref("refs/tags/v1.0", tag);

        assert_eq!(resolve(&store, "v1.0").unwrap(), commit);
    }

    #[test]
    fn branch_shadows_tag_of_same_name() {
        let mut store = MemoryStore::new();
        let tree = store.tree_of(&[("f.txt", "a\n")]);
        let c1 = store.add_commit(tree.clone(), vec![], ("ann", "ann@example.com"), 100, "one");
        let c2 = store.add_commit(tree, vec![c1.clone()], ("ann", "ann@example.com"), 200, "two");
        store.set_ref("refs/heads/release", c2.clone());
        store.set_ref("refs/tags/release", c1);

        assert_eq!(resolve(&store, "release").unwrap(), c2);
    }

    #[test]
    fn full_hash_and_unique_prefix_resolve() {
        let mut store = MemoryStore::new();
        let tree = store.tree_of(&[("f.txt", "a\n")]);
        let commit = store.add_commit(tree, vec![], ("ann", "ann@example.com"), 100, "init");

        assert_eq!(resolve(&store, commit.as_str()).unwrap(), commit);
        assert_eq!(resolve(&store, &commit.as_str()[..8]).unwrap(), commit);
    }

    #[test]
    fn unknown_spec_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            resolve(&store, "no-such-branch"),
            Err(ApiError::NotFound(_))
        ));
    }
}
