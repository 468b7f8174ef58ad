//! Object store abstraction.
//!
//! The traversal engine (history, tree, diff, blame, archive) never touches
//! on-disk git formats. It consumes the primitives below, which a backend
//! implements: resolve refs, look up objects by id or unique hex prefix, and
//! read already-parsed commit/tree/blob/tag fields. `GitRepository` is the
//! libgit2-backed implementation; tests use `memory::MemoryStore`.

use std::fmt;

use crate::error::{ApiError, Result};

/// Content hash naming one immutable object, as 40 lowercase hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn from_hex(hex: &str) -> Result<Self> {
        if hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(hex.to_ascii_lowercase()))
        } else {
            Err(ApiError::InvalidArgument(format!("malformed object id: {}", hex)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated id used in patch headers.
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Commit => "commit",
            ObjectKind::Tree => "tree",
            ObjectKind::Blob => "blob",
            ObjectKind::Tag => "tag",
        }
    }
}

/// Author or committer identity with timestamp (seconds since epoch) and
/// the identity's UTC offset in minutes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub time: i64,
    pub offset_minutes: i32,
}

#[derive(Debug, Clone)]
pub struct Commit {
    pub id: ObjectId,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
    pub tree: ObjectId,
    /// Ordered; the first parent is the primary lineage for merges.
    pub parents: Vec<ObjectId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Blob,
    Tree,
    Submodule,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Blob => "blob",
            EntryKind::Tree => "tree",
            EntryKind::Submodule => "submodule",
        }
    }
}

/// One entry of a tree: a single path segment.
#[derive(Debug, Clone)]
pub struct TreeEntry {
    pub name: String,
    pub mode: u32,
    pub kind: EntryKind,
    pub id: ObjectId,
    /// Blob size in bytes; `None` for trees and submodules.
    pub size: Option<u64>,
}

/// A tree with its entries sorted by name.
#[derive(Debug, Clone)]
pub struct Tree {
    pub id: ObjectId,
    pub entries: Vec<TreeEntry>,
}

#[derive(Debug, Clone)]
pub struct Blob {
    pub id: ObjectId,
    pub content: Vec<u8>,
}

impl Blob {
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// An annotated tag object. Distinct from a lightweight tag ref, which
/// points straight at a commit.
#[derive(Debug, Clone)]
pub struct Tag {
    pub id: ObjectId,
    pub target: ObjectId,
    pub target_kind: ObjectKind,
    pub name: String,
    pub tagger: Option<Signature>,
    pub message: String,
}

/// A named pointer to an object. Symbolic refs are dereferenced
/// transitively by the store; `target` is always a concrete id.
#[derive(Debug, Clone)]
pub struct Ref {
    pub name: String,
    pub target: ObjectId,
}

/// Read-only access to one repository's object graph and refs.
///
/// Implementations must tolerate concurrent readers. Refs are mutable out
/// of band, so callers re-read them per request and never assume a target
/// is stable across two lookups.
pub trait ObjectStore {
    /// Exact ref lookup by full name. No `refs/...` expansion is applied;
    /// the revision resolver owns that policy.
    fn find_ref(&self, name: &str) -> Result<Option<Ref>>;

    /// All non-symbolic refs, sorted by name.
    fn refs(&self) -> Result<Vec<Ref>>;

    /// Look up an object by full hash or unique hex prefix. `Ok(None)` when
    /// nothing matches; `Err(Ambiguous)` when several objects do.
    fn resolve_prefix(&self, hex: &str) -> Result<Option<ObjectId>>;

    fn kind(&self, id: &ObjectId) -> Result<ObjectKind>;

    fn commit(&self, id: &ObjectId) -> Result<Commit>;

    fn tree(&self, id: &ObjectId) -> Result<Tree>;

    fn blob(&self, id: &ObjectId) -> Result<Blob>;

    fn tag(&self, id: &ObjectId) -> Result<Tag>;
}
