//! libgit2-backed `ObjectStore` plus repository discovery.
//!
//! Repositories are immediate children of one configured root directory;
//! nothing is discovered below that level. Every request opens its own
//! `GitRepository`, so refs are re-read each time and no state survives
//! between requests.

use std::path::Path;

use git2::{ErrorCode, ObjectType, Oid, Repository};

use crate::error::{ApiError, Result};
use crate::git::store::{
    Blob, Commit, EntryKind, ObjectId, ObjectKind, ObjectStore, Ref, Signature, Tag, Tree,
    TreeEntry,
};

const DEFAULT_GIT_DESCRIPTION: &str =
    "Unnamed repository; edit this file 'description' to name the repository.\n";

pub struct GitRepository {
    repo: Repository,
    name: String,
}

impl GitRepository {
    /// Open the repository named `name` directly under `root`. The name must
    /// be a single path segment; traversal outside the root is rejected.
    pub fn open(root: &Path, name: &str) -> Result<Self> {
        if name.is_empty() || name == ".." || name.contains('/') || name.contains('\\') {
            return Err(ApiError::InvalidArgument(format!("repository name: {}", name)));
        }
        let path = root.join(name);
        let repo = Repository::open(&path)
            .map_err(|_| ApiError::NotFound(format!("repository {}", name)))?;
        Ok(Self {
            repo,
            name: name.to_string(),
        })
    }

    /// Names of all repositories directly under `root`, sorted.
    pub fn discover(root: &Path) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(root)
            .map_err(|e| ApiError::Internal(format!("reading {}: {}", root.display(), e)))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| ApiError::Internal(format!("reading repository root: {}", e)))?;
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            if Repository::open(entry.path()).is_ok() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Contents of the git `description` file, with git's placeholder text
    /// treated as no description.
    pub fn description(&self) -> Option<String> {
        let path = self.repo.path().join("description");
        let text = std::fs::read_to_string(path).ok()?;
        if text == DEFAULT_GIT_DESCRIPTION || text.trim().is_empty() {
            None
        } else {
            Some(text.trim_end().to_string())
        }
    }

    /// Branch HEAD points at, when HEAD is symbolic.
    pub fn default_branch(&self) -> Option<String> {
        let head = self.repo.find_reference("HEAD").ok()?;
        let target = head.symbolic_target()?;
        Some(target.strip_prefix("refs/heads/").unwrap_or(target).to_string())
    }

    /// The commit HEAD currently resolves to.
    pub fn head_commit(&self) -> Result<ObjectId> {
        let head = self
            .repo
            .head()
            .map_err(|_| ApiError::NotFound("HEAD".to_string()))?;
        let commit = head
            .peel_to_commit()
            .map_err(|_| ApiError::NotFound("HEAD".to_string()))?;
        object_id(commit.id())
    }
}

fn object_id(oid: Oid) -> Result<ObjectId> {
    ObjectId::from_hex(&oid.to_string())
}

fn oid(id: &ObjectId) -> Result<Oid> {
    Oid::from_str(id.as_str()).map_err(|e| ApiError::Internal(format!("bad object id: {}", e)))
}

fn convert_signature(sig: &git2::Signature<'_>) -> Signature {
    Signature {
        name: String::from_utf8_lossy(sig.name_bytes()).into_owned(),
        email: String::from_utf8_lossy(sig.email_bytes()).into_owned(),
        time: sig.when().seconds(),
        offset_minutes: sig.when().offset_minutes(),
    }
}

fn entry_kind(entry: &git2::TreeEntry<'_>) -> Option<EntryKind> {
    match entry.kind() {
        Some(ObjectType::Blob) => Some(EntryKind::Blob),
        Some(ObjectType::Tree) => Some(EntryKind::Tree),
        Some(ObjectType::Commit) => Some(EntryKind::Submodule),
        _ => None,
    }
}

impl ObjectStore for GitRepository {
    fn find_ref(&self, name: &str) -> Result<Option<Ref>> {
        let reference = match self.repo.find_reference(name) {
            Ok(r) => r,
            Err(e) if e.code() == ErrorCode::NotFound || e.code() == ErrorCode::InvalidSpec => {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let ref_name = String::from_utf8_lossy(reference.name_bytes()).into_owned();
        let resolved = reference.resolve()?;
        let target = match resolved.target() {
            Some(t) => t,
            None => return Ok(None),
        };
        Ok(Some(Ref {
            name: ref_name,
            target: object_id(target)?,
        }))
    }

    fn refs(&self) -> Result<Vec<Ref>> {
        let mut refs = Vec::new();
        for reference in self.repo.references()? {
            let reference = reference?;
            if reference.kind() == Some(git2::ReferenceType::Symbolic) {
                continue;
            }
            let Some(target) = reference.target() else {
                continue;
            };
            refs.push(Ref {
                name: String::from_utf8_lossy(reference.name_bytes()).into_owned(),
                target: object_id(target)?,
            });
        }
        refs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(refs)
    }

    fn resolve_prefix(&self, hex: &str) -> Result<Option<ObjectId>> {
        match self.repo.revparse_single(hex) {
            Ok(obj) => Ok(Some(object_id(obj.id())?)),
            Err(e) if e.code() == ErrorCode::Ambiguous => {
                Err(ApiError::Ambiguous(format!("object id prefix {}", hex)))
            }
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn kind(&self, id: &ObjectId) -> Result<ObjectKind> {
        let obj = self
            .repo
            .find_object(oid(id)?, None)
            .map_err(|_| ApiError::NotFound(format!("object {}", id)))?;
        match obj.kind() {
            Some(ObjectType::Commit) => Ok(ObjectKind::Commit),
            Some(ObjectType::Tree) => Ok(ObjectKind::Tree),
            Some(ObjectType::Blob) => Ok(ObjectKind::Blob),
            Some(ObjectType::Tag) => Ok(ObjectKind::Tag),
            _ => Err(ApiError::Internal(format!("object {} has unknown type", id))),
        }
    }

    fn commit(&self, id: &ObjectId) -> Result<Commit> {
        let commit = self
            .repo
            .find_commit(oid(id)?)
            .map_err(|_| ApiError::NotFound(format!("commit {}", id)))?;
        let parents = commit
            .parent_ids()
            .map(object_id)
            .collect::<Result<Vec<_>>>()?;
        Ok(Commit {
            id: object_id(commit.id())?,
            author: convert_signature(&commit.author()),
            committer: convert_signature(&commit.committer()),
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
            tree: object_id(commit.tree_id())?,
            parents,
        })
    }

    fn tree(&self, id: &ObjectId) -> Result<Tree> {
        let tree = self
            .repo
            .find_tree(oid(id)?)
            .map_err(|_| ApiError::NotFound(format!("tree {}", id)))?;
        let mut entries = Vec::with_capacity(tree.len());
        for entry in tree.iter() {
            let Some(kind) = entry_kind(&entry) else {
                continue;
            };
            let size = if kind == EntryKind::Blob {
                self.repo.find_blob(entry.id()).ok().map(|b| b.size() as u64)
            } else {
                None
            };
            entries.push(TreeEntry {
                name: String::from_utf8_lossy(entry.name_bytes()).into_owned(),
                mode: entry.filemode() as u32,
                kind,
                id: object_id(entry.id())?,
                size,
            });
        }
        Ok(Tree {
            id: object_id(tree.id())?,
            entries,
        })
    }

    fn blob(&self, id: &ObjectId) -> Result<Blob> {
        let blob = self
            .repo
            .find_blob(oid(id)?)
            .map_err(|_| ApiError::NotFound(format!("blob {}", id)))?;
        Ok(Blob {
            id: object_id(blob.id())?,
            content: blob.content().to_vec(),
        })
    }

    fn tag(&self, id: &ObjectId) -> Result<Tag> {
        let tag = self
            .repo
            .find_tag(oid(id)?)
            .map_err(|_| ApiError::NotFound(format!("tag {}", id)))?;
        let target_kind = match tag.target_type() {
            Some(ObjectType::Commit) => ObjectKind::Commit,
            Some(ObjectType::Tree) => ObjectKind::Tree,
            Some(ObjectType::Blob) => ObjectKind::Blob,
            Some(ObjectType::Tag) => ObjectKind::Tag,
            _ => return Err(ApiError::Internal(format!("tag {} has unknown target", id))),
        };
        Ok(Tag {
            id: object_id(tag.id())?,
            target: object_id(tag.target_id())?,
            target_kind,
            name: String::from_utf8_lossy(tag.name_bytes()).into_owned(),
            tagger: tag.tagger().as_ref().map(convert_signature),
            message: tag
                .message_bytes()
                .map(|m| String::from_utf8_lossy(m).into_owned())
                .unwrap_or_default(),
        })
    }
}
