//! In-memory `ObjectStore` used to unit-test the traversal engine against
//! hand-built object graphs, without touching a real repository.
//!
//! Ids are synthesized but content-addressed for blobs: adding the same
//! bytes twice yields the same id, which is what rename detection and
//! de-duplication key on.

use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

use crate::error::{ApiError, Result};
use crate::git::store::{
    Blob, Commit, EntryKind, ObjectId, ObjectKind, ObjectStore, Ref, Signature, Tag, Tree,
    TreeEntry,
};

enum StoredObject {
    Commit(Commit),
    Tree(Tree),
    Blob(Vec<u8>),
    Tag(Tag),
}

enum RefTarget {
    Direct(ObjectId),
    Symbolic(String),
}

#[derive(Default)]
pub struct MemoryStore {
    objects: HashMap<ObjectId, StoredObject>,
    refs: BTreeMap<String, RefTarget>,
    blob_ids: HashMap<Vec<u8>, ObjectId>,
    counter: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn synth_id(&mut self) -> ObjectId {
        self.counter += 1;
        let mut hex = String::with_capacity(48);
        for salt in 0u8..3 {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            (self.counter, salt).hash(&mut hasher);
            hex.push_str(&format!("{:016x}", hasher.finish()));
        }
        hex.truncate(40);
        ObjectId::from_hex(&hex).expect("synthesized hex id")
    }

    pub fn add_blob(&mut self, content: &[u8]) -> ObjectId {
        if let Some(id) = self.blob_ids.get(content) {
            return id.clone();
        }
        let id = self.synth_id();
        self.blob_ids.insert(content.to_vec(), id.clone());
        self.objects.insert(id.clone(), StoredObject::Blob(content.to_vec()));
        id
    }

    pub fn add_tree(&mut self, entries: Vec<(String, u32, EntryKind, ObjectId)>) -> ObjectId {
        let mut entries: Vec<TreeEntry> = entries
            .into_iter()
            .map(|(name, mode, kind, id)| {
                let size = match &self.objects.get(&id) {
                    Some(StoredObject::Blob(content)) => Some(content.len() as u64),
                    _ => None,
                };
                TreeEntry {
                    name,
                    mode,
                    kind,
                    id,
                    size,
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            let key = |e: &TreeEntry| {
                let mut k = e.name.clone().into_bytes();
                if e.kind == EntryKind::Tree {
                    k.push(b'/');
                }
                k
            };
            key(a).cmp(&key(b))
        });
        let id = self.synth_id();
        let tree = Tree {
            id: id.clone(),
            entries,
        };
        self.objects.insert(id.clone(), StoredObject::Tree(tree));
        id
    }

    /// Build a nested tree out of `path -> content` pairs.
    pub fn tree_of(&mut self, files: &[(&str, &str)]) -> ObjectId {
        let bytes: Vec<(&str, &[u8])> = files.iter().map(|(p, c)| (*p, c.as_bytes())).collect();
        self.tree_of_bytes(&bytes)
    }

    pub fn tree_of_bytes(&mut self, files: &[(&str, &[u8])]) -> ObjectId {
        let mut root = DirNode::default();
        for (path, content) in files {
            let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
            root.insert(&segments, content.to_vec());
        }
        self.build_dir(root)
    }

    fn build_dir(&mut self, dir: DirNode) -> ObjectId {
        let mut entries = Vec::new();
        for (name, node) in dir.children {
            match node {
                Node::File(content) => {
                    let id = self.add_blob(&content);
                    entries.push((name, 0o100644, EntryKind::Blob, id));
                }
                Node::Dir(sub) => {
                    let id = self.build_dir(sub);
                    entries.push((name, 0o040000, EntryKind::Tree, id));
                }
            }
        }
        self.add_tree(entries)
    }

    pub fn add_commit(
        &mut self,
        tree: ObjectId,
        parents: Vec<ObjectId>,
        author: (&str, &str),
        time: i64,
        message: &str,
    ) -> ObjectId {
        let id = self.synth_id();
        let signature = Signature {
            name: author.0.to_string(),
            email: author.1.to_string(),
            time,
            offset_minutes: 0,
        };
        let commit = Commit {
            id: id.clone(),
            author: signature.clone(),
            committer: signature,
            message: message.to_string(),
            tree,
            parents,
        };
        self.objects.insert(id.clone(), StoredObject::Commit(commit));
        id
    }

    pub fn add_tag(&mut self, name: &str, target: ObjectId, message: &str) -> ObjectId {
        let target_kind = self.kind(&target).expect("tag target exists");
        let id = self.synth_id();
        let tag = Tag {
            id: id.clone(),
            target,
            target_kind,
            name: name.to_string(),
            tagger: Some(Signature {
                name: "tagger".to_string(),
                email: "tagger@example.com".to_string(),
                time: 0,
                offset_minutes: 0,
            }),
            message: message.to_string(),
        };
        self.objects.insert(id.clone(), StoredObject::Tag(tag));
        id
    }

    pub fn set_ref(&mut self, name: &str, target: ObjectId) {
        self.refs.insert(name.to_string(), RefTarget::Direct(target));
    }

    pub fn set_symbolic_ref(&mut self, name: &str, to: &str) {
        self.refs.insert(name.to_string(), RefTarget::Symbolic(to.to_string()));
    }

    /// Test convenience: the full commit record behind an id.
    pub fn commit_obj(&self, id: &ObjectId) -> Commit {
        match self.objects.get(id) {
            Some(StoredObject::Commit(c)) => c.clone(),
            _ => panic!("{} is not a commit in this store", id),
        }
    }
}

#[derive(Default)]
struct DirNode {
    children: BTreeMap<String, Node>,
}

enum Node {
    File(Vec<u8>),
    Dir(DirNode),
}

impl DirNode {
    fn insert(&mut self, segments: &[&str], content: Vec<u8>) {
        match segments {
            [] => {}
            [file] => {
                self.children.insert(file.to_string(), Node::File(content));
            }
            [dir, rest @ ..] => {
                let node = self
                    .children
                    .entry(dir.to_string())
                    .or_insert_with(|| Node::Dir(DirNode::default()));
                match node {
                    Node::Dir(sub) => sub.insert(rest, content),
                    Node::File(_) => panic!("{} is both a file and a directory", dir),
                }
            }
        }
    }
}

impl ObjectStore for MemoryStore {
    fn find_ref(&self, name: &str) -> Result<Option<Ref>> {
        let mut current = name;
        for _ in 0..10 {
            match self.refs.get(current) {
                None => return Ok(None),
                Some(RefTarget::Direct(target)) => {
                    return Ok(Some(Ref {
                        name: name.to_string(),
                        target: target.clone(),
                    }));
                }
                Some(RefTarget::Symbolic(next)) => current = next,
            }
        }
        Err(ApiError::Internal(format!("symbolic ref loop at {}", name)))
    }

    fn refs(&self) -> Result<Vec<Ref>> {
        Ok(self
            .refs
            .iter()
            .filter_map(|(name, target)| match target {
                RefTarget::Direct(id) => Some(Ref {
                    name: name.clone(),
                    target: id.clone(),
                }),
                RefTarget::Symbolic(_) => None,
            })
            .collect())
    }

    fn resolve_prefix(&self, hex: &str) -> Result<Option<ObjectId>> {
        let mut matches = self
            .objects
            .keys()
            .filter(|id| id.as_str().starts_with(hex));
        let first = matches.next();
        if matches.next().is_some() {
            return Err(ApiError::Ambiguous(format!("object id prefix {}", hex)));
        }
        Ok(first.cloned())
    }

    fn kind(&self, id: &ObjectId) -> Result<ObjectKind> {
        match self.objects.get(id) {
            Some(StoredObject::Commit(_)) => Ok(ObjectKind::Commit),
            Some(StoredObject::Tree(_)) => Ok(ObjectKind::Tree),
            Some(StoredObject::Blob(_)) => Ok(ObjectKind::Blob),
            Some(StoredObject::Tag(_)) => Ok(ObjectKind::Tag),
            None => Err(ApiError::NotFound(format!("object {}", id))),
        }
    }

    fn commit(&self, id: &ObjectId) -> Result<Commit> {
        match self.objects.get(id) {
            Some(StoredObject::Commit(c)) => Ok(c.clone()),
            _ => Err(ApiError::NotFound(format!("commit {}", id))),
        }
    }

    fn tree(&self, id: &ObjectId) -> Result<Tree> {
        match self.objects.get(id) {
            Some(StoredObject::Tree(t)) => Ok(t.clone()),
            _ => Err(ApiError::NotFound(format!("tree {}", id))),
        }
    }

    fn blob(&self, id: &ObjectId) -> Result<Blob> {
        match self.objects.get(id) {
            Some(StoredObject::Blob(content)) => Ok(Blob {
                id: id.clone(),
                content: content.clone(),
            }),
            _ => Err(ApiError::NotFound(format!("blob {}", id))),
        }
    }

    fn tag(&self, id: &ObjectId) -> Result<Tag> {
        match self.objects.get(id) {
            Some(StoredObject::Tag(t)) => Ok(t.clone()),
            _ => Err(ApiError::NotFound(format!("tag {}", id))),
        }
    }
}
